//! The dispatch loop.
//!
//! [`Server`] accepts [`IncomingCall`]s from a transport, resolves each one
//! against the [`Registry`] and runs the matching handler on its own task.
//! Every call ends with exactly one terminal status, after which the response
//! direction is closed.
//!
//! ## Shutdown
//!
//! Once the shutdown signal fires (or the transport stops yielding calls) the
//! loop stops accepting, then waits up to
//! [`EngineConfig::shutdown_grace`] for in-flight calls to drain. Calls still
//! running after the grace period are cancelled.

use crate::{
    CallContext, EngineConfig, Error, Handler, IncomingCall, Receiver, Registry, Sender, Status,
    deadline,
};
use bytes::Bytes;
use core::future::Future;
use futures::{Stream, StreamExt};
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

struct ServerInner {
    registry: Registry,
    config: EngineConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    inflight: AtomicUsize,
}

/// Serves calls against a fixed [`Registry`].
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn new(registry: Registry, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                registry,
                config,
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                inflight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Number of calls whose handler is currently running.
    pub fn inflight(&self) -> usize {
        self.inner.inflight.load(Ordering::Relaxed)
    }

    /// Serves `incoming` until it ends, then drains in-flight calls.
    pub async fn serve<S>(&self, incoming: S)
    where
        S: Stream<Item = IncomingCall> + Send,
    {
        self.serve_with_shutdown(incoming, core::future::pending())
            .await;
    }

    /// Serves `incoming` until it ends or `signal` completes, then drains
    /// in-flight calls.
    pub async fn serve_with_shutdown<S, F>(&self, incoming: S, signal: F)
    where
        S: Stream<Item = IncomingCall> + Send,
        F: Future<Output = ()> + Send,
    {
        let mut incoming = core::pin::pin!(incoming);
        let mut signal = core::pin::pin!(signal);

        #[cfg(feature = "tracing")]
        tracing::info!(methods = self.inner.registry.len(), "Dispatch loop started");

        loop {
            tokio::select! {
                biased;
                () = &mut signal => {
                    #[cfg(feature = "tracing")]
                    tracing::info!("Shutdown requested, refusing new calls");
                    break;
                }
                call = incoming.next() => match call {
                    Some(call) => self.dispatch(call),
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::info!("Transport closed, refusing new calls");
                        break;
                    }
                },
            }
        }

        self.drain().await;
    }

    fn dispatch(&self, call: IncomingCall) {
        let IncomingCall {
            method,
            mut requests,
            responses,
            context,
            guard,
        } = call;

        let handler = match self.inner.registry.lookup(&method) {
            Ok(handler) => handler.clone(),
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(method = %method, "Rejecting call to unknown method");
                context.finish(e.into());
                responses.close_send();
                requests.close();
                return;
            }
        };

        let inner = Arc::clone(&self.inner);
        inner.inflight.fetch_add(1, Ordering::Relaxed);
        self.inner.tracker.spawn(async move {
            let _guard = guard;

            #[cfg(feature = "tracing")]
            let started = tokio::time::Instant::now();

            let _timer = deadline::arm(&context);
            let status = run_handler(&inner, handler, requests, responses.clone(), &context).await;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %context.method(),
                code = ?status.code(),
                elapsed = ?started.elapsed(),
                "Call finished"
            );

            context.finish(status);
            responses.close_send();
            inner.inflight.fetch_sub(1, Ordering::Relaxed);
        });
    }

    async fn drain(&self) {
        let inner = &self.inner;
        inner.tracker.close();

        #[cfg(feature = "tracing")]
        tracing::info!("Draining in-flight calls ({} active)", self.inflight());

        let drained = tokio::time::timeout(inner.config.shutdown_grace, inner.tracker.wait()).await;
        if drained.is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Graceful drain timed out ({} calls still active), cancelling",
                self.inflight()
            );
            inner.shutdown.cancel();
            inner.tracker.wait().await;
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Dispatch loop shut down");
    }
}

/// Runs the handler on its own task and resolves its terminal status.
///
/// The handler task is aborted as soon as the call is aborted from elsewhere
/// (deadline, caller cancellation) or the server gives up on draining it.
async fn run_handler(
    inner: &ServerInner,
    handler: Handler,
    requests: Receiver<Bytes>,
    responses: Sender<Bytes>,
    ctx: &CallContext,
) -> Status {
    let mut task = inner
        .tracker
        .spawn(invoke(handler, requests, responses, ctx.clone()));

    tokio::select! {
        biased;
        joined = &mut task => match joined {
            Ok(Ok(())) => Status::ok(),
            Ok(Err(status)) => status,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(method = %ctx.method(), "Handler task failed: {e}");
                Status::from_join_error(e)
            }
        },
        () = ctx.cancelled() => {
            task.abort();
            ctx.abort_status()
        }
        () = inner.shutdown.cancelled() => {
            task.abort();
            Error::ServiceShutdown.into()
        }
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(method = %ctx.method())))]
async fn invoke(
    handler: Handler,
    mut requests: Receiver<Bytes>,
    responses: Sender<Bytes>,
    ctx: CallContext,
) -> Result<(), Status> {
    match handler {
        Handler::Unary(f) => {
            let request = single_request(&mut requests).await?;
            let response = f(request, ctx).await?;
            responses.send(response).await?;
            Ok(())
        }
        Handler::ServerStream(f) => {
            let request = single_request(&mut requests).await?;
            f(request, responses, ctx).await
        }
        Handler::ClientStream(f) => {
            let lingering = requests.linger();
            let response = f(requests, ctx).await?;
            responses.send(response).await?;
            lingering.drain().await?;
            Ok(())
        }
        Handler::BidiStream(f) => {
            let lingering = requests.linger();
            f(requests, responses, ctx).await?;
            lingering.drain().await?;
            Ok(())
        }
    }
}

/// Reads the only request of a single-request call and checks that the caller
/// half-closed right after it.
async fn single_request(requests: &mut Receiver<Bytes>) -> Result<Bytes, Status> {
    let Some(request) = requests.recv().await? else {
        return Err(Status::internal("expected one request message, got none"));
    };
    if requests.recv().await?.is_some() {
        return Err(Status::internal("expected one request message, got more"));
    }
    Ok(request)
}
