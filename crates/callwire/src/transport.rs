//! The seam between the engine and whatever carries calls.
//!
//! A [`Transport`] opens calls on the client side and yields
//! [`IncomingCall`]s on the server side. Connection establishment, routing
//! and security belong to the transport; the engine only sees the pair of
//! channels and the shared [`CallContext`] of each call.
//!
//! [`local`] builds an in-process transport whose two ends share channels
//! directly. It backs tests, benchmarks and the demo binary.

use crate::{
    CallContext, EngineConfig, Error, MethodDescriptor, Receiver, Result, Sender, Status, channel,
};
use bytes::Bytes;
use core::future::Future;
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::wrappers::ReceiverStream;

/// Client-side view of an opened call.
pub struct CallStreams {
    /// Requests towards the handler.
    pub outbound: Sender<Bytes>,
    /// Responses from the handler.
    pub inbound: Receiver<Bytes>,
    pub context: CallContext,
}

/// Server-side view of an accepted call.
///
/// A call dropped without being dispatched (for instance, still queued when
/// the dispatch loop stops) ends as `Cancelled`, so its caller is never left
/// waiting for a status.
pub struct IncomingCall {
    pub method: MethodDescriptor,
    /// Requests from the caller.
    pub requests: Receiver<Bytes>,
    /// Responses towards the caller.
    pub responses: Sender<Bytes>,
    pub context: CallContext,
    pub(crate) guard: DispatchGuard,
}

impl IncomingCall {
    pub fn new(
        method: MethodDescriptor,
        requests: Receiver<Bytes>,
        responses: Sender<Bytes>,
        context: CallContext,
    ) -> Self {
        let guard = DispatchGuard(context.clone());
        Self {
            method,
            requests,
            responses,
            context,
            guard,
        }
    }
}

/// Cancels the call when dropped, unless it already has a terminal status.
pub(crate) struct DispatchGuard(CallContext);

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.0
            .finish(Status::cancelled("Call dropped before it was dispatched"));
    }
}

/// Opens calls against a remote dispatch loop.
pub trait Transport: Send + Sync + 'static {
    /// Opens a call to `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the call cannot be established.
    fn open_call(
        &self,
        method: &MethodDescriptor,
        deadline: Option<Instant>,
    ) -> impl Future<Output = Result<CallStreams>> + Send;
}

/// Client end of an in-process connection.
#[derive(Clone)]
pub struct LocalTransport {
    calls: mpsc::Sender<IncomingCall>,
    channel_capacity: usize,
}

/// Server end of an in-process connection, consumed by
/// [`Server::serve`](crate::Server::serve).
pub type LocalIncoming = ReceiverStream<IncomingCall>;

/// Creates an in-process connection.
///
/// The connection closes once every [`LocalTransport`] clone is dropped,
/// which ends the incoming stream.
pub fn local(config: &EngineConfig) -> (LocalTransport, LocalIncoming) {
    let (calls, accepted) = mpsc::channel(config.accept_backlog.max(1));
    let transport = LocalTransport {
        calls,
        channel_capacity: config.channel_capacity,
    };
    (transport, ReceiverStream::new(accepted))
}

impl Transport for LocalTransport {
    async fn open_call(
        &self,
        method: &MethodDescriptor,
        deadline: Option<Instant>,
    ) -> Result<CallStreams> {
        let context = CallContext::new(method.clone(), deadline);
        let (outbound, requests) = channel(self.channel_capacity, &context);
        let (responses, inbound) = channel(self.channel_capacity, &context);

        self.calls
            .send(IncomingCall::new(
                method.clone(),
                requests,
                responses,
                context.clone(),
            ))
            .await
            .map_err(|_| Error::Transport {
                context: "in-process connection closed".to_string(),
            })?;

        Ok(CallStreams {
            outbound,
            inbound,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallKind, Code, Status};
    use futures::StreamExt;

    const METHOD: MethodDescriptor =
        MethodDescriptor::from_static("test.Local", "Echo", CallKind::Unary);

    #[tokio::test]
    async fn both_ends_share_channels_and_context() {
        let (transport, mut incoming) = local(&EngineConfig::default());
        let mut call = transport.open_call(&METHOD, None).await.unwrap();
        let mut accepted = incoming.next().await.unwrap();

        assert_eq!(accepted.method, METHOD);

        call.outbound.send(Bytes::from_static(b"ping")).await.unwrap();
        call.outbound.close_send();
        assert_eq!(accepted.requests.recv().await.unwrap(), Some(Bytes::from_static(b"ping")));
        assert_eq!(accepted.requests.recv().await.unwrap(), None);

        accepted.responses.send(Bytes::from_static(b"pong")).await.unwrap();
        assert_eq!(call.inbound.recv().await.unwrap(), Some(Bytes::from_static(b"pong")));

        accepted.context.finish(Status::internal("done"));
        assert_eq!(call.context.status().map(|s| s.code()), Some(Code::Internal));
    }

    #[tokio::test]
    async fn open_fails_when_server_end_is_gone() {
        let (transport, incoming) = local(&EngineConfig::default());
        drop(incoming);
        let err = transport.open_call(&METHOD, None).await.err().unwrap();
        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(Status::from(err).code(), Code::Internal);
    }

    #[tokio::test]
    async fn undispatched_call_is_cancelled() {
        let (transport, incoming) = local(&EngineConfig::default());
        let call = transport.open_call(&METHOD, None).await.unwrap();
        drop(incoming);
        assert_eq!(call.context.status().map(|s| s.code()), Some(Code::Cancelled));
    }

    #[tokio::test]
    async fn dropping_transport_ends_incoming() {
        let (transport, mut incoming) = local(&EngineConfig::default());
        drop(transport);
        assert!(incoming.next().await.is_none());
    }
}
