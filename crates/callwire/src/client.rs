//! Caller-side executors for the four call patterns.
//!
//! A [`Client`] opens calls over a [`Transport`], arms the call deadline and
//! hands back typed endpoints. Every executor reports failures as the call's
//! terminal [`Status`], so a caller sees the same outcome the handler's side
//! recorded.

use crate::{
    CallContext, CallKind, CallStreams, EngineConfig, Error, MethodDescriptor, Status, Transport,
    codec::{Message, Side, StreamSender, Streaming},
    deadline,
};
use core::time::Duration;
use tokio::time::Instant;

/// Per-call options.
///
/// When both a timeout and a deadline are given, the earlier one applies.
/// When neither is given, [`EngineConfig::default_timeout`] applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub deadline: Option<Instant>,
}

impl CallOptions {
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Typed caller over a [`Transport`].
#[derive(Clone)]
pub struct Client<T> {
    transport: T,
    config: EngineConfig,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    pub const fn with_config(transport: T, config: EngineConfig) -> Self {
        Self { transport, config }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn open(
        &self,
        method: &MethodDescriptor,
        expected: CallKind,
        options: CallOptions,
    ) -> Result<CallStreams, Status> {
        if method.kind() != expected {
            return Err(Error::PatternMismatch {
                path: method.path(),
                expected: expected.as_str(),
            }
            .into());
        }

        let timeout = match (options.timeout, options.deadline) {
            (None, None) => self.config.default_timeout,
            (timeout, _) => timeout,
        };
        let streams = self
            .transport
            .open_call(method, deadline::resolve(timeout, options.deadline))
            .await?;
        let _timer = deadline::arm(&streams.context);

        #[cfg(feature = "tracing")]
        tracing::trace!(method = %method, deadline = ?streams.context.deadline(), "Opened call");

        Ok(streams)
    }

    /// Sends one request and waits for one response.
    ///
    /// # Errors
    ///
    /// Returns the call's terminal status when it is not OK: the handler's
    /// error, `DeadlineExceeded`, `Cancelled`, or `NotFound` for a method the
    /// peer does not serve.
    pub async fn unary<Req: Message, Res: Message>(
        &self,
        method: &MethodDescriptor,
        request: Req,
        options: CallOptions,
    ) -> Result<Res, Status> {
        let CallStreams {
            outbound, inbound, ..
        } = self.open(method, CallKind::Unary, options).await?;
        let mut responses = Streaming::<Res>::new(inbound, Side::Caller);

        send_single(StreamSender::new(outbound), request).await?;
        single_response(&mut responses).await
    }

    /// Sends one request and returns the stream of responses.
    ///
    /// The stream ends with `Ok(None)` only when the call completed with an
    /// OK status; otherwise the terminal status is yielded as the error.
    ///
    /// # Errors
    ///
    /// Returns the terminal status if the call fails before the request is
    /// delivered.
    pub async fn server_streaming<Req: Message, Res: Message>(
        &self,
        method: &MethodDescriptor,
        request: Req,
        options: CallOptions,
    ) -> Result<Streaming<Res>, Status> {
        let CallStreams {
            outbound, inbound, ..
        } = self.open(method, CallKind::ServerStream, options).await?;
        let responses = Streaming::new(inbound, Side::Caller);

        send_single(StreamSender::new(outbound), request).await?;
        Ok(responses)
    }

    /// Opens a client-streaming call.
    ///
    /// # Errors
    ///
    /// Returns a status if the call cannot be opened.
    pub async fn client_streaming<Req: Message, Res: Message>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
    ) -> Result<ClientStreamingCall<Req, Res>, Status> {
        let CallStreams {
            outbound, inbound, ..
        } = self.open(method, CallKind::ClientStream, options).await?;
        Ok(ClientStreamingCall {
            requests: StreamSender::new(outbound),
            responses: Streaming::new(inbound, Side::Caller),
        })
    }

    /// Opens a bidirectional-streaming call.
    ///
    /// # Errors
    ///
    /// Returns a status if the call cannot be opened.
    pub async fn bidi_streaming<Req: Message, Res: Message>(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
    ) -> Result<BidiCall<Req, Res>, Status> {
        let CallStreams {
            outbound, inbound, ..
        } = self.open(method, CallKind::BidiStream, options).await?;
        Ok(BidiCall {
            requests: StreamSender::new(outbound),
            responses: Streaming::new(inbound, Side::Caller),
        })
    }
}

async fn send_single<M: Message>(requests: StreamSender<M>, request: M) -> Result<(), Status> {
    let sent = requests.send(request).await;
    requests.close_send();
    sent
}

async fn single_response<M: Message>(responses: &mut Streaming<M>) -> Result<M, Status> {
    let Some(response) = responses.message().await? else {
        return Err(Status::internal("call completed without a response"));
    };
    if responses.message().await?.is_some() {
        return Err(Status::internal("call produced more than one response"));
    }
    Ok(response)
}

/// An open client-streaming call.
pub struct ClientStreamingCall<Req, Res> {
    requests: StreamSender<Req>,
    responses: Streaming<Res>,
}

impl<Req: Message, Res: Message> ClientStreamingCall<Req, Res> {
    /// Sends one request. Suspends while the request buffer is full.
    ///
    /// # Errors
    ///
    /// Returns the terminal status if the call ended early, for example
    /// because the handler failed or the deadline passed.
    pub async fn send(&self, request: Req) -> Result<(), Status> {
        self.requests.send(request).await
    }

    /// A clonable handle for sending from other tasks.
    pub fn sender(&self) -> StreamSender<Req> {
        self.requests.clone()
    }

    /// Signals end-of-input and waits for the single response.
    ///
    /// # Errors
    ///
    /// Returns the call's terminal status when it is not OK.
    pub async fn close_and_recv(mut self) -> Result<Res, Status> {
        self.requests.close_send();
        single_response(&mut self.responses).await
    }

    /// Cancels the call. No effect once the call has a terminal status.
    pub fn cancel(&self) {
        self.context().cancel();
    }

    pub fn context(&self) -> &CallContext {
        self.requests.context()
    }
}

/// An open bidirectional-streaming call.
///
/// Both directions are independent: closing the request direction does not
/// end the responses, and the handler may respond before, during or after
/// reading requests.
pub struct BidiCall<Req, Res> {
    requests: StreamSender<Req>,
    responses: Streaming<Res>,
}

impl<Req: Message, Res: Message> BidiCall<Req, Res> {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns the terminal status if the call ended early.
    pub async fn send(&self, request: Req) -> Result<(), Status> {
        self.requests.send(request).await
    }

    /// Receives the next response. `Ok(None)` means the handler finished
    /// with an OK status.
    ///
    /// # Errors
    ///
    /// Returns the call's terminal status when it is not OK.
    pub async fn message(&mut self) -> Result<Option<Res>, Status> {
        self.responses.message().await
    }

    /// Signals end-of-input on the request direction. Idempotent.
    pub fn close_send(&self) {
        self.requests.close_send();
    }

    /// Cancels the call. No effect once the call has a terminal status.
    pub fn cancel(&self) {
        self.context().cancel();
    }

    pub fn context(&self) -> &CallContext {
        self.requests.context()
    }

    /// Splits the call so that requests and responses can be driven from
    /// separate tasks.
    pub fn split(self) -> (StreamSender<Req>, Streaming<Res>) {
        (self.requests, self.responses)
    }
}
