//! Type-erased method handlers.
//!
//! Each call pattern has its own handler signature. The typed constructors on
//! [`Handler`] wrap an async closure over concrete message types into a
//! frame-level function, so that the dispatch table can hold every method
//! behind one enum and resolve the pattern by matching on the variant.

use crate::{
    CallContext, CallKind, Receiver, Sender, Status,
    codec::{Message, Side, StreamSender, Streaming, decode, encode},
};
use bytes::Bytes;
use core::future::Future;
use futures::{FutureExt, future::BoxFuture};
use std::sync::Arc;

type HandlerFuture<T> = BoxFuture<'static, Result<T, Status>>;

pub type UnaryFn = Arc<dyn Fn(Bytes, CallContext) -> HandlerFuture<Bytes> + Send + Sync>;
pub type ServerStreamFn =
    Arc<dyn Fn(Bytes, Sender<Bytes>, CallContext) -> HandlerFuture<()> + Send + Sync>;
pub type ClientStreamFn =
    Arc<dyn Fn(Receiver<Bytes>, CallContext) -> HandlerFuture<Bytes> + Send + Sync>;
pub type BidiStreamFn =
    Arc<dyn Fn(Receiver<Bytes>, Sender<Bytes>, CallContext) -> HandlerFuture<()> + Send + Sync>;

/// A registered method implementation, tagged by call pattern.
#[derive(Clone)]
pub enum Handler {
    Unary(UnaryFn),
    ServerStream(ServerStreamFn),
    ClientStream(ClientStreamFn),
    BidiStream(BidiStreamFn),
}

impl Handler {
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::Unary(_) => CallKind::Unary,
            Self::ServerStream(_) => CallKind::ServerStream,
            Self::ClientStream(_) => CallKind::ClientStream,
            Self::BidiStream(_) => CallKind::BidiStream,
        }
    }

    /// One request in, one response out.
    pub fn unary<Req, Res, F, Fut>(handler: F) -> Self
    where
        Req: Message,
        Res: Message,
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, Status>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped = move |frame: Bytes, ctx: CallContext| -> HandlerFuture<Bytes> {
            let handler = Arc::clone(&handler);
            async move {
                let request = decode::<Req>(frame)?;
                let response = handler(request, ctx).await?;
                Ok(encode(&response))
            }
            .boxed()
        };
        Self::Unary(Arc::new(wrapped))
    }

    /// One request in, responses pushed to a [`StreamSender`].
    pub fn server_streaming<Req, Res, F, Fut>(handler: F) -> Self
    where
        Req: Message,
        Res: Message,
        F: Fn(Req, StreamSender<Res>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Status>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped =
            move |frame: Bytes, responses: Sender<Bytes>, ctx: CallContext| -> HandlerFuture<()> {
                let handler = Arc::clone(&handler);
                async move {
                    let request = decode::<Req>(frame)?;
                    handler(request, StreamSender::new(responses), ctx).await
                }
                .boxed()
            };
        Self::ServerStream(Arc::new(wrapped))
    }

    /// Requests read from a [`Streaming`], one response out.
    pub fn client_streaming<Req, Res, F, Fut>(handler: F) -> Self
    where
        Req: Message,
        Res: Message,
        F: Fn(Streaming<Req>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, Status>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped = move |requests: Receiver<Bytes>, ctx: CallContext| -> HandlerFuture<Bytes> {
            let handler = Arc::clone(&handler);
            async move {
                let response = handler(Streaming::new(requests, Side::Handler), ctx).await?;
                Ok(encode(&response))
            }
            .boxed()
        };
        Self::ClientStream(Arc::new(wrapped))
    }

    /// Independent request and response streams.
    pub fn bidi_streaming<Req, Res, F, Fut>(handler: F) -> Self
    where
        Req: Message,
        Res: Message,
        F: Fn(Streaming<Req>, StreamSender<Res>, CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Status>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped = move |requests: Receiver<Bytes>,
                            responses: Sender<Bytes>,
                            ctx: CallContext|
              -> HandlerFuture<()> {
            let handler = Arc::clone(&handler);
            let requests = Streaming::new(requests, Side::Handler);
            let responses = StreamSender::new(responses);
            async move { handler(requests, responses, ctx).await }.boxed()
        };
        Self::BidiStream(Arc::new(wrapped))
    }
}

impl core::fmt::Debug for Handler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}
