//! Typed endpoints over the raw frame channels.
//!
//! Transports move [`Bytes`] frames. [`Streaming`] and [`StreamSender`] wrap
//! the raw [`Receiver`]/[`Sender`] of a call and encode or decode `prost`
//! messages at the boundary. A frame that fails to decode terminates the call
//! with an internal status.

use crate::{CallContext, Error, Receiver, Sender, Status};
use bytes::Bytes;
use core::marker::PhantomData;
use futures::Stream;

/// Messages that can cross a call.
pub trait Message: prost::Message + Default + Send + 'static {}

impl<T> Message for T where T: prost::Message + Default + Send + 'static {}

pub(crate) fn encode<M: Message>(message: &M) -> Bytes {
    Bytes::from(message.encode_to_vec())
}

pub(crate) fn decode<M: Message>(frame: Bytes) -> Result<M, Error> {
    M::decode(frame).map_err(|e| Error::Decode {
        context: format!("{}: {e}", core::any::type_name::<M>()),
    })
}

/// Which end of the call a [`Streaming`] reads on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    /// Reads responses. End-of-input is only reported once the terminal
    /// status is known, and a non-OK status is returned as the error.
    Caller,
    /// Reads requests. End-of-input is the caller's half-close.
    Handler,
}

/// Typed inbound message stream.
pub struct Streaming<M> {
    inner: Receiver<Bytes>,
    side: Side,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message> Streaming<M> {
    pub(crate) fn new(inner: Receiver<Bytes>, side: Side) -> Self {
        Self {
            inner,
            side,
            _marker: PhantomData,
        }
    }

    /// Receives the next message.
    ///
    /// On the caller side, `Ok(None)` means the stream ended *and* the call
    /// completed with an OK status.
    ///
    /// # Errors
    ///
    /// Returns the call's terminal status if it was aborted, or an internal
    /// status if a frame could not be decoded.
    pub async fn message(&mut self) -> Result<Option<M>, Status> {
        match self.inner.recv().await? {
            Some(frame) => match decode::<M>(frame) {
                Ok(message) => Ok(Some(message)),
                Err(e) => {
                    let ctx = self.inner.context();
                    ctx.finish(e.into());
                    Err(ctx.abort_status())
                }
            },
            None => match self.side {
                Side::Handler => Ok(None),
                Side::Caller => {
                    let status = self.inner.context().finished().await;
                    status.into_result().map(|()| None)
                }
            },
        }
    }

    /// Drains the remaining messages and returns the terminal status.
    ///
    /// # Errors
    ///
    /// Same as [`Streaming::message`].
    pub async fn finish(mut self) -> Result<(), Status> {
        while self.message().await?.is_some() {}
        Ok(())
    }

    /// Adapts the stream into a [`futures::Stream`], ending after the first
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = Result<M, Status>> + Send {
        futures::stream::unfold(Some(self), |state| async move {
            let mut stream = state?;
            match stream.message().await {
                Ok(Some(message)) => Some((Ok(message), Some(stream))),
                Ok(None) => None,
                Err(status) => Some((Err(status), None)),
            }
        })
    }

    pub fn context(&self) -> &CallContext {
        self.inner.context()
    }
}

/// Dropping the caller's response stream before the call completes cancels
/// the call.
impl<M> Drop for Streaming<M> {
    fn drop(&mut self) {
        if self.side == Side::Caller {
            self.inner.context().cancel();
        }
    }
}

/// Typed outbound message sink.
pub struct StreamSender<M> {
    inner: Sender<Bytes>,
    _marker: PhantomData<fn(M)>,
}

impl<M> Clone for StreamSender<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M: Message> StreamSender<M> {
    pub(crate) fn new(inner: Sender<Bytes>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Sends one message to the peer.
    ///
    /// # Errors
    ///
    /// Returns the call's terminal status, OK included, if the call already
    /// ended; the message is not delivered. Sending on a direction this end
    /// closed while the call is still running is an internal status.
    pub async fn send(&self, message: M) -> Result<(), Status> {
        match self.inner.send(encode(&message)).await {
            Ok(()) => Ok(()),
            Err(Error::ChannelClosed) => Err(self
                .context()
                .status()
                .unwrap_or_else(|| Error::ChannelClosed.into())),
            Err(e) => Err(e.into()),
        }
    }

    /// Signals end-of-input. Idempotent.
    pub fn close_send(&self) {
        self.inner.close_send();
    }

    pub fn context(&self) -> &CallContext {
        self.inner.context()
    }
}
