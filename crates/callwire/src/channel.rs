//! One-directional, ordered, closable message channels bound to a call.
//!
//! A channel is created per direction of a call with [`channel`]. The
//! producer holds the [`Sender`], the consumer the [`Receiver`]; neither owns
//! the other's half. Delivery is FIFO with no duplication and no silent
//! drops: a message accepted by `send` is either received once or the call
//! terminates with a non-OK status.
//!
//! ## States
//!
//! - `Open`: messages flow.
//! - `HalfClosed`: the producer signalled end-of-input via
//!   [`Sender::close_send`] (or every sender was dropped). Buffered messages
//!   are still delivered.
//! - `Closed`: the consumer drained the buffer and observed end-of-input, or
//!   dropped its receiver. Nothing is delivered after this point. A receiver
//!   set to linger hands the read side back instead, and the direction stays
//!   open until the producer half-closes.
//!
//! Both `send` and `recv` are suspension points and are released by message
//! arrival, end-of-input, or the call being aborted (deadline, cancellation,
//! failure), whichever happens first.

use crate::{CallContext, Error, Result};
use parking_lot::Mutex;
use portable_atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const OPEN: u8 = 0;
const HALF_CLOSED: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle of a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    HalfClosed,
    Closed,
}

#[derive(Debug)]
struct Shared {
    state: AtomicU8,
}

impl Shared {
    fn state(&self) -> ChannelState {
        match self.state.load(Ordering::Acquire) {
            OPEN => ChannelState::Open,
            HALF_CLOSED => ChannelState::HalfClosed,
            _ => ChannelState::Closed,
        }
    }

    fn half_close(&self) {
        let _ = self
            .state
            .compare_exchange(OPEN, HALF_CLOSED, Ordering::AcqRel, Ordering::Acquire);
    }

    fn close(&self) {
        self.state.store(CLOSED, Ordering::Release);
    }
}

/// The producing half, shared by every clone of a [`Sender`].
struct SendHalf<T> {
    tx: Mutex<Option<mpsc::Sender<T>>>,
    shared: Arc<Shared>,
}

impl<T> Drop for SendHalf<T> {
    fn drop(&mut self) {
        self.shared.half_close();
    }
}

/// Creates a channel for one direction of the call described by `ctx`.
///
/// `capacity` bounds the number of buffered messages; `send` suspends while
/// the buffer is full. A capacity of zero is raised to one.
pub fn channel<T>(capacity: usize, ctx: &CallContext) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared {
        state: AtomicU8::new(OPEN),
    });

    let sender = Sender {
        half: Arc::new(SendHalf {
            tx: Mutex::new(Some(tx)),
            shared: Arc::clone(&shared),
        }),
        ctx: ctx.clone(),
    };
    let receiver = Receiver {
        rx: Some(rx),
        shared,
        ctx: ctx.clone(),
        parking: None,
    };

    (sender, receiver)
}

/// Write capability for a channel.
///
/// Clones share the same end-of-input: closing through one clone closes the
/// direction for all of them.
pub struct Sender<T> {
    half: Arc<SendHalf<T>>,
    ctx: CallContext,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            half: Arc::clone(&self.half),
            ctx: self.ctx.clone(),
        }
    }
}

impl<T> Sender<T> {
    /// Enqueues `message` for delivery to the peer.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] after [`Sender::close_send`] or once the
    ///   receiving side is gone.
    /// - [`Error::Terminated`] if the call is aborted before the message is
    ///   accepted.
    pub async fn send(&self, message: T) -> Result<()> {
        let tx = self.half.tx.lock().clone().ok_or(Error::ChannelClosed)?;
        if self.ctx.is_cancelled() {
            return Err(Error::Terminated(self.ctx.abort_status()));
        }

        tokio::select! {
            biased;
            () = self.ctx.cancelled() => Err(Error::Terminated(self.ctx.abort_status())),
            res = tx.send(message) => res.map_err(|_| Error::ChannelClosed),
        }
    }

    /// Signals end-of-input to the peer. Idempotent.
    pub fn close_send(&self) {
        if self.half.tx.lock().take().is_some() {
            self.half.shared.half_close();
        }
    }

    pub fn state(&self) -> ChannelState {
        self.half.shared.state()
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }
}

type Parking<T> = Arc<Mutex<Option<mpsc::Receiver<T>>>>;

/// Read capability for a channel.
pub struct Receiver<T> {
    rx: Option<mpsc::Receiver<T>>,
    shared: Arc<Shared>,
    ctx: CallContext,
    parking: Option<Parking<T>>,
}

impl<T> Receiver<T> {
    /// Waits for the next message.
    ///
    /// Returns `Ok(Some(_))` for a message and `Ok(None)` once end-of-input
    /// has been observed and every buffered message was delivered. Further
    /// calls after end-of-input keep returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminated`] if the call is aborted. An aborted call
    /// does not deliver buffered messages.
    pub async fn recv(&mut self) -> Result<Option<T>> {
        let Some(rx) = self.rx.as_mut() else {
            return Ok(None);
        };
        recv_from(rx, &self.shared, &self.ctx).await
    }

    /// Stops accepting messages and discards anything still buffered.
    pub fn close(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            rx.close();
        }
        self.shared.close();
    }

    /// Keeps the direction open once this receiver is dropped before
    /// end-of-input, so that the peer can go on sending until it half-closes.
    /// The returned [`Lingering`] takes over the read side at that point.
    pub(crate) fn linger(&mut self) -> Lingering<T> {
        let parking = Arc::new(Mutex::new(None));
        self.parking = Some(Arc::clone(&parking));
        Lingering {
            parking,
            shared: Arc::clone(&self.shared),
            ctx: self.ctx.clone(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        match (self.rx.take(), self.parking.take()) {
            (Some(rx), Some(parking)) if self.shared.state() != ChannelState::Closed => {
                *parking.lock() = Some(rx);
            }
            _ => self.shared.close(),
        }
    }
}

async fn recv_from<T>(
    rx: &mut mpsc::Receiver<T>,
    shared: &Shared,
    ctx: &CallContext,
) -> Result<Option<T>> {
    if shared.state() == ChannelState::Closed {
        return Ok(None);
    }
    if ctx.is_cancelled() {
        return Err(Error::Terminated(ctx.abort_status()));
    }

    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(Error::Terminated(ctx.abort_status())),
        msg = rx.recv() => match msg {
            Some(msg) => Ok(Some(msg)),
            None => {
                shared.close();
                Ok(None)
            }
        },
    }
}

/// Read side of a direction whose [`Receiver`] was dropped by a consumer that
/// stopped reading early. See [`Receiver::linger`].
pub(crate) struct Lingering<T> {
    parking: Parking<T>,
    shared: Arc<Shared>,
    ctx: CallContext,
}

impl<T> Lingering<T> {
    /// Discards messages until the producer half-closes, then closes the
    /// direction. Returns at once if the receiver is still alive elsewhere or
    /// the direction is already closed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminated`] if the call is aborted first.
    pub(crate) async fn drain(self) -> Result<()> {
        let parked = self.parking.lock().take();
        let Some(mut rx) = parked else {
            return Ok(());
        };
        while recv_from(&mut rx, &self.shared, &self.ctx).await?.is_some() {}
        Ok(())
    }
}

impl<T> Drop for Lingering<T> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.parking.lock().take() {
            rx.close();
            self.shared.close();
        }
    }
}
