//! Per-call state shared by both ends of a call.
//!
//! A [`CallContext`] is created when a call is opened and handed to every
//! party taking part in it: the caller, the handler, and each channel bound
//! to the call. It carries the optional absolute deadline and the call's
//! terminal [`Status`].
//!
//! The terminal status is write-once. Whoever calls [`CallContext::finish`]
//! first (the handler's dispatcher, the deadline timer, or a caller issuing
//! [`CallContext::cancel`]) decides the outcome; later writes are discarded.
//! A non-OK outcome additionally trips the abort signal, which releases any
//! party suspended in `send`/`recv` on the call's channels.

use crate::{MethodDescriptor, Status};
use core::time::Duration;
use std::sync::{Arc, OnceLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Inner {
    method: MethodDescriptor,
    deadline: Option<Instant>,
    status: OnceLock<Status>,
    /// Tripped once a terminal status of any code is set.
    finished: CancellationToken,
    /// Tripped once a non-OK terminal status is set.
    aborted: CancellationToken,
}

/// Shared, cheaply clonable handle to the state of a single call.
#[derive(Clone)]
pub struct CallContext {
    inner: Arc<Inner>,
}

impl CallContext {
    pub fn new(method: MethodDescriptor, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                method,
                deadline,
                status: OnceLock::new(),
                finished: CancellationToken::new(),
                aborted: CancellationToken::new(),
            }),
        }
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.inner.method
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, saturating at zero. `None` when the call
    /// has no deadline.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Records the terminal status of the call.
    ///
    /// Returns `true` if this write decided the outcome and `false` if a
    /// status had already been set, in which case `status` is discarded.
    pub fn finish(&self, status: Status) -> bool {
        let aborting = !status.is_ok();
        if self.inner.status.set(status).is_err() {
            return false;
        }

        if aborting {
            self.inner.aborted.cancel();
        }
        self.inner.finished.cancel();
        true
    }

    /// Cancels the call on behalf of the caller.
    ///
    /// Has no effect if the call already has a terminal status.
    pub fn cancel(&self) -> bool {
        self.finish(Status::cancelled("Call cancelled by the caller"))
    }

    /// The terminal status, once set.
    pub fn status(&self) -> Option<Status> {
        self.inner.status.get().cloned()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.is_cancelled()
    }

    /// Whether the call ended with a non-OK status (cancelled, expired or
    /// failed).
    pub fn is_cancelled(&self) -> bool {
        self.inner.aborted.is_cancelled()
    }

    /// Cooperative cancellation checkpoint for handler work loops.
    ///
    /// # Errors
    ///
    /// Returns the terminal status if the call has been aborted.
    pub fn check(&self) -> Result<(), Status> {
        if self.is_cancelled() {
            return Err(self.abort_status());
        }
        Ok(())
    }

    /// Completes when the call is aborted.
    pub async fn cancelled(&self) {
        self.inner.aborted.cancelled().await;
    }

    /// Completes with the terminal status once one is set.
    pub async fn finished(&self) -> Status {
        self.inner.finished.cancelled().await;
        self.status().unwrap_or_else(Status::ok)
    }

    /// Sleeps for one bounded unit of handler work.
    ///
    /// The sleep ends early if the call is aborted, so work paced through this
    /// method observes cancellation within one unit.
    ///
    /// # Errors
    ///
    /// Returns the terminal status if the call is aborted before `unit`
    /// elapses.
    pub async fn work_unit(&self, unit: Duration) -> Result<(), Status> {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(self.abort_status()),
            () = tokio::time::sleep(unit) => Ok(()),
        }
    }

    /// The status that aborted the call. Only meaningful once aborted.
    pub(crate) fn abort_status(&self) -> Status {
        self.status()
            .unwrap_or_else(|| Status::internal("call aborted without a status"))
    }
}

impl core::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallContext")
            .field("method", &self.inner.method)
            .field("deadline", &self.inner.deadline)
            .field("status", &self.inner.status.get())
            .finish()
    }
}
