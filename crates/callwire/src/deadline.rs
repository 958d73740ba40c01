//! Deadline enforcement.
//!
//! [`arm`] attaches a timer to a call. When the deadline passes before the
//! call has a terminal status, the timer finishes the call with
//! `DeadlineExceeded`, which in turn releases every party suspended on the
//! call's channels. If the handler finishes first, the timer exits without
//! touching the status.

use crate::{CallContext, Status};
use core::time::Duration;
use tokio::{task::JoinHandle, time::Instant};

/// Resolves a relative timeout and an absolute deadline into the earliest
/// absolute deadline, if any.
pub fn resolve(timeout: Option<Duration>, deadline: Option<Instant>) -> Option<Instant> {
    let from_timeout = timeout.map(|timeout| Instant::now() + timeout);
    match (from_timeout, deadline) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Spawns the deadline timer for `ctx`.
///
/// Returns `None` when the call has no deadline. Arming the same call more
/// than once is harmless: the first expiry wins and the others are discarded.
pub fn arm(ctx: &CallContext) -> Option<JoinHandle<()>> {
    let deadline = ctx.deadline()?;
    let ctx = ctx.clone();

    Some(tokio::spawn(async move {
        tokio::select! {
            _ = ctx.finished() => {}
            () = tokio::time::sleep_until(deadline) => {
                let _fired = ctx.finish(Status::deadline_exceeded(format!(
                    "Deadline exceeded for {}",
                    ctx.method().path()
                )));

                #[cfg(feature = "tracing")]
                if _fired {
                    tracing::debug!(method = %ctx.method(), "Call deadline exceeded");
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallKind, Code, MethodDescriptor};

    const METHOD: MethodDescriptor =
        MethodDescriptor::from_static("test.Deadline", "Wait", CallKind::Unary);

    #[tokio::test(start_paused = true)]
    async fn expiry_sets_deadline_exceeded() {
        let start = Instant::now();
        let ctx = CallContext::new(METHOD, Some(start + Duration::from_secs(2)));
        let timer = arm(&ctx).unwrap();

        let status = ctx.finished().await;
        assert_eq!(status.code(), Code::DeadlineExceeded);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        timer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn completion_before_deadline_wins() {
        let ctx = CallContext::new(METHOD, Some(Instant::now() + Duration::from_secs(5)));
        let timer = arm(&ctx).unwrap();

        assert!(ctx.finish(Status::ok()));
        timer.await.unwrap();
        assert_eq!(ctx.status(), Some(Status::ok()));
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_fires_immediately() {
        let ctx = CallContext::new(METHOD, Some(Instant::now()));
        arm(&ctx).unwrap().await.unwrap();
        assert_eq!(ctx.status().map(|s| s.code()), Some(Code::DeadlineExceeded));
    }

    #[test]
    fn no_deadline_no_timer() {
        let ctx = CallContext::new(METHOD, None);
        assert!(arm(&ctx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_picks_earliest() {
        let now = Instant::now();
        let later = now + Duration::from_secs(10);
        assert_eq!(resolve(None, None), None);
        assert_eq!(resolve(None, Some(later)), Some(later));
        assert_eq!(
            resolve(Some(Duration::from_secs(1)), Some(later)),
            Some(now + Duration::from_secs(1))
        );
        assert_eq!(resolve(Some(Duration::from_secs(20)), Some(later)), Some(later));
    }
}
