//! Cancellable waiting.
//!
//! Every suspension point of the builder goes through these helpers so that
//! cancellation is observed uniformly and reported as
//! [`ActivationError::Canceled`].

use crate::ActivationError;
use smesher_core::LayerClock;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ActivationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ActivationError::Canceled),
        out = fut => Ok(out),
    }
}

pub(crate) async fn sleep(
    cancel: &CancellationToken,
    duration: Duration,
) -> Result<(), ActivationError> {
    cancellable(cancel, tokio::time::sleep(duration)).await
}

/// Sleep until `at` on `clock`'s timeline. Returns at once if `at` passed.
pub(crate) async fn sleep_until(
    cancel: &CancellationToken,
    clock: &dyn LayerClock,
    at: SystemTime,
) -> Result<(), ActivationError> {
    let wait = at.duration_since(clock.now()).unwrap_or_default();
    sleep(cancel, wait).await
}

pub(crate) async fn wait_next_layer(
    cancel: &CancellationToken,
    clock: &dyn LayerClock,
) -> Result<(), ActivationError> {
    let next = clock.current_layer().next();
    cancellable(cancel, clock.await_layer(next)).await
}

/// A child cancellation token that also fires at a fixed time.
///
/// Errors produced under the token are passed through [`Deadline::map_err`]:
/// a cancellation caused by the timer rather than the parent becomes
/// [`ActivationError::DeadlineExceeded`].
pub(crate) struct Deadline {
    parent: CancellationToken,
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    pub(crate) fn new(parent: &CancellationToken, clock: &dyn LayerClock, at: SystemTime) -> Self {
        let token = parent.child_token();
        let wait = at.duration_since(clock.now()).unwrap_or_default();
        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = timer_token.cancelled() => {}
                _ = tokio::time::sleep(wait) => timer_token.cancel(),
            }
        });
        Self {
            parent: parent.clone(),
            token,
            timer,
        }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn map_err(&self, err: ActivationError) -> ActivationError {
        match err {
            ActivationError::Canceled if !self.parent.is_cancelled() => {
                ActivationError::DeadlineExceeded
            }
            other => other,
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smesher_simulation::SimClock;
    use smesher_types::LayerId;

    fn clock() -> SimClock {
        SimClock::new(Duration::from_secs(10), 5, LayerId(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_reports_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cancellable(&cancel, std::future::pending::<()>()).await;
        assert!(matches!(result, Err(ActivationError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_next_layer() {
        let clock = clock();
        let cancel = CancellationToken::new();

        wait_next_layer(&cancel, &clock).await.unwrap();
        assert_eq!(clock.current_layer(), LayerId(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_until_past_returns() {
        let clock = clock();
        let cancel = CancellationToken::new();
        let before = clock.now();

        sleep_until(&cancel, &clock, before - Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(clock.now(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_maps_timer_cancel() {
        let clock = clock();
        let parent = CancellationToken::new();
        let deadline = Deadline::new(&parent, &clock, clock.now() + Duration::from_secs(3));

        let err = sleep(deadline.token(), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(
            deadline.map_err(err),
            ActivationError::DeadlineExceeded
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_parent_cancel() {
        let clock = clock();
        let parent = CancellationToken::new();
        let deadline = Deadline::new(&parent, &clock, clock.now() + Duration::from_secs(30));

        parent.cancel();
        let err = sleep(deadline.token(), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(deadline.map_err(err), ActivationError::Canceled));
    }
}
