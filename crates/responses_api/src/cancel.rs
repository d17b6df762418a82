//! Cooperative cancellation shared by request, stream, and polling loops.

use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use crate::error::ApiError;

/// Optional cancellation signal shared across request and stream loops.
pub type CancelSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Creates a fresh, not-yet-cancelled signal.
pub fn cancel_signal() -> CancelSignal {
    Arc::new(AtomicBool::new(false))
}

pub fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

/// Fails with [`ApiError::Cancelled`] when the signal is already set.
pub fn ensure_not_cancelled(cancel: Option<&CancelSignal>) -> Result<(), ApiError> {
    if is_cancelled(cancel) {
        Err(ApiError::Cancelled)
    } else {
        Ok(())
    }
}

/// Awaits `future`, giving up within one poll interval of cancellation.
pub async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancelSignal>,
) -> Result<F::Output, ApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        ensure_not_cancelled(cancellation)?;

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            ensure_not_cancelled(cancellation)?;
            return Ok(output);
        }
    }
}

/// Sleeps for `duration` unless cancelled first.
pub async fn sleep_or_cancel(
    duration: Duration,
    cancellation: Option<&CancelSignal>,
) -> Result<(), ApiError> {
    await_or_cancel(tokio::time::sleep(duration), cancellation).await
}
