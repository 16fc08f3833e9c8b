//! Caller-owned cancellation signal

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Shared cancellation signal observed by a run.
///
/// Clones share one signal. Cancelling is idempotent and sticky: once
/// cancelled the handle stays cancelled, and a run started with it
/// resolves to [`Outcome::Cancelled`](crate::Outcome::Cancelled) without
/// launching anything. Use a fresh handle for each run that should be
/// cancellable independently.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Further calls have no effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the handle is cancelled
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_clones_share_signal() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let handle = CancelHandle::new();
        let remote = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.cancel();
        });
        tokio::time::timeout(Duration::from_secs(2), handle.cancelled())
            .await
            .unwrap();
    }
}
