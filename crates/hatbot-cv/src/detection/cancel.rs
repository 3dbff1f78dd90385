//! Request cancellation
//!
//! A [`CancelHandle`] is held by whoever owns the request; every stage of
//! the pipeline gets a [`CancelToken`]. Cancelling one request never touches
//! another.

use crate::error::{Dependency, PipelineError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Owner side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a cancellation pair. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle and token.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the request is cancelled. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            let cancelled = *rx.borrow_and_update();
            if cancelled {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Run one external call under a deadline, racing it against cancellation.
///
/// The call's own output is passed through untouched so the caller can
/// tell e.g. "not found" apart from a failure.
pub async fn with_deadline<F>(
    dependency: Dependency,
    limit: Duration,
    cancel: &CancelToken,
    call: F,
) -> Result<F::Output, PipelineError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = tokio::time::timeout(limit, call) => {
            result.map_err(|_| PipelineError::timeout(dependency, limit))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_visible_to_every_token() {
        let (handle, token) = cancel_pair();
        let other = handle.token();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancel_wakes_a_waiting_task() {
        let (handle, token) = cancel_pair();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        tokio::task::yield_now().await;
        handle.cancel();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_never_token_does_not_fire() {
        let token = CancelToken::never();
        let fired = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(fired.is_err());
    }

    #[tokio::test]
    async fn test_deadline_passes_output_through() {
        let out = with_deadline(
            Dependency::ObjectDetector,
            Duration::from_secs(1),
            &CancelToken::never(),
            async { Err::<u8, &str>("nope") },
        )
        .await
        .unwrap();
        assert_eq!(out, Err("nope"));
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let err = with_deadline(
            Dependency::ObjectDetector,
            Duration::from_millis(10),
            &CancelToken::never(),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert!(err.is_transient());
    }
}
