//! Delay between status checks.

use async_trait::async_trait;
use std::time::Duration;

/// Source of the pause between two status checks
///
/// Production code waits on the tokio timer; tests substitute an
/// implementation that returns immediately and records what was asked for.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the calling workflow for `duration`
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
