//! Shared state for a single test run.
//!
//! All measurement streams of one run share a cancellation token and
//! a pair of transfer counters. Everything here is cheap to clone and
//! safe to hand to spawned tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::errors::SpeedTestError;

/// Cooperative cancellation flag.
///
/// Measurement loops poll the flag at their check points; cancelling
/// never interrupts a task mid-instruction.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Tasks observe it at their next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Error out when cancellation has been requested.
    pub fn ensure_active(&self) -> Result<(), SpeedTestError> {
        if self.is_cancelled() {
            Err(SpeedTestError::cancelled())
        } else {
            Ok(())
        }
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Counters shared by every stream of a single run.
#[derive(Debug, Clone)]
pub struct RunContext {
    token: CancelToken,
    bytes_down: Arc<AtomicU64>,
    bytes_up: Arc<AtomicU64>,
    tags: Arc<AtomicU64>,
}

impl RunContext {
    pub fn new(token: CancelToken) -> Self {
        // Tags are seeded with the wall clock so cache busters differ
        // across runs as well as within one.
        let seed = Utc::now().timestamp_millis().max(0) as u64;

        Self {
            token,
            bytes_down: Arc::new(AtomicU64::new(0)),
            bytes_up: Arc::new(AtomicU64::new(0)),
            tags: Arc::new(AtomicU64::new(seed)),
        }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Record downloaded bytes, returning the new run total.
    pub fn add_download_bytes(&self, n: u64) -> u64 {
        self.bytes_down.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn download_bytes(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    /// Record uploaded bytes, returning the new run total.
    pub fn add_upload_bytes(&self, n: u64) -> u64 {
        self.bytes_up.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn upload_bytes(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    /// Unique cache-busting tag for the next request.
    pub fn next_tag(&self) -> u64 {
        self.tags.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_cancel_is_visible_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_ensure_active_reports_cancellation() {
        let token = CancelToken::new();
        assert!(token.ensure_active().is_ok());

        token.cancel();
        let error = token.ensure_active().unwrap_err();
        assert_eq!(error.kind, ErrorKind::Cancelled);
        assert!(error.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled() should resolve promptly")
            .unwrap();
    }

    #[test]
    fn test_byte_counters_accumulate_across_clones() {
        let ctx = RunContext::new(CancelToken::new());
        let clone = ctx.clone();

        assert_eq!(ctx.add_download_bytes(100), 100);
        assert_eq!(clone.add_download_bytes(50), 150);
        assert_eq!(ctx.download_bytes(), 150);

        assert_eq!(ctx.add_upload_bytes(10), 10);
        assert_eq!(clone.upload_bytes(), 10);
    }

    #[test]
    fn test_tags_are_unique() {
        let ctx = RunContext::new(CancelToken::new());
        let first = ctx.next_tag();
        let second = ctx.next_tag();
        assert!(second > first);
    }
}
