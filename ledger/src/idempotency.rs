//! Idempotent request admission.
//!
//! Deduplicates logically-retried operation requests: the first sight of a
//! token marks it as seen with a fixed expiry, a repeat within the TTL is
//! rejected outright. Token format is not validated here; supplying one at
//! all is the caller's obligation.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use walletd_common::{Result, WalletError};

/// Guard that admits each idempotency token at most once per TTL window.
pub struct IdempotencyGuard {
    seen: DashMap<String, Instant>,
    ttl: Duration,
    cleanup_interval: Duration,
}

impl IdempotencyGuard {
    /// Create a guard with the given token lifetime and cleanup interval.
    pub fn new(ttl: Duration, cleanup_interval: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
            cleanup_interval,
        }
    }

    /// Admit a token, or reject a duplicate.
    ///
    /// The check-and-set runs under the map's shard lock, so of two
    /// concurrent requests bearing the same token exactly one is admitted.
    /// Rejection has no side effects.
    pub fn admit(&self, token: &str) -> Result<()> {
        let now = Instant::now();
        match self.seen.entry(token.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() > now {
                    return Err(WalletError::DuplicateRequest(token.to_string()));
                }
                // Expired entry: reclaim it for this request.
                occupied.insert(now + self.ttl);
                Ok(())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now + self.ttl);
                Ok(())
            }
        }
    }

    /// Forget a token so the caller can retry with it. Used when an
    /// admitted operation aborts without committing anything.
    pub fn release(&self, token: &str) {
        self.seen.remove(token);
    }

    /// Number of live (admitted, unexpired) tokens.
    pub fn live_count(&self) -> usize {
        let now = Instant::now();
        self.seen.iter().filter(|entry| *entry.value() > now).count()
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.seen.len();
        self.seen.retain(|_, expires_at| *expires_at > now);
        let purged = before - self.seen.len();
        if purged > 0 {
            debug!(purged, "Purged expired idempotency tokens");
        }
    }

    /// Run the periodic cleanup loop.
    pub async fn run_cleanup_loop(&self) {
        loop {
            tokio::time::sleep(self.cleanup_interval).await;
            self.purge_expired();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn guard_with_ttl(ttl: Duration) -> IdempotencyGuard {
        IdempotencyGuard::new(ttl, Duration::from_secs(60))
    }

    #[test]
    fn test_admit_then_reject() {
        let guard = guard_with_ttl(Duration::from_secs(3600));
        guard.admit("req-1").unwrap();

        let err = guard.admit("req-1").unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_REQUEST");

        // different token is unaffected
        guard.admit("req-2").unwrap();
        assert_eq!(guard.live_count(), 2);
    }

    #[test]
    fn test_released_token_is_readmitted() {
        let guard = guard_with_ttl(Duration::from_secs(3600));
        guard.admit("req-1").unwrap();
        guard.release("req-1");
        guard.admit("req-1").unwrap();
    }

    #[test]
    fn test_expired_token_is_readmitted() {
        let guard = guard_with_ttl(Duration::ZERO);
        guard.admit("req-1").unwrap();
        guard.admit("req-1").unwrap();
    }

    #[test]
    fn test_purge_expired() {
        let guard = guard_with_ttl(Duration::ZERO);
        guard.admit("req-1").unwrap();
        guard.admit("req-2").unwrap();
        guard.purge_expired();
        assert_eq!(guard.live_count(), 0);
        assert_eq!(guard.seen.len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_admission_single_winner() {
        let guard = Arc::new(guard_with_ttl(Duration::from_secs(3600)));
        let admitted = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let guard = Arc::clone(&guard);
            let admitted = Arc::clone(&admitted);
            handles.push(tokio::spawn(async move {
                if guard.admit("contended-token").is_ok() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
