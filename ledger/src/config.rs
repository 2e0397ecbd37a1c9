//! Ledger engine configuration.

use std::time::Duration;

/// Tunables for the ledger engine and its collaborators.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Upper bound on acquiring a single balance row lock; exceeding it
    /// aborts the unit.
    pub lock_timeout: Duration,
    /// Lifetime of an admitted idempotency token.
    pub idempotency_ttl: Duration,
    /// Interval between expired-token cleanup passes.
    pub cleanup_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            idempotency_ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl LedgerConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout.is_zero() {
            return Err("Lock timeout cannot be zero".to_string());
        }
        if self.idempotency_ttl.is_zero() {
            return Err("Idempotency TTL cannot be zero".to_string());
        }
        if self.cleanup_interval.is_zero() {
            return Err("Cleanup interval cannot be zero".to_string());
        }
        Ok(())
    }
}
