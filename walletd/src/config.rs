//! Service configuration.

use std::time::Duration;

use walletd_ledger::LedgerConfig;

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Log level.
    pub log_level: String,
    /// Currency new customer wallets are opened in.
    pub default_currency: String,
    /// Ledger engine tunables.
    pub ledger: LedgerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            default_currency: "USD".to_string(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(currency) = std::env::var("WALLETD_CURRENCY") {
            config.default_currency = currency;
        }

        if let Ok(ms) = std::env::var("WALLETD_LOCK_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.ledger.lock_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(secs) = std::env::var("WALLETD_IDEMPOTENCY_TTL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.ledger.idempotency_ttl = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("WALLETD_CLEANUP_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.ledger.cleanup_interval = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_currency.is_empty() {
            return Err("Currency cannot be empty".to_string());
        }
        self.ledger.validate()
    }
}
