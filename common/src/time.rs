//! Time utilities for walletd.

use chrono::{DateTime, Utc};

/// A timestamp with timezone (always UTC for walletd).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_now_advances() {
        let a = now();
        let b = now();
        assert!(b - a >= Duration::zero());
    }
}
