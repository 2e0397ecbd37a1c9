//! Error types for walletd operations.

use crate::{AccountId, UserId, WalletId};
use thiserror::Error;

/// Main error type for wallet and ledger operations.
#[derive(Error, Debug)]
pub enum WalletError {
    /// Requested amount is zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Idempotency token was already admitted within its TTL.
    #[error("duplicate request with idempotency token: {0}")]
    DuplicateRequest(String),

    /// Source and destination of a transfer are the same wallet.
    #[error("transfer to self is not allowed")]
    SelfTransferNotAllowed,

    /// A customer-owned committed balance would go negative.
    #[error("insufficient balance on wallet {wallet_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        wallet_id: WalletId,
        available: i64,
        requested: i64,
    },

    /// Unknown user.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// User exists but has no account.
    #[error("account not found for user: {0}")]
    AccountNotFound(UserId),

    /// Account exists but has no wallet, or the wallet id is unknown.
    #[error("wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Account exists but has no wallet attached.
    #[error("wallet not found for account: {0}")]
    WalletNotFoundForAccount(AccountId),

    /// Journal rejected a movement insert.
    #[error("create movement failed: {0}")]
    CreateMovementFailed(String),

    /// Journal rejected a transaction insert.
    #[error("create transaction failed: {0}")]
    CreateTransactionFailed(String),

    /// The atomic unit could not commit (includes lock timeouts).
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Unexpected fault; the unit was aborted.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl WalletError {
    /// Stable, documented error code for callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            WalletError::InvalidAmount(_) => "INVALID_AMOUNT",
            WalletError::DuplicateRequest(_) => "DUPLICATE_REQUEST",
            WalletError::SelfTransferNotAllowed => "CANNOT_TRANSFER_TO_SELF",
            WalletError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            WalletError::UserNotFound(_) => "INVALID_ACCOUNT",
            WalletError::AccountNotFound(_) => "INVALID_ACCOUNT",
            WalletError::WalletNotFound(_) => "INVALID_ACCOUNT",
            WalletError::WalletNotFoundForAccount(_) => "INVALID_ACCOUNT",
            WalletError::CreateMovementFailed(_) => "CREATE_MOVEMENT_FAILED",
            WalletError::CreateTransactionFailed(_) => "CREATE_TRANSACTION_FAILED",
            WalletError::CommitFailed(_) => "COMMIT_FAILED",
            WalletError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors detected before the atomic unit opens.
    ///
    /// Validation errors never leave partial writes behind; everything else
    /// is raised after the unit opened and implies an explicit abort.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WalletError::InvalidAmount(_)
                | WalletError::DuplicateRequest(_)
                | WalletError::SelfTransferNotAllowed
                | WalletError::UserNotFound(_)
                | WalletError::AccountNotFound(_)
                | WalletError::WalletNotFound(_)
                | WalletError::WalletNotFoundForAccount(_)
        )
    }

    /// True for failures after which the caller may resubmit with the
    /// same token; the service releases the admitted token when one of
    /// these surfaces.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::CommitFailed(_) | WalletError::InternalError(_)
        )
    }
}

/// Result type alias for walletd operations.
pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(WalletError::InvalidAmount(0).error_code(), "INVALID_AMOUNT");
        assert_eq!(
            WalletError::SelfTransferNotAllowed.error_code(),
            "CANNOT_TRANSFER_TO_SELF"
        );
        assert_eq!(
            WalletError::UserNotFound(UserId::new()).error_code(),
            "INVALID_ACCOUNT"
        );
        assert_eq!(
            WalletError::CommitFailed("lock timeout".into()).error_code(),
            "COMMIT_FAILED"
        );
    }

    #[test]
    fn test_validation_split() {
        assert!(WalletError::SelfTransferNotAllowed.is_validation());
        assert!(WalletError::DuplicateRequest("t".into()).is_validation());
        assert!(!WalletError::InsufficientBalance {
            wallet_id: WalletId::new(),
            available: 0,
            requested: 1,
        }
        .is_validation());
        assert!(!WalletError::CommitFailed("x".into()).is_validation());
    }

    #[test]
    fn test_retryable() {
        assert!(WalletError::CommitFailed("x".into()).is_retryable());
        assert!(!WalletError::DuplicateRequest("t".into()).is_retryable());
    }
}
