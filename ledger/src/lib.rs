//! walletd Ledger Engine
//!
//! Double-entry ledger core: append-only journal, bucketed wallet balances
//! with row-level locking, idempotent request admission, and the atomic
//! execution unit that ties them together.

pub mod balance;
pub mod chart;
pub mod config;
pub mod engine;
pub mod idempotency;
pub mod journal;
pub mod operations;

pub use balance::{Balance, BalanceKey, BalanceStore, LockedBalance};
pub use chart::ChartAccounts;
pub use config::LedgerConfig;
pub use engine::{CommitReceipt, LedgerEngine};
pub use idempotency::IdempotencyGuard;
pub use journal::{BucketType, JournalStore, Movement, MovementStatus, Transaction};
pub use operations::{BalanceDelta, Operation, OperationPlan};
