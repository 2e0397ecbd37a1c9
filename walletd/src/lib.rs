//! walletd Wallet Service
//!
//! Service layer over the ledger engine: customer directory, operation
//! orchestration with idempotent admission, and the journal-backed
//! payment-history read path.

pub mod config;
pub mod directory;
pub mod history;
pub mod service;

pub use config::ServiceConfig;
pub use directory::{Account, AccountType, Directory, User, Wallet, WalletStatus};
pub use history::{LedgerLine, PaymentKind};
pub use service::WalletService;
