//! walletd Common Types
//!
//! Shared types used across the walletd crates: identifiers, the error
//! taxonomy, and time utilities.

pub mod error;
pub mod identifiers;
pub mod time;

pub use error::*;
pub use identifiers::*;
pub use time::*;
