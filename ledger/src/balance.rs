//! Bucketed wallet balances with row-level locking.
//!
//! Balances are a cache of state derivable from the journal, maintained
//! incrementally. All mutation goes through a held row lock; the locking
//! contract is part of this interface, not an incidental query option.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use walletd_common::{now, Result, Timestamp, WalletError, WalletId};

use crate::journal::BucketType;

/// Current balance of one (wallet, bucket) row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// Wallet this row belongs to.
    pub wallet_id: WalletId,
    /// Bucket tracked by this row.
    pub bucket: BucketType,
    /// Signed amount, minor currency units.
    pub amount: i64,
    /// When this row was last written.
    pub updated_at: Timestamp,
}

/// Key of a balance row. `Ord` defines the deterministic lock-acquisition
/// order used by the engine: ascending wallet id, then bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub wallet_id: WalletId,
    pub bucket: BucketType,
}

impl BalanceKey {
    /// Key of a wallet's committed bucket.
    pub fn committed(wallet_id: WalletId) -> Self {
        Self {
            wallet_id,
            bucket: BucketType::Committed,
        }
    }
}

/// A balance row held under its exclusive lock.
///
/// Deltas are staged against the locked row; `commit` writes the staged
/// amount through, dropping without commit leaves the row untouched. The
/// row lock is released when this handle is dropped, which must not happen
/// before the owning atomic unit ends.
#[derive(Debug)]
pub struct LockedBalance {
    guard: OwnedMutexGuard<Balance>,
    staged: i64,
}

impl LockedBalance {
    fn new(guard: OwnedMutexGuard<Balance>) -> Self {
        let staged = guard.amount;
        Self { guard, staged }
    }

    /// Wallet this row belongs to.
    pub fn wallet_id(&self) -> WalletId {
        self.guard.wallet_id
    }

    /// The staged amount as of the last add/deduct.
    pub fn staged(&self) -> i64 {
        self.staged
    }

    /// Stage a credit to this row. An overflowing staged amount aborts
    /// the unit with `CommitFailed`.
    pub fn add(&mut self, delta: i64) -> Result<()> {
        self.staged = self
            .staged
            .checked_add(delta)
            .ok_or_else(|| Self::overflow(self.guard.wallet_id))?;
        Ok(())
    }

    /// Stage a debit to this row.
    ///
    /// Customer-owned rows must not go negative; internal control wallets
    /// absorb the offsetting side of every external operation and bypass
    /// the check. An overflowing staged amount aborts the unit with
    /// `CommitFailed`.
    pub fn deduct(&mut self, delta: i64, customer_owned: bool) -> Result<()> {
        let next = self
            .staged
            .checked_sub(delta)
            .ok_or_else(|| Self::overflow(self.guard.wallet_id))?;
        if customer_owned && next < 0 {
            return Err(WalletError::InsufficientBalance {
                wallet_id: self.guard.wallet_id,
                available: self.staged,
                requested: delta,
            });
        }
        self.staged = next;
        Ok(())
    }

    /// Write the staged amount through and release the row on drop.
    pub fn commit(mut self) {
        self.guard.amount = self.staged;
        self.guard.updated_at = now();
    }

    fn overflow(wallet_id: WalletId) -> WalletError {
        WalletError::CommitFailed(format!("balance overflow on wallet {wallet_id}"))
    }
}

/// Store of balance rows, one exclusive lock per row.
pub struct BalanceStore {
    rows: DashMap<BalanceKey, Arc<Mutex<Balance>>>,
}

impl BalanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Create a zero row for (wallet, bucket). Idempotent.
    pub fn open(&self, wallet_id: WalletId, bucket: BucketType) {
        self.rows
            .entry(BalanceKey { wallet_id, bucket })
            .or_insert_with(|| {
                Arc::new(Mutex::new(Balance {
                    wallet_id,
                    bucket,
                    amount: 0,
                    updated_at: now(),
                }))
            });
    }

    /// Open every bucket of a wallet.
    pub fn open_wallet(&self, wallet_id: WalletId) {
        for bucket in BucketType::all() {
            self.open(wallet_id, bucket);
        }
    }

    /// Acquire the exclusive row lock and return the locked handle.
    ///
    /// The caller keeps the handle for the duration of its atomic unit;
    /// concurrent operations on the same row block here until it drops.
    pub async fn locked_get(&self, key: &BalanceKey) -> Result<LockedBalance> {
        // Clone the cell out before awaiting so no shard lock is held
        // across the suspension point.
        let cell = self
            .rows
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(WalletError::WalletNotFound(key.wallet_id))?;
        Ok(LockedBalance::new(cell.lock_owned().await))
    }

    /// Read a wallet's committed balance. Takes the row lock briefly, so
    /// the value observed is never mid-unit.
    pub async fn committed(&self, wallet_id: WalletId) -> Result<i64> {
        let locked = self.locked_get(&BalanceKey::committed(wallet_id)).await?;
        Ok(locked.staged())
    }

    /// Number of opened rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl Default for BalanceStore {
    fn default() -> Self {
        Self::new()
    }
}
