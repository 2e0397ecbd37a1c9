//! Journal types and the append-only journal store.
//!
//! Movements and transactions are write-once facts; balances are derived
//! from them. The store enforces id uniqueness and referential integrity,
//! nothing more — the engine is responsible for the balance invariant.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use walletd_common::{
    now, GroupId, MovementId, Result, Timestamp, TransactionId, WalletError, WalletId,
};

/// Balance bucket a ledger line settles into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BucketType {
    /// Funds reserved for a pending external debit.
    ReservedDebit,
    /// Funds reserved for a pending external credit.
    ReservedCredit,
    /// Settled funds.
    Committed,
}

impl BucketType {
    /// All bucket types, in lock order.
    pub fn all() -> [BucketType; 3] {
        [
            BucketType::ReservedDebit,
            BucketType::ReservedCredit,
            BucketType::Committed,
        ]
    }
}

/// Movement status. Completed is the only terminal state produced here;
/// no intermediate pending state is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementStatus {
    Completed,
}

/// One logical monetary event linking a debit wallet and a credit wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    /// Unique movement ID.
    pub id: MovementId,
    /// Links the symmetric movements of a transfer; deposits carry none.
    pub group_id: Option<GroupId>,
    /// Wallet on the debit side.
    pub debit_wallet_id: WalletId,
    /// Wallet on the credit side.
    pub credit_wallet_id: WalletId,
    /// Amount on the debit side, minor currency units.
    pub debit_amount: i64,
    /// Amount on the credit side, minor currency units.
    pub credit_amount: i64,
    /// Movement status.
    pub status: MovementStatus,
    /// When this movement was created.
    pub created_at: Timestamp,
    /// When this movement was last updated.
    pub updated_at: Timestamp,
}

impl Movement {
    /// Create a completed movement.
    pub fn completed(
        group_id: Option<GroupId>,
        debit_wallet_id: WalletId,
        credit_wallet_id: WalletId,
        debit_amount: i64,
        credit_amount: i64,
    ) -> Self {
        let ts = now();
        Self {
            id: MovementId::new(),
            group_id,
            debit_wallet_id,
            credit_wallet_id,
            debit_amount,
            credit_amount,
            status: MovementStatus::Completed,
            created_at: ts,
            updated_at: ts,
        }
    }

    /// Check whether a wallet participates in this movement.
    pub fn touches(&self, wallet_id: WalletId) -> bool {
        self.debit_wallet_id == wallet_id || self.credit_wallet_id == wallet_id
    }
}

/// One wallet's share of a movement, recorded in a specific bucket.
///
/// The signed amount follows the double-entry convention: the debit-side
/// wallet's line is positive, the credit-side wallet's line is negative,
/// so the lines of a movement always sum to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID.
    pub id: TransactionId,
    /// Movement this line belongs to.
    pub movement_id: MovementId,
    /// Wallet affected.
    pub wallet_id: WalletId,
    /// Bucket the amount settles into.
    pub bucket: BucketType,
    /// Signed amount, minor currency units.
    pub amount: i64,
    /// When this line was created.
    pub created_at: Timestamp,
    /// When this line was last updated.
    pub updated_at: Timestamp,
}

impl Transaction {
    /// Create a committed-bucket ledger line.
    pub fn committed(movement_id: MovementId, wallet_id: WalletId, amount: i64) -> Self {
        let ts = now();
        Self {
            id: TransactionId::new(),
            movement_id,
            wallet_id,
            bucket: BucketType::Committed,
            amount,
            created_at: ts,
            updated_at: ts,
        }
    }
}

/// Verify that the given lines balance to zero per movement.
pub fn lines_balance(movements: &[Movement], transactions: &[Transaction]) -> bool {
    movements.iter().all(|m| {
        transactions
            .iter()
            .filter(|t| t.movement_id == m.id)
            .map(|t| t.amount)
            .sum::<i64>()
            == 0
    })
}

#[derive(Default)]
struct JournalInner {
    movements: Vec<Movement>,
    transactions: Vec<Transaction>,
    movement_ids: HashSet<MovementId>,
    transaction_ids: HashSet<TransactionId>,
}

impl JournalInner {
    fn check_movements(&self, movements: &[Movement]) -> Result<()> {
        let mut batch_ids = HashSet::new();
        for m in movements {
            if self.movement_ids.contains(&m.id) || !batch_ids.insert(m.id) {
                return Err(WalletError::CreateMovementFailed(format!(
                    "duplicate movement id {}",
                    m.id
                )));
            }
        }
        Ok(())
    }

    fn check_transactions(
        &self,
        transactions: &[Transaction],
        new_movements: &HashSet<MovementId>,
    ) -> Result<()> {
        let mut batch_ids = HashSet::new();
        for t in transactions {
            if self.transaction_ids.contains(&t.id) || !batch_ids.insert(t.id) {
                return Err(WalletError::CreateTransactionFailed(format!(
                    "duplicate transaction id {}",
                    t.id
                )));
            }
            if !self.movement_ids.contains(&t.movement_id)
                && !new_movements.contains(&t.movement_id)
            {
                return Err(WalletError::CreateTransactionFailed(format!(
                    "unknown movement {} referenced by transaction {}",
                    t.movement_id, t.id
                )));
            }
        }
        Ok(())
    }

    fn insert_movements(&mut self, movements: &[Movement]) {
        for m in movements {
            self.movement_ids.insert(m.id);
            self.movements.push(m.clone());
        }
    }

    fn insert_transactions(&mut self, transactions: &[Transaction]) {
        for t in transactions {
            self.transaction_ids.insert(t.id);
            self.transactions.push(t.clone());
        }
    }
}

/// Append-only store of movements and transactions.
pub struct JournalStore {
    inner: RwLock<JournalInner>,
}

impl JournalStore {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(JournalInner::default()),
        }
    }

    /// Append movements. Pure insert; fails on duplicate ids without
    /// writing anything.
    pub fn append_movements(&self, movements: &[Movement]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_movements(movements)?;
        inner.insert_movements(movements);
        Ok(())
    }

    /// Append transactions. Every line must reference a movement already
    /// in the journal; fails without writing anything otherwise.
    pub fn append_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_transactions(transactions, &HashSet::new())?;
        inner.insert_transactions(transactions);
        Ok(())
    }

    /// Append movements and their transactions under one write lock.
    /// Either everything lands or nothing does; this is the engine's
    /// commit path.
    pub fn append_batch(&self, movements: &[Movement], transactions: &[Transaction]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_movements(movements)?;
        let new_ids: HashSet<MovementId> = movements.iter().map(|m| m.id).collect();
        inner.check_transactions(transactions, &new_ids)?;
        inner.insert_movements(movements);
        inner.insert_transactions(transactions);
        Ok(())
    }

    /// All movements a wallet participates in, in append order.
    pub fn movements_for_wallet(&self, wallet_id: WalletId) -> Vec<Movement> {
        self.inner
            .read()
            .movements
            .iter()
            .filter(|m| m.touches(wallet_id))
            .cloned()
            .collect()
    }

    /// All movements sharing a group id.
    pub fn movements_in_group(&self, group_id: GroupId) -> Vec<Movement> {
        self.inner
            .read()
            .movements
            .iter()
            .filter(|m| m.group_id == Some(group_id))
            .cloned()
            .collect()
    }

    /// Ledger lines of one movement.
    pub fn transactions_for_movement(&self, movement_id: MovementId) -> Vec<Transaction> {
        self.inner
            .read()
            .transactions
            .iter()
            .filter(|t| t.movement_id == movement_id)
            .cloned()
            .collect()
    }

    /// Total number of movements recorded.
    pub fn movement_count(&self) -> usize {
        self.inner.read().movements.len()
    }

    /// Total number of ledger lines recorded.
    pub fn transaction_count(&self) -> usize {
        self.inner.read().transactions.len()
    }
}

impl Default for JournalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_movement() -> Movement {
        Movement::completed(None, WalletId::new(), WalletId::new(), 1000, 1000)
    }

    #[test]
    fn test_append_and_query() {
        let store = JournalStore::new();
        let m = sample_movement();
        let debit = Transaction::committed(m.id, m.debit_wallet_id, 1000);
        let credit = Transaction::committed(m.id, m.credit_wallet_id, -1000);

        store.append_movements(std::slice::from_ref(&m)).unwrap();
        store
            .append_transactions(&[debit.clone(), credit.clone()])
            .unwrap();

        assert_eq!(store.movement_count(), 1);
        assert_eq!(store.transaction_count(), 2);
        assert_eq!(store.movements_for_wallet(m.debit_wallet_id).len(), 1);
        assert_eq!(store.transactions_for_movement(m.id).len(), 2);
    }

    #[test]
    fn test_duplicate_movement_rejected() {
        let store = JournalStore::new();
        let m = sample_movement();
        store.append_movements(std::slice::from_ref(&m)).unwrap();

        let err = store
            .append_movements(std::slice::from_ref(&m))
            .unwrap_err();
        assert_eq!(err.error_code(), "CREATE_MOVEMENT_FAILED");
        assert_eq!(store.movement_count(), 1);
    }

    #[test]
    fn test_transaction_requires_known_movement() {
        let store = JournalStore::new();
        let orphan = Transaction::committed(MovementId::new(), WalletId::new(), 500);

        let err = store
            .append_transactions(std::slice::from_ref(&orphan))
            .unwrap_err();
        assert_eq!(err.error_code(), "CREATE_TRANSACTION_FAILED");
        assert_eq!(store.transaction_count(), 0);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let store = JournalStore::new();
        let m = sample_movement();
        let good = Transaction::committed(m.id, m.debit_wallet_id, 1000);
        let orphan = Transaction::committed(MovementId::new(), m.credit_wallet_id, -1000);

        let err = store
            .append_batch(std::slice::from_ref(&m), &[good, orphan])
            .unwrap_err();
        assert_eq!(err.error_code(), "CREATE_TRANSACTION_FAILED");
        assert_eq!(store.movement_count(), 0);
        assert_eq!(store.transaction_count(), 0);
    }

    #[test]
    fn test_lines_balance() {
        let m = sample_movement();
        let balanced = vec![
            Transaction::committed(m.id, m.debit_wallet_id, 1000),
            Transaction::committed(m.id, m.credit_wallet_id, -1000),
        ];
        assert!(lines_balance(std::slice::from_ref(&m), &balanced));

        let lopsided = vec![Transaction::committed(m.id, m.debit_wallet_id, 1000)];
        assert!(!lines_balance(std::slice::from_ref(&m), &lopsided));
    }

    #[test]
    fn test_movements_in_group() {
        let store = JournalStore::new();
        let group = GroupId::new();
        let out_leg = Movement::completed(Some(group), WalletId::new(), WalletId::new(), 500, -500);
        let in_leg = Movement::completed(Some(group), WalletId::new(), WalletId::new(), 500, -500);
        let unrelated = sample_movement();

        store
            .append_movements(&[out_leg, in_leg, unrelated])
            .unwrap();
        assert_eq!(store.movements_in_group(group).len(), 2);
    }
}
