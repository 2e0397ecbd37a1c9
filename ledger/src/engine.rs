//! Core ledger engine: executes one operation plan as a single atomic unit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{info, instrument, warn};

use walletd_common::{GroupId, MovementId, Result, WalletError};

use crate::balance::{BalanceKey, BalanceStore, LockedBalance};
use crate::config::LedgerConfig;
use crate::journal::JournalStore;
use crate::operations::OperationPlan;

/// Proof of a durable commit, returned to the caller.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// Movements recorded by the unit.
    pub movement_ids: Vec<MovementId>,
    /// Group linking the movements, if the operation had one.
    pub group_id: Option<GroupId>,
}

/// The ledger engine.
///
/// Orchestrates one operation as an all-or-nothing unit: balance row locks
/// are acquired in ascending key order, deltas are staged against the
/// locked rows, the journal batch is appended atomically, and only then are
/// the staged balances written through. Any failure before the write-through
/// drops the unit, releasing the locks with no observable change.
pub struct LedgerEngine {
    journal: Arc<JournalStore>,
    balances: Arc<BalanceStore>,
    config: LedgerConfig,
}

impl LedgerEngine {
    /// Create a new engine over the given stores.
    pub fn new(journal: Arc<JournalStore>, balances: Arc<BalanceStore>, config: LedgerConfig) -> Self {
        Self {
            journal,
            balances,
            config,
        }
    }

    /// Execute a plan. Returns only after a durable commit; any error
    /// means nothing happened.
    #[instrument(skip(self, plan), fields(movements = plan.movements.len()))]
    pub async fn execute(&self, plan: OperationPlan) -> Result<CommitReceipt> {
        // The planner always produces balanced entries; an unbalanced plan
        // is a caller bug and must not reach the journal.
        if !plan.is_balanced() {
            return Err(WalletError::CreateTransactionFailed(
                "transactions do not balance per movement".to_string(),
            ));
        }

        // Lock every affected row in ascending key order. The order is
        // identical across all call sites, which is what prevents
        // lock-ordering deadlocks between overlapping operations.
        let keys: BTreeSet<BalanceKey> = plan.deltas.iter().map(|d| d.key).collect();
        let mut locked: BTreeMap<BalanceKey, LockedBalance> = BTreeMap::new();
        for key in keys {
            let row = match timeout(self.config.lock_timeout, self.balances.locked_get(&key)).await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(wallet_id = %key.wallet_id, "Balance lock acquisition timed out");
                    return Err(WalletError::CommitFailed(format!(
                        "balance lock acquisition timed out for wallet {}",
                        key.wallet_id
                    )));
                }
            };
            locked.insert(key, row);
        }

        // Stage the deltas. InsufficientBalance aborts here, before any
        // journal row exists.
        for delta in &plan.deltas {
            let row = locked
                .get_mut(&delta.key)
                .ok_or_else(|| WalletError::InternalError("unlocked delta row".to_string()))?;
            if delta.delta >= 0 {
                row.add(delta.delta)?;
            } else {
                row.deduct(-delta.delta, delta.enforce_floor)?;
            }
        }

        // Journal first: the batch append is atomic, so a rejection leaves
        // the journal untouched and the staged balances are simply dropped.
        self.journal
            .append_batch(&plan.movements, &plan.transactions)?;

        // Write the staged balances through the held locks. Infallible, so
        // journal and balances commit or abort together.
        for (_, row) in locked {
            row.commit();
        }

        let receipt = CommitReceipt {
            movement_ids: plan.movements.iter().map(|m| m.id).collect(),
            group_id: plan.group_id,
        };
        info!(
            movements = receipt.movement_ids.len(),
            group_id = ?receipt.group_id,
            "Ledger unit committed"
        );
        Ok(receipt)
    }
}
