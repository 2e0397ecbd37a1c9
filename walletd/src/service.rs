//! Wallet service orchestration.
//!
//! One entry point per business operation: admit the idempotency token,
//! resolve the wallets involved, plan the journal entries and balance
//! deltas, then hand the plan to the ledger engine as a single atomic
//! unit. A non-success result always means nothing happened.

use std::sync::Arc;

use tracing::{error, info, instrument};

use walletd_common::{Result, UserId, WalletError, WalletId};
use walletd_ledger::{
    operations, BalanceStore, ChartAccounts, CommitReceipt, IdempotencyGuard, JournalStore,
    LedgerEngine, Operation,
};

use crate::config::ServiceConfig;
use crate::directory::{Directory, User};
use crate::history::{self, LedgerLine};

/// The wallet service: directory, idempotency guard, and ledger engine
/// wired together over shared stores.
pub struct WalletService {
    config: ServiceConfig,
    directory: Arc<Directory>,
    journal: Arc<JournalStore>,
    balances: Arc<BalanceStore>,
    engine: Arc<LedgerEngine>,
    guard: Arc<IdempotencyGuard>,
    chart: ChartAccounts,
}

impl WalletService {
    /// Construct the service and open the control wallets' balance rows.
    pub fn new(config: ServiceConfig) -> Self {
        let chart = ChartAccounts::standard();
        let directory = Arc::new(Directory::new());
        let journal = Arc::new(JournalStore::new());
        let balances = Arc::new(BalanceStore::new());
        let guard = Arc::new(IdempotencyGuard::new(
            config.ledger.idempotency_ttl,
            config.ledger.cleanup_interval,
        ));
        let engine = Arc::new(LedgerEngine::new(
            Arc::clone(&journal),
            Arc::clone(&balances),
            config.ledger.clone(),
        ));

        balances.open_wallet(chart.asset);
        balances.open_wallet(chart.liability);
        directory.register_control_wallet(chart.asset);
        directory.register_control_wallet(chart.liability);

        Self {
            config,
            directory,
            journal,
            balances,
            engine,
            guard,
            chart,
        }
    }

    /// Spawn background maintenance (idempotency token cleanup).
    pub fn start(&self) {
        let guard = Arc::clone(&self.guard);
        tokio::spawn(async move {
            guard.run_cleanup_loop().await;
        });
    }

    /// The control wallets in use.
    pub fn chart(&self) -> ChartAccounts {
        self.chart
    }

    /// Register a customer: user, account, wallet, and its balance rows.
    pub fn register_customer(&self, name: impl Into<String>) -> User {
        let user = self
            .directory
            .register_user(name, self.config.default_currency.clone());
        // register_user never fails, so the wallet is always resolvable
        if let Ok(wallet) = self.directory.resolve_wallet(user.id) {
            self.balances.open_wallet(wallet.id);
        }
        user
    }

    /// Deposit into a user's wallet.
    #[instrument(skip(self, token), fields(user_id = %user_id, amount))]
    pub async fn deposit(&self, user_id: UserId, amount: i64, token: &str) -> Result<CommitReceipt> {
        self.guard.admit(token)?;
        let wallet = self.directory.resolve_wallet(user_id)?;
        let receipt = self
            .run(
                Operation::Deposit {
                    wallet_id: wallet.id,
                    amount,
                },
                token,
            )
            .await?;
        info!(user_id = %user_id, amount, "Deposit successful");
        Ok(receipt)
    }

    /// Withdraw from a user's wallet.
    #[instrument(skip(self, token), fields(user_id = %user_id, amount))]
    pub async fn withdraw(&self, user_id: UserId, amount: i64, token: &str) -> Result<CommitReceipt> {
        self.guard.admit(token)?;
        let wallet = self.directory.resolve_wallet(user_id)?;
        let receipt = self
            .run(
                Operation::Withdraw {
                    wallet_id: wallet.id,
                    amount,
                },
                token,
            )
            .await?;
        info!(user_id = %user_id, amount, "Withdrawal successful");
        Ok(receipt)
    }

    /// Transfer between two users' wallets.
    #[instrument(skip(self, token), fields(from = %from_user, to = %to_user, amount))]
    pub async fn transfer(
        &self,
        from_user: UserId,
        to_user: UserId,
        amount: i64,
        token: &str,
    ) -> Result<CommitReceipt> {
        if from_user == to_user {
            return Err(WalletError::SelfTransferNotAllowed);
        }
        self.guard.admit(token)?;
        let from_wallet = self.directory.resolve_wallet(from_user)?;
        let to_wallet = self.directory.resolve_wallet(to_user)?;
        let receipt = self
            .run(
                Operation::Transfer {
                    from_wallet_id: from_wallet.id,
                    to_wallet_id: to_wallet.id,
                    amount,
                },
                token,
            )
            .await?;
        info!(from = %from_user, to = %to_user, amount, "Transfer successful");
        Ok(receipt)
    }

    /// A user's committed balance in minor units.
    pub async fn committed_balance(&self, user_id: UserId) -> Result<i64> {
        let wallet = self.directory.resolve_wallet(user_id)?;
        self.balances.committed(wallet.id).await
    }

    /// A control wallet's committed balance (reconciliation read).
    pub async fn control_balance(&self, wallet_id: WalletId) -> Result<i64> {
        if !self.chart.is_control(wallet_id) {
            return Err(WalletError::WalletNotFound(wallet_id));
        }
        self.balances.committed(wallet_id).await
    }

    /// A user's payment history, derived from the journal, oldest first.
    pub fn ledger_lines(&self, user_id: UserId) -> Result<Vec<LedgerLine>> {
        let wallet = self.directory.resolve_wallet(user_id)?;
        Ok(history::ledger_lines(
            &self.journal,
            &self.directory,
            &self.chart,
            wallet.id,
        ))
    }

    /// Execute an operation whose token has been admitted. A retryable
    /// failure committed nothing, so the token is released for the
    /// caller's resubmission.
    async fn run(&self, op: Operation, token: &str) -> Result<CommitReceipt> {
        let result = self.execute(op).await;
        if let Err(err) = &result {
            if err.is_retryable() {
                self.guard.release(token);
            }
        }
        result
    }

    /// Plan the operation and execute it on its own task, so an
    /// unexpected panic inside the unit is contained: the unit's staged
    /// state is dropped, its locks release, and the caller sees
    /// `InternalError` instead of a crash.
    async fn execute(&self, op: Operation) -> Result<CommitReceipt> {
        let plan = operations::plan(&op, &self.chart)?;
        let engine = Arc::clone(&self.engine);
        match tokio::spawn(async move { engine.execute(plan).await }).await {
            Ok(result) => result,
            Err(join_error) => {
                error!(error = %join_error, kind = op.kind(), "Ledger unit task failed");
                Err(WalletError::InternalError(format!(
                    "ledger unit task failed: {join_error}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::OPERATOR_NAME;
    use crate::history::PaymentKind;

    fn service() -> WalletService {
        WalletService::new(ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_deposit_scenario() {
        let svc = service();
        let alice = svc.register_customer("alice");

        svc.deposit(alice.id, 10_000, "dep-1").await.unwrap();

        assert_eq!(svc.committed_balance(alice.id).await.unwrap(), 10_000);
        assert_eq!(svc.control_balance(svc.chart().asset).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw_scenario() {
        let svc = service();
        let alice = svc.register_customer("alice");

        svc.deposit(alice.id, 20_000, "dep-1").await.unwrap();
        svc.withdraw(alice.id, 10_000, "wd-1").await.unwrap();

        assert_eq!(svc.committed_balance(alice.id).await.unwrap(), 10_000);
        assert_eq!(
            svc.control_balance(svc.chart().liability).await.unwrap(),
            10_000
        );
    }

    #[tokio::test]
    async fn test_transfer_scenario() {
        let svc = service();
        let alice = svc.register_customer("alice");
        let bob = svc.register_customer("bob");

        svc.deposit(alice.id, 10_000, "dep-1").await.unwrap();
        svc.transfer(alice.id, bob.id, 10_000, "tr-1").await.unwrap();

        assert_eq!(svc.committed_balance(alice.id).await.unwrap(), 0);
        assert_eq!(svc.committed_balance(bob.id).await.unwrap(), 10_000);
        assert_eq!(svc.control_balance(svc.chart().liability).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_with_empty_wallet_changes_nothing() {
        let svc = service();
        let alice = svc.register_customer("alice");
        let bob = svc.register_customer("bob");

        let err = svc
            .transfer(alice.id, bob.id, 10_000, "tr-1")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");

        assert_eq!(svc.committed_balance(alice.id).await.unwrap(), 0);
        assert_eq!(svc.committed_balance(bob.id).await.unwrap(), 0);
        assert_eq!(svc.journal.movement_count(), 0);
        assert_eq!(svc.journal.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_retryable_failure_releases_token() {
        use std::time::Duration;
        use walletd_ledger::BalanceKey;

        let mut config = ServiceConfig::default();
        config.ledger.lock_timeout = Duration::from_millis(50);
        let svc = WalletService::new(config);
        let alice = svc.register_customer("alice");
        let wallet = svc.directory.resolve_wallet(alice.id).unwrap();

        // Hold alice's committed row so the deposit times out on the lock.
        let held = svc
            .balances
            .locked_get(&BalanceKey::committed(wallet.id))
            .await
            .unwrap();
        let err = svc.deposit(alice.id, 1_000, "dep-1").await.unwrap_err();
        assert_eq!(err.error_code(), "COMMIT_FAILED");
        assert!(err.is_retryable());
        drop(held);

        // Resubmitting with the original token succeeds.
        svc.deposit(alice.id, 1_000, "dep-1").await.unwrap();
        assert_eq!(svc.committed_balance(alice.id).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_duplicate_token_is_rejected_once_applied() {
        let svc = service();
        let alice = svc.register_customer("alice");

        svc.deposit(alice.id, 5_000, "dep-1").await.unwrap();
        let err = svc.deposit(alice.id, 5_000, "dep-1").await.unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_REQUEST");

        // exactly one state change
        assert_eq!(svc.committed_balance(alice.id).await.unwrap(), 5_000);
        assert_eq!(svc.journal.movement_count(), 1);
    }

    #[tokio::test]
    async fn test_self_transfer_rejected_without_journal_writes() {
        let svc = service();
        let alice = svc.register_customer("alice");
        svc.deposit(alice.id, 5_000, "dep-1").await.unwrap();

        let err = svc
            .transfer(alice.id, alice.id, 1_000, "tr-1")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CANNOT_TRANSFER_TO_SELF");
        assert_eq!(svc.journal.movement_count(), 1); // only the deposit
    }

    #[tokio::test]
    async fn test_unknown_user_rejected_before_unit() {
        let svc = service();
        let err = svc.deposit(UserId::new(), 1_000, "dep-1").await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ACCOUNT");
        assert!(err.is_validation());
        assert_eq!(svc.journal.movement_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected() {
        let svc = service();
        let alice = svc.register_customer("alice");
        let err = svc.deposit(alice.id, 0, "dep-1").await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
    }

    #[tokio::test]
    async fn test_ledger_lines_viewpoints() {
        let svc = service();
        let alice = svc.register_customer("alice");
        let bob = svc.register_customer("bob");

        svc.deposit(alice.id, 10_000, "dep-1").await.unwrap();
        svc.withdraw(alice.id, 2_000, "wd-1").await.unwrap();
        svc.transfer(alice.id, bob.id, 3_000, "tr-1").await.unwrap();

        let alice_lines = svc.ledger_lines(alice.id).unwrap();
        assert_eq!(alice_lines.len(), 3);

        assert_eq!(alice_lines[0].kind, PaymentKind::Deposit);
        assert_eq!(alice_lines[0].amount, 10_000);
        assert_eq!(alice_lines[0].counterparty, OPERATOR_NAME);

        assert_eq!(alice_lines[1].kind, PaymentKind::Withdrawal);
        assert_eq!(alice_lines[1].amount, -2_000);

        assert_eq!(alice_lines[2].kind, PaymentKind::TransferOut);
        assert_eq!(alice_lines[2].amount, -3_000);
        assert_eq!(alice_lines[2].counterparty, "bob");

        let bob_lines = svc.ledger_lines(bob.id).unwrap();
        assert_eq!(bob_lines.len(), 1);
        assert_eq!(bob_lines[0].kind, PaymentKind::TransferIn);
        assert_eq!(bob_lines[0].amount, 3_000);
        assert_eq!(bob_lines[0].counterparty, "alice");
    }

    #[tokio::test]
    async fn test_transactions_balance_after_success() {
        let svc = service();
        let alice = svc.register_customer("alice");
        let bob = svc.register_customer("bob");

        svc.deposit(alice.id, 10_000, "dep-1").await.unwrap();
        let receipt = svc.transfer(alice.id, bob.id, 4_000, "tr-1").await.unwrap();

        for movement_id in receipt.movement_ids {
            let sum: i64 = svc
                .journal
                .transactions_for_movement(movement_id)
                .iter()
                .map(|t| t.amount)
                .sum();
            assert_eq!(sum, 0);
        }
    }

    #[tokio::test]
    async fn test_concurrent_operations_on_disjoint_users() {
        let svc = Arc::new(service());
        let users: Vec<_> = (0..6)
            .map(|i| svc.register_customer(format!("user-{i}")))
            .collect();

        let mut handles = Vec::new();
        for (i, user) in users.iter().enumerate() {
            let svc = Arc::clone(&svc);
            let user_id = user.id;
            handles.push(tokio::spawn(async move {
                svc.deposit(user_id, 1_000, &format!("dep-{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for user in &users {
            assert_eq!(svc.committed_balance(user.id).await.unwrap(), 1_000);
        }
        assert_eq!(svc.control_balance(svc.chart().asset).await.unwrap(), 6_000);
    }
}
