//! Operation planning.
//!
//! Translates a requested monetary operation into its journal rows and
//! balance deltas, respecting double-entry symmetry. Validation here runs
//! before the atomic unit opens, so a rejected plan leaves no trace.

use serde::{Deserialize, Serialize};

use walletd_common::{GroupId, Result, WalletError, WalletId};

use crate::balance::BalanceKey;
use crate::chart::ChartAccounts;
use crate::journal::{lines_balance, Movement, Transaction};

/// A requested monetary operation, already resolved to wallet ids with the
/// amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Deposit {
        wallet_id: WalletId,
        amount: i64,
    },
    Withdraw {
        wallet_id: WalletId,
        amount: i64,
    },
    Transfer {
        from_wallet_id: WalletId,
        to_wallet_id: WalletId,
        amount: i64,
    },
}

impl Operation {
    /// The requested amount.
    pub fn amount(&self) -> i64 {
        match self {
            Operation::Deposit { amount, .. } => *amount,
            Operation::Withdraw { amount, .. } => *amount,
            Operation::Transfer { amount, .. } => *amount,
        }
    }

    /// Operation kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Withdraw { .. } => "withdrawal",
            Operation::Transfer { .. } => "transfer",
        }
    }
}

/// One balance mutation implied by a plan's transactions.
#[derive(Debug, Clone, Copy)]
pub struct BalanceDelta {
    /// Row to mutate.
    pub key: BalanceKey,
    /// Signed amount to apply.
    pub delta: i64,
    /// Whether the row must not go negative (customer-owned wallets only).
    pub enforce_floor: bool,
}

/// The journal rows and balance deltas of one operation, ready for the
/// engine to execute as a single atomic unit.
#[derive(Debug, Clone)]
pub struct OperationPlan {
    pub movements: Vec<Movement>,
    pub transactions: Vec<Transaction>,
    pub deltas: Vec<BalanceDelta>,
    pub group_id: Option<GroupId>,
}

impl OperationPlan {
    /// Check the double-entry invariant: every movement's lines sum to zero.
    pub fn is_balanced(&self) -> bool {
        lines_balance(&self.movements, &self.transactions)
    }
}

/// Build the plan for an operation.
///
/// Rejects non-positive amounts and self-transfers before any journal row
/// is constructed. Reserved buckets are skipped throughout: no external
/// clearing step is modeled, so everything settles straight to COMMITTED.
pub fn plan(op: &Operation, chart: &ChartAccounts) -> Result<OperationPlan> {
    if op.amount() <= 0 {
        return Err(WalletError::InvalidAmount(op.amount()));
    }

    match *op {
        Operation::Deposit { wallet_id, amount } => Ok(plan_deposit(chart, wallet_id, amount)),
        Operation::Withdraw { wallet_id, amount } => Ok(plan_withdrawal(chart, wallet_id, amount)),
        Operation::Transfer {
            from_wallet_id,
            to_wallet_id,
            amount,
        } => {
            if from_wallet_id == to_wallet_id {
                return Err(WalletError::SelfTransferNotAllowed);
            }
            Ok(plan_transfer(chart, from_wallet_id, to_wallet_id, amount))
        }
    }
}

/// Deposit: the asset control wallet funds the customer wallet.
fn plan_deposit(chart: &ChartAccounts, wallet_id: WalletId, amount: i64) -> OperationPlan {
    let movement = Movement::completed(None, chart.asset, wallet_id, amount, amount);
    let transactions = vec![
        Transaction::committed(movement.id, chart.asset, amount),
        Transaction::committed(movement.id, wallet_id, -amount),
    ];
    let deltas = vec![
        credit(chart.asset, amount),
        credit(wallet_id, amount),
    ];
    OperationPlan {
        movements: vec![movement],
        transactions,
        deltas,
        group_id: None,
    }
}

/// Withdrawal: customer asset decreases, company liability increases.
fn plan_withdrawal(chart: &ChartAccounts, wallet_id: WalletId, amount: i64) -> OperationPlan {
    let group_id = GroupId::new();
    let movement = Movement::completed(Some(group_id), chart.liability, wallet_id, amount, -amount);
    let transactions = vec![
        Transaction::committed(movement.id, chart.liability, amount),
        Transaction::committed(movement.id, wallet_id, -amount),
    ];
    let deltas = vec![
        debit(chart, wallet_id, amount),
        credit(chart.liability, amount),
    ];
    OperationPlan {
        movements: vec![movement],
        transactions,
        deltas,
        group_id: Some(group_id),
    }
}

/// Transfer: two movements sharing a group id. The liability wallet takes
/// both offsetting sides, so its net delta is zero.
fn plan_transfer(
    chart: &ChartAccounts,
    from_wallet_id: WalletId,
    to_wallet_id: WalletId,
    amount: i64,
) -> OperationPlan {
    let group_id = GroupId::new();

    let out_leg = Movement::completed(
        Some(group_id),
        chart.liability,
        from_wallet_id,
        amount,
        -amount,
    );
    let in_leg = Movement::completed(
        Some(group_id),
        to_wallet_id,
        chart.liability,
        amount,
        -amount,
    );

    let transactions = vec![
        Transaction::committed(out_leg.id, chart.liability, amount),
        Transaction::committed(out_leg.id, from_wallet_id, -amount),
        Transaction::committed(in_leg.id, to_wallet_id, amount),
        Transaction::committed(in_leg.id, chart.liability, -amount),
    ];
    let deltas = vec![
        debit(chart, from_wallet_id, amount),
        credit(chart.liability, amount),
        credit(to_wallet_id, amount),
        debit(chart, chart.liability, amount),
    ];
    OperationPlan {
        movements: vec![out_leg, in_leg],
        transactions,
        deltas,
        group_id: Some(group_id),
    }
}

fn credit(wallet_id: WalletId, amount: i64) -> BalanceDelta {
    BalanceDelta {
        key: BalanceKey::committed(wallet_id),
        delta: amount,
        enforce_floor: false,
    }
}

fn debit(chart: &ChartAccounts, wallet_id: WalletId, amount: i64) -> BalanceDelta {
    BalanceDelta {
        key: BalanceKey::committed(wallet_id),
        delta: -amount,
        enforce_floor: !chart.is_control(wallet_id),
    }
}
