//! Payment-history read path.
//!
//! Ledger lines are derived straight from the journal rather than kept in a
//! separate table: movements touching the wallet are classified by which
//! control wallet sits on the other side, and transfer legs pair up via
//! their shared group id. Amounts are signed from the requesting wallet's
//! viewpoint.

use serde::{Deserialize, Serialize};

use walletd_common::{Timestamp, WalletId};
use walletd_ledger::{ChartAccounts, JournalStore, Movement};

use crate::directory::Directory;

/// Kind of payment from the requesting wallet's viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
}

/// One history entry: who the money moved against, what kind of movement,
/// and the viewpoint-signed amount in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLine {
    pub counterparty: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub created_at: Timestamp,
}

/// Derive the ledger lines of one wallet, oldest first.
pub fn ledger_lines(
    journal: &JournalStore,
    directory: &Directory,
    chart: &ChartAccounts,
    wallet_id: WalletId,
) -> Vec<LedgerLine> {
    let mut lines: Vec<LedgerLine> = journal
        .movements_for_wallet(wallet_id)
        .iter()
        .filter_map(|movement| classify(journal, directory, chart, wallet_id, movement))
        .collect();
    lines.sort_by_key(|line| line.created_at);
    lines
}

fn classify(
    journal: &JournalStore,
    directory: &Directory,
    chart: &ChartAccounts,
    wallet_id: WalletId,
    movement: &Movement,
) -> Option<LedgerLine> {
    let amount = movement.debit_amount;

    if movement.credit_wallet_id == wallet_id && movement.debit_wallet_id == chart.asset {
        // Asset control wallet funding the customer: a deposit.
        return Some(line(directory, chart.asset, PaymentKind::Deposit, amount, movement));
    }

    if movement.credit_wallet_id == wallet_id && movement.debit_wallet_id == chart.liability {
        // Outbound leg: a lone movement in its group is a withdrawal, a
        // paired one is the out side of a transfer.
        return match group_partner(journal, movement) {
            Some(partner) => Some(line(
                directory,
                partner.debit_wallet_id,
                PaymentKind::TransferOut,
                -amount,
                movement,
            )),
            None => Some(line(
                directory,
                chart.liability,
                PaymentKind::Withdrawal,
                -amount,
                movement,
            )),
        };
    }

    if movement.debit_wallet_id == wallet_id && movement.credit_wallet_id == chart.liability {
        // Inbound transfer leg; the partner's credit side is the payer.
        let partner = group_partner(journal, movement)?;
        return Some(line(
            directory,
            partner.credit_wallet_id,
            PaymentKind::TransferIn,
            amount,
            movement,
        ));
    }

    None
}

fn group_partner(journal: &JournalStore, movement: &Movement) -> Option<Movement> {
    let group_id = movement.group_id?;
    journal
        .movements_in_group(group_id)
        .into_iter()
        .find(|m| m.id != movement.id)
}

fn line(
    directory: &Directory,
    counterparty_wallet: WalletId,
    kind: PaymentKind,
    amount: i64,
    movement: &Movement,
) -> LedgerLine {
    LedgerLine {
        counterparty: directory
            .owner_name(counterparty_wallet)
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        kind,
        amount,
        created_at: movement.created_at,
    }
}
