//! Chart of internal control wallets.

use serde::{Deserialize, Serialize};

use walletd_common::WalletId;

/// The two fixed internal control wallets every operation routes through:
/// the asset wallet is the counterparty for deposits, the liability wallet
/// for withdrawals and transfers. They are not customer-owned and may hold
/// negative committed balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartAccounts {
    pub asset: WalletId,
    pub liability: WalletId,
}

impl ChartAccounts {
    /// The standard hardcoded chart accounts.
    pub const fn standard() -> Self {
        Self {
            asset: WalletId::from_u128(0x338b3f97_e428_4bff_9775_f759b5fccc4d),
            liability: WalletId::from_u128(0x141e3fd8_c350_4b44_a2d5_2e2602aca72a),
        }
    }

    /// Check whether a wallet is one of the control wallets.
    pub fn is_control(&self, wallet_id: WalletId) -> bool {
        wallet_id == self.asset || wallet_id == self.liability
    }
}

impl Default for ChartAccounts {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_chart() {
        let chart = ChartAccounts::standard();
        assert_ne!(chart.asset, chart.liability);
        assert!(chart.is_control(chart.asset));
        assert!(chart.is_control(chart.liability));
        assert!(!chart.is_control(WalletId::new()));
    }
}
