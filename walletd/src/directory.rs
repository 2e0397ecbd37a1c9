//! Customer directory: user → account → wallet resolution.
//!
//! Read-only from the ledger engine's perspective; lookups surface explicit
//! not-found errors to the caller instead of faulting.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use walletd_common::{now, AccountId, Result, Timestamp, UserId, WalletError, WalletId};

/// Display name used for the operator's internal control wallets.
pub const OPERATOR_NAME: &str = "WALLET OPERATOR";

/// An application user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub created_at: Timestamp,
}

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// A customer's spending account.
    Customer,
    /// An internal control account (asset/liability).
    Chart,
}

/// An account owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub account_type: AccountType,
    pub created_at: Timestamp,
}

/// Wallet status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletStatus {
    Active,
    Frozen,
    Closed,
}

/// A wallet attached to an account. Immutable after creation except status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub account_id: AccountId,
    pub currency: String,
    pub status: WalletStatus,
    pub created_at: Timestamp,
}

/// In-memory directory of users, accounts, and wallets.
pub struct Directory {
    users: DashMap<UserId, User>,
    accounts_by_user: DashMap<UserId, Account>,
    wallets_by_account: DashMap<AccountId, Wallet>,
    owner_names: DashMap<WalletId, String>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            accounts_by_user: DashMap::new(),
            wallets_by_account: DashMap::new(),
            owner_names: DashMap::new(),
        }
    }

    /// Register a user with one account and one wallet.
    pub fn register_user(&self, name: impl Into<String>, currency: impl Into<String>) -> User {
        let ts = now();
        let user = User {
            id: UserId::new(),
            name: name.into(),
            created_at: ts,
        };
        let account = Account {
            id: AccountId::new(),
            user_id: user.id,
            account_type: AccountType::Customer,
            created_at: ts,
        };
        let wallet = Wallet {
            id: WalletId::new(),
            account_id: account.id,
            currency: currency.into(),
            status: WalletStatus::Active,
            created_at: ts,
        };

        self.owner_names.insert(wallet.id, user.name.clone());
        self.users.insert(user.id, user.clone());
        self.accounts_by_user.insert(user.id, account.clone());
        self.wallets_by_account.insert(account.id, wallet);
        user
    }

    /// Register a control wallet under the operator label so history can
    /// name it. Control wallets have no user or account.
    pub fn register_control_wallet(&self, wallet_id: WalletId) {
        self.owner_names.insert(wallet_id, OPERATOR_NAME.to_string());
    }

    /// Look up a user.
    pub fn get_user(&self, user_id: UserId) -> Result<User> {
        self.users
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or(WalletError::UserNotFound(user_id))
    }

    /// Look up a user's account.
    pub fn get_account(&self, user_id: UserId) -> Result<Account> {
        self.accounts_by_user
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or(WalletError::AccountNotFound(user_id))
    }

    /// Look up an account's wallet.
    pub fn get_wallet(&self, account: &Account) -> Result<Wallet> {
        self.wallets_by_account
            .get(&account.id)
            .map(|entry| entry.value().clone())
            .ok_or(WalletError::WalletNotFoundForAccount(account.id))
    }

    /// Resolve a user id to their wallet, chaining user → account → wallet.
    pub fn resolve_wallet(&self, user_id: UserId) -> Result<Wallet> {
        let user = self.get_user(user_id)?;
        let account = self.get_account(user.id)?;
        self.get_wallet(&account)
    }

    /// Display name of a wallet's owner, if known.
    pub fn owner_name(&self, wallet_id: WalletId) -> Option<String> {
        self.owner_names
            .get(&wallet_id)
            .map(|entry| entry.value().clone())
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
