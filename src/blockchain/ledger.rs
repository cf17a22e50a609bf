use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::BTreeMap;

/// Errors that can occur when deriving a new snapshot from a transfer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Payer and payee are the same account: {0}")]
    SelfTransfer(String),

    #[error("Records of {0} do not exist")]
    UnknownAccount(String),

    #[error("Insufficient funds: {account} has {available}, needs {required}")]
    InsufficientFunds {
        account: String,
        available: i64,
        required: i64,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

/// An immutable mapping of account name to coin balance.
///
/// Each block owns its own snapshot. A transfer never mutates an existing
/// snapshot; it derives a fresh copy via [`LedgerSnapshot::apply_transfer`],
/// so balances recorded in historical blocks stay untouched. The map is a
/// `BTreeMap` so the canonical rendering fed into the block hash is stable
/// regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    accounts: BTreeMap<String, i64>,
}

impl LedgerSnapshot {
    /// Creates the initial snapshot with a single funded account.
    pub fn with_account(name: &str, amount: i64) -> Self {
        let mut accounts = BTreeMap::new();
        accounts.insert(name.to_string(), amount);
        LedgerSnapshot { accounts }
    }

    /// Gets an account's balance, or `None` if the account is unknown.
    pub fn balance(&self, name: &str) -> Option<i64> {
        self.accounts.get(name).copied()
    }

    /// Sums all balances. A transfer conserves this total.
    pub fn total_supply(&self) -> i64 {
        self.accounts.values().sum()
    }

    /// Iterates over `(account, balance)` pairs in name order.
    pub fn accounts(&self) -> impl Iterator<Item = (&str, i64)> {
        self.accounts.iter().map(|(name, &coins)| (name.as_str(), coins))
    }

    /// Derives a new snapshot in which `from` has paid `to` exactly `amount`
    /// coins. Paying a new account creates it.
    ///
    /// Business rules are checked here, before any block is mined: the payer
    /// must exist, must not be the payee, and must be able to afford the
    /// amount. `self` is left unmodified in every case.
    pub fn apply_transfer(&self, from: &str, to: &str, amount: i64) -> Result<Self, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        if from == to {
            return Err(LedgerError::SelfTransfer(from.to_string()));
        }

        let available = self
            .balance(from)
            .ok_or_else(|| LedgerError::UnknownAccount(from.to_string()))?;

        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.to_string(),
                available,
                required: amount,
            });
        }

        let mut accounts = self.accounts.clone();
        accounts.insert(from.to_string(), available - amount);
        *accounts.entry(to.to_string()).or_insert(0) += amount;

        Ok(LedgerSnapshot { accounts })
    }

    /// Renders the snapshot as canonical JSON for hashing.
    ///
    /// The rendering is part of the hash preimage: any change to it would
    /// invalidate every historical block hash.
    pub fn canonical_text(&self) -> String {
        // Serializing a BTreeMap<String, i64> cannot fail
        serde_json::to_string(&self.accounts).unwrap()
    }
}
