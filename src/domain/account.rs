use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Store-assigned account identifier.
pub type AccountId = i64;

/// Opaque address used to route incoming transfers to an account.
/// Assigned once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferKey(String);

impl TransferKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for TransferKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Display name. Not unique, never used as an address.
    pub full_name: String,
    /// May go negative down to `-credit_limit`.
    pub balance: Cents,
    pub credit_limit: Cents,
    pub transfer_key: Option<TransferKey>,
    pub created_at: DateTime<Utc>,
    /// Last time the balance was written
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Lowest balance this account may reach.
    pub fn floor(&self) -> Cents {
        -self.credit_limit
    }

    /// How much can still be debited before the limit is hit.
    pub fn available(&self) -> Cents {
        self.balance.saturating_add(self.credit_limit)
    }

    pub fn is_within_limit(&self) -> bool {
        within_limit(self.balance, self.credit_limit)
    }
}

/// The binding balance rule: `balance >= -credit_limit`.
pub fn within_limit(balance: Cents, credit_limit: Cents) -> bool {
    match balance.checked_add(credit_limit) {
        Some(headroom) => headroom >= 0,
        None => balance >= 0,
    }
}
