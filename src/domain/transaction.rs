use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

/// Monotonic, store-assigned log identifier.
pub type TransactionId = i64;

/// Counterparty recorded on deposits that have no other party.
pub const SELF_COUNTERPARTY: &str = "self";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money left the account (outgoing transfer)
    Debit,
    /// Money entered the account (deposit)
    Credit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "debit",
            TransactionKind::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(TransactionKind::Debit),
            "credit" => Some(TransactionKind::Credit),
            _ => None,
        }
    }

    /// Sign applied to `amount` when replaying this entry onto the owner's balance.
    pub fn signed(&self, amount: Cents) -> Cents {
        match self {
            TransactionKind::Debit => -amount,
            TransactionKind::Credit => amount,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed log entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Account whose balance this entry affected
    pub account_id: AccountId,
    /// Always positive
    pub amount: Cents,
    pub kind: TransactionKind,
    pub description: String,
    /// Display name of the other party, `"self"` for deposits
    pub counterparty: String,
    pub completed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_deposit(&self) -> bool {
        self.kind == TransactionKind::Credit && self.counterparty == SELF_COUNTERPARTY
    }
}

/// A log entry that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Cents,
    pub kind: TransactionKind,
    pub description: String,
    pub counterparty: String,
    pub completed_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn credit(
        account_id: AccountId,
        amount: Cents,
        description: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            amount,
            kind: TransactionKind::Credit,
            description: description.into(),
            counterparty: SELF_COUNTERPARTY.to_string(),
            completed_at,
        }
    }

    pub fn debit(
        account_id: AccountId,
        amount: Cents,
        description: impl Into<String>,
        payee_name: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            amount,
            kind: TransactionKind::Debit,
            description: description.into(),
            counterparty: payee_name.into(),
            completed_at,
        }
    }

    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            amount: self.amount,
            kind: self.kind,
            description: self.description,
            counterparty: self.counterparty,
            completed_at: self.completed_at,
        }
    }
}
