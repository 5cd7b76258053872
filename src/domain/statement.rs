use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents, Transaction, TransactionKind};

/// Current balance of an account plus its full transaction history,
/// read from one consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub account_id: AccountId,
    pub balance: Cents,
    pub credit_limit: Cents,
    /// Time of the last committed balance write
    pub as_of: DateTime<Utc>,
    /// Oldest first
    pub transactions: Vec<Transaction>,
}

impl Statement {
    pub fn total_by_kind(&self, kind: TransactionKind) -> Cents {
        self.transactions
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }

    pub fn available(&self) -> Cents {
        self.balance.saturating_add(self.credit_limit)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.transactions.last().map(|t| t.completed_at)
    }
}
