use thiserror::Error;

use crate::domain::{AccountId, Cents, ValidationError};

use super::ConfigError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("No account for transfer key {0}")]
    CounterpartyNotFound(String),

    #[error("Account {0} cannot transfer to itself")]
    SelfTransfer(AccountId),

    #[error(
        "Credit limit exceeded on account {account_id}: balance {balance}, limit {credit_limit}, requested {requested}"
    )]
    LimitExceeded {
        account_id: AccountId,
        balance: Cents,
        credit_limit: Cents,
        requested: Cents,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    /// The store failed; detail is in the source chain, not the message.
    #[error("Persistence failure")]
    Persistence(#[from] anyhow::Error),

    /// The store accepted a state that breaks a ledger invariant. A defect,
    /// never a business outcome.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller mistake caught before the store was touched
    Validation,
    NotFound,
    LimitExceeded,
    /// Any other business-rule rejection found inside the unit
    Rejected,
    /// The engine was set up wrong; fix the environment, not the request
    Config,
    Transient,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_) | LedgerError::CounterpartyNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            LedgerError::SelfTransfer(_) => ErrorKind::Rejected,
            LedgerError::Config(_) => ErrorKind::Config,
            LedgerError::DeadlineExceeded | LedgerError::Persistence(_) => ErrorKind::Transient,
            LedgerError::InvariantViolation(_) | LedgerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the whole operation may succeed. The engine itself
    /// never retries.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
