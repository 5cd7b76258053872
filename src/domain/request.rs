use thiserror::Error;

use super::{AccountId, Cents, TransferKey};

/// Longest description accepted on a ledger operation.
pub const MAX_DESCRIPTION_LEN: usize = 10;

/// Caller mistakes caught before the store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Cents),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(AccountId),

    #[error("Description must be 1 to {MAX_DESCRIPTION_LEN} characters")]
    InvalidDescription,

    #[error("Transfer key must not be empty")]
    EmptyTransferKey,

    #[error("Account name must not be empty")]
    EmptyName,

    #[error("Credit limit must not be negative, got {0}")]
    NegativeCreditLimit(Cents),

    #[error("Amount would overflow the balance")]
    Overflow,
}

/// Reject identifiers the store can never have assigned.
pub fn check_account_id(id: AccountId) -> Result<AccountId, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidAccountId(id));
    }
    Ok(id)
}

fn check_amount(amount: Cents) -> Result<Cents, ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

fn check_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::InvalidDescription);
    }
    Ok(trimmed.to_string())
}

/// A validated deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRequest {
    pub account_id: AccountId,
    pub amount: Cents,
    pub description: String,
}

impl CreditRequest {
    pub fn new(
        account_id: AccountId,
        amount: Cents,
        description: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            account_id: check_account_id(account_id)?,
            amount: check_amount(amount)?,
            description: check_description(description)?,
        })
    }
}

/// A validated transfer out of `payor_id` into the account behind `payee_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitRequest {
    pub payor_id: AccountId,
    pub amount: Cents,
    pub description: String,
    pub payee_key: TransferKey,
}

impl DebitRequest {
    pub fn new(
        payor_id: AccountId,
        amount: Cents,
        description: &str,
        payee_key: &str,
    ) -> Result<Self, ValidationError> {
        let payee_key = payee_key.trim();
        if payee_key.is_empty() {
            return Err(ValidationError::EmptyTransferKey);
        }

        Ok(Self {
            payor_id: check_account_id(payor_id)?,
            amount: check_amount(amount)?,
            description: check_description(description)?,
            payee_key: TransferKey::new(payee_key),
        })
    }
}

/// A validated request to open an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAccountRequest {
    pub full_name: String,
    pub credit_limit: Cents,
    pub password_hash: Option<String>,
}

impl OpenAccountRequest {
    pub fn new(full_name: &str, credit_limit: Cents) -> Result<Self, ValidationError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if credit_limit < 0 {
            return Err(ValidationError::NegativeCreditLimit(credit_limit));
        }

        Ok(Self {
            full_name: full_name.to_string(),
            credit_limit,
            password_hash: None,
        })
    }

    /// Credentials are checked by the session layer; the ledger only stores the hash.
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }
}
