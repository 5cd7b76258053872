use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    check_account_id, within_limit, Account, AccountId, Cents, CreditRequest, DebitRequest,
    NewTransaction, OpenAccountRequest, Statement, Transaction, TransferKey, ValidationError,
};
use crate::storage::{
    is_check_violation, is_unique_violation, timestamp_now, AccountStore, Database,
    TransactionLog,
};

use super::{LedgerConfig, LedgerError, TransferKeyGenerator, UuidKeyGenerator};

/// Result of a committed deposit.
#[derive(Debug, Clone)]
pub struct CreditReceipt {
    pub transaction: Transaction,
    pub new_balance: Cents,
    pub completed_at: DateTime<Utc>,
}

/// Result of a committed transfer.
#[derive(Debug, Clone)]
pub struct DebitReceipt {
    /// The entry logged against the payor
    pub transaction: Transaction,
    /// Payor balance after the transfer
    pub new_balance: Cents,
    pub payee_id: AccountId,
    pub payee_name: String,
    pub completed_at: DateTime<Utc>,
}

/// The only writer of balances and log entries.
///
/// Each operation is one atomic unit: it either commits every write it made
/// or none of them. A unit holds the row locks of the accounts it touches
/// from before its first read until it commits or rolls back; units on
/// disjoint accounts don't wait on each other's locks. Cloning is cheap and
/// shares the pool and the locks.
#[derive(Clone)]
pub struct LedgerEngine {
    db: Database,
    config: Arc<LedgerConfig>,
    keys: Arc<dyn TransferKeyGenerator>,
}

impl LedgerEngine {
    pub fn new(db: Database, config: LedgerConfig, keys: Arc<dyn TransferKeyGenerator>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            keys,
        }
    }

    /// Connect, run migrations and build an engine with random transfer keys.
    pub async fn init(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let db = Database::init(&config.database_url, config.pool_settings()).await?;
        Ok(Self::new(db, config, Arc::new(UuidKeyGenerator)))
    }

    /// Connect to an existing, already migrated store.
    pub async fn connect(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let db = Database::connect(&config.database_url, config.pool_settings()).await?;
        Ok(Self::new(db, config, Arc::new(UuidKeyGenerator)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================
    // Account lookups
    // ========================

    /// Open an account with a zero balance and no transfer key.
    pub async fn open_account(&self, request: OpenAccountRequest) -> Result<Account, LedgerError> {
        let account = AccountStore::create(self.db.pool(), &request).await?;
        info!(account_id = account.id, credit_limit = account.credit_limit, "Account opened");
        Ok(account)
    }

    pub async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        check_account_id(id)?;
        AccountStore::find_by_id(self.db.pool(), id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub async fn account_by_transfer_key(&self, key: &TransferKey) -> Result<Account, LedgerError> {
        AccountStore::find_by_transfer_key(self.db.pool(), key)
            .await?
            .ok_or_else(|| LedgerError::CounterpartyNotFound(key.to_string()))
    }

    /// Names are not unique; this is for discovery, never for addressing.
    pub async fn search_accounts(&self, fragment: &str) -> Result<Vec<Account>, LedgerError> {
        Ok(AccountStore::search_by_name(self.db.pool(), fragment).await?)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Deposit into an account.
    #[instrument(skip(self, request), fields(account_id = request.account_id, amount = request.amount))]
    pub async fn apply_credit(&self, request: CreditRequest) -> Result<CreditReceipt, LedgerError> {
        self.bounded(self.credit_unit(request)).await
    }

    /// Move money from the payor to the account behind the payee transfer key.
    #[instrument(skip(self, request), fields(payor_id = request.payor_id, amount = request.amount))]
    pub async fn apply_debit(&self, request: DebitRequest) -> Result<DebitReceipt, LedgerError> {
        self.bounded(self.debit_unit(request)).await
    }

    /// Balance, limit and full history from one snapshot.
    #[instrument(skip(self))]
    pub async fn statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        check_account_id(account_id)?;
        self.bounded(self.statement_unit(account_id)).await
    }

    /// Return the account's transfer key, assigning one first if it has none.
    /// An existing key is returned unchanged.
    #[instrument(skip(self))]
    pub async fn ensure_transfer_key(&self, account_id: AccountId) -> Result<TransferKey, LedgerError> {
        check_account_id(account_id)?;
        self.bounded(self.transfer_key_unit(account_id)).await
    }

    /// Run `op` under a caller-supplied deadline. When it elapses the unit is
    /// dropped mid-flight, which rolls it back.
    pub async fn with_deadline<T, F>(&self, deadline: Instant, op: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        match tokio::time::timeout_at(deadline, op).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Caller deadline elapsed, unit rolled back");
                Err(LedgerError::DeadlineExceeded)
            }
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.operation_timeout.as_millis() as u64,
                    "Operation timed out, unit rolled back"
                );
                Err(LedgerError::DeadlineExceeded)
            }
        }
    }

    async fn credit_unit(&self, request: CreditRequest) -> Result<CreditReceipt, LedgerError> {
        let account_id = request.account_id;
        let _rows = self.db.row_locks().lock(&[account_id]).await;
        let mut tx = self.db.begin().await?;

        if !AccountStore::claim(&mut *tx, account_id).await? {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        debug!(account_id, "Claimed account row");

        let account = AccountStore::find_by_id(&mut *tx, account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let new_balance = account
            .balance
            .checked_add(request.amount)
            .ok_or(ValidationError::Overflow)?;

        let completed_at = timestamp_now();
        let transaction = TransactionLog::append(
            &mut *tx,
            NewTransaction::credit(account_id, request.amount, request.description, completed_at),
        )
        .await?;
        write_balance(&mut tx, account_id, new_balance, completed_at).await?;

        tx.commit().await.context("Failed to commit credit")?;

        info!(
            account_id,
            transaction_id = transaction.id,
            new_balance,
            "Credit committed"
        );

        Ok(CreditReceipt {
            transaction,
            new_balance,
            completed_at,
        })
    }

    async fn debit_unit(&self, request: DebitRequest) -> Result<DebitReceipt, LedgerError> {
        let payor_id = request.payor_id;

        // Keys never change once assigned, so this mapping is stable outside the unit.
        let payee_id = AccountStore::find_by_transfer_key(self.db.pool(), &request.payee_key)
            .await?
            .map(|account| account.id);

        let order = lock_order(payor_id, payee_id);
        let _rows = self.db.row_locks().lock(&order).await;
        let mut tx = self.db.begin().await?;

        for id in order {
            let claimed = AccountStore::claim(&mut *tx, id).await?;
            if !claimed && id == payor_id {
                return Err(LedgerError::AccountNotFound(payor_id));
            }
            debug!(account_id = id, "Claimed account row");
        }

        let payor = AccountStore::find_by_id(&mut *tx, payor_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(payor_id))?;

        let candidate_balance = payor
            .balance
            .checked_sub(request.amount)
            .ok_or(ValidationError::Overflow)?;

        // The limit check wins over every counterparty problem.
        if !within_limit(candidate_balance, payor.credit_limit) {
            warn!(
                payor_id,
                balance = payor.balance,
                credit_limit = payor.credit_limit,
                "Debit rejected: credit limit exceeded"
            );
            return Err(LedgerError::LimitExceeded {
                account_id: payor_id,
                balance: payor.balance,
                credit_limit: payor.credit_limit,
                requested: request.amount,
            });
        }

        let payee = match payee_id {
            Some(id) => AccountStore::find_by_id(&mut *tx, id).await?,
            None => None,
        };
        let Some(payee) = payee else {
            warn!(payor_id, "Debit rejected: unknown transfer key");
            return Err(LedgerError::CounterpartyNotFound(request.payee_key.into_inner()));
        };
        if payee.id == payor.id {
            return Err(LedgerError::SelfTransfer(payor_id));
        }

        let payee_balance = payee
            .balance
            .checked_add(request.amount)
            .ok_or(ValidationError::Overflow)?;

        let completed_at = timestamp_now();
        let transaction = TransactionLog::append(
            &mut *tx,
            NewTransaction::debit(
                payor.id,
                request.amount,
                request.description,
                payee.full_name.clone(),
                completed_at,
            ),
        )
        .await?;
        write_balance(&mut tx, payor.id, candidate_balance, completed_at).await?;
        write_balance(&mut tx, payee.id, payee_balance, completed_at).await?;

        verify_written(&mut tx, payor.id, candidate_balance).await?;

        tx.commit().await.context("Failed to commit debit")?;

        info!(
            payor_id,
            payee_id = payee.id,
            transaction_id = transaction.id,
            new_balance = candidate_balance,
            "Debit committed"
        );

        Ok(DebitReceipt {
            transaction,
            new_balance: candidate_balance,
            payee_id: payee.id,
            payee_name: payee.full_name,
            completed_at,
        })
    }

    async fn statement_unit(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        let mut tx = self.db.begin().await?;

        let account = AccountStore::find_by_id(&mut *tx, account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let transactions = TransactionLog::list_for_account(&mut *tx, account_id).await?;

        tx.commit().await.context("Failed to close statement read")?;

        Ok(Statement {
            account_id,
            balance: account.balance,
            credit_limit: account.credit_limit,
            as_of: account.updated_at,
            transactions,
        })
    }

    async fn transfer_key_unit(&self, account_id: AccountId) -> Result<TransferKey, LedgerError> {
        let _rows = self.db.row_locks().lock(&[account_id]).await;
        let mut tx = self.db.begin().await?;

        if !AccountStore::claim(&mut *tx, account_id).await? {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        let account = AccountStore::find_by_id(&mut *tx, account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        if let Some(existing) = account.transfer_key {
            tx.commit().await.context("Failed to release account row")?;
            return Ok(existing);
        }

        let attempts = self.config.key_generation_attempts;
        for attempt in 1..=attempts {
            let candidate = self.keys.generate();
            match AccountStore::assign_transfer_key(&mut *tx, account_id, &candidate).await {
                Ok(true) => {
                    tx.commit().await.context("Failed to commit transfer key")?;
                    info!(account_id, attempt, "Transfer key assigned");
                    return Ok(candidate);
                }
                Ok(false) => {
                    error!(account_id, "Transfer key appeared while the row was claimed");
                    return Err(LedgerError::InvariantViolation(format!(
                        "transfer key of account {account_id} changed under lock"
                    )));
                }
                Err(err) if is_unique_violation(&err) => {
                    debug!(account_id, attempt, "Transfer key collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LedgerError::Persistence(anyhow::anyhow!(
            "no unique transfer key after {attempts} attempts"
        )))
    }
}

/// Rows are always locked and claimed lowest id first, so two transfers
/// between the same pair of accounts can never wait on each other.
fn lock_order(payor_id: AccountId, payee_id: Option<AccountId>) -> Vec<AccountId> {
    let mut ids = vec![payor_id];
    if let Some(payee_id) = payee_id {
        ids.push(payee_id);
    }
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn write_balance(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    balance: Cents,
    at: DateTime<Utc>,
) -> Result<(), LedgerError> {
    AccountStore::set_balance(&mut *conn, account_id, balance, at)
        .await
        .map_err(|err| {
            if is_check_violation(&err) {
                error!(account_id, balance, "Store rejected balance below credit limit");
                LedgerError::InvariantViolation(format!(
                    "balance {balance} of account {account_id} is below its credit limit"
                ))
            } else {
                LedgerError::Persistence(err)
            }
        })
}

/// Read the payor back before commit; anything but the balance we wrote,
/// within its limit, is a defect.
async fn verify_written(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    expected: Cents,
) -> Result<(), LedgerError> {
    let account = AccountStore::find_by_id(&mut *conn, account_id).await?;
    match account {
        Some(account) if account.balance == expected && account.is_within_limit() => Ok(()),
        Some(account) => {
            error!(
                account_id,
                expected,
                found = account.balance,
                credit_limit = account.credit_limit,
                "Balance read back does not match the committed write"
            );
            Err(LedgerError::InvariantViolation(format!(
                "account {account_id} holds {} after writing {expected}",
                account.balance
            )))
        }
        None => Err(LedgerError::InvariantViolation(format!(
            "account {account_id} vanished inside its own unit"
        ))),
    }
}
