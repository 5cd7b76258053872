// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tesouro::application::{LedgerConfig, LedgerEngine, TransferKeyGenerator, UuidKeyGenerator};
use tesouro::domain::{Account, Cents, CreditRequest, DebitRequest, OpenAccountRequest, TransferKey};
use tesouro::storage::Database;

/// Config pointing at a fresh database file inside `dir`
pub fn test_config(dir: &TempDir) -> LedgerConfig {
    let db_path = dir.path().join("test.db");
    LedgerConfig::default()
        .with_database_url(format!("sqlite:{}", db_path.display()))
        .with_operation_timeout(Duration::from_secs(30))
}

/// Helper to create a test engine with a temporary database
pub async fn test_engine() -> Result<(LedgerEngine, TempDir)> {
    let temp_dir = TempDir::new()?;
    let engine = LedgerEngine::init(test_config(&temp_dir)).await?;
    Ok((engine, temp_dir))
}

/// Engine over a temporary database with a custom key generator
pub async fn test_engine_with_keys(
    keys: Arc<dyn TransferKeyGenerator>,
) -> Result<(LedgerEngine, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = test_config(&temp_dir);
    let db = Database::init(&config.database_url, config.pool_settings()).await?;
    Ok((LedgerEngine::new(db, config, keys), temp_dir))
}

/// A second engine over the same store with a different config
pub fn sibling_engine(engine: &LedgerEngine, config: LedgerConfig) -> LedgerEngine {
    LedgerEngine::new(engine.database().clone(), config, Arc::new(UuidKeyGenerator))
}

/// Open an account and give it a transfer key
pub async fn open_account(
    engine: &LedgerEngine,
    name: &str,
    credit_limit: Cents,
) -> Result<(Account, TransferKey)> {
    let account = engine
        .open_account(OpenAccountRequest::new(name, credit_limit)?)
        .await?;
    let key = engine.ensure_transfer_key(account.id).await?;
    Ok((account, key))
}

pub async fn deposit(engine: &LedgerEngine, account: &Account, amount: Cents) -> Result<Cents> {
    let receipt = engine
        .apply_credit(CreditRequest::new(account.id, amount, "deposit")?)
        .await?;
    Ok(receipt.new_balance)
}

pub fn debit(payor: &Account, amount: Cents, payee: &TransferKey) -> DebitRequest {
    DebitRequest::new(payor.id, amount, "transfer", payee.as_str()).unwrap()
}

pub async fn balance_of(engine: &LedgerEngine, account: &Account) -> Result<Cents> {
    Ok(engine.account(account.id).await?.balance)
}
