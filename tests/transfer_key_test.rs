mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use common::{debit, deposit, open_account, test_engine, test_engine_with_keys};
use tesouro::LedgerError;
use tesouro::application::TransferKeyGenerator;
use tesouro::domain::{OpenAccountRequest, TransferKey};

/// Hands out a fixed sequence of keys, then repeats the last one.
struct ScriptedKeys {
    queue: Mutex<VecDeque<&'static str>>,
    last: &'static str,
}

impl ScriptedKeys {
    fn new(keys: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(keys.iter().copied().collect()),
            last: keys[keys.len() - 1],
        })
    }
}

impl TransferKeyGenerator for ScriptedKeys {
    fn generate(&self) -> TransferKey {
        let next = self.queue.lock().unwrap().pop_front();
        TransferKey::new(next.unwrap_or(self.last))
    }
}

#[tokio::test]
async fn test_existing_key_is_returned_unchanged() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let account = engine
        .open_account(OpenAccountRequest::new("Ana Ribeiro", 0)?)
        .await?;
    assert!(account.transfer_key.is_none());

    let first = engine.ensure_transfer_key(account.id).await?;
    let second = engine.ensure_transfer_key(account.id).await?;

    assert_eq!(first, second);
    assert_eq!(engine.account(account.id).await?.transfer_key, Some(first.clone()));
    assert_eq!(engine.account_by_transfer_key(&first).await?.id, account.id);

    Ok(())
}

#[tokio::test]
async fn test_colliding_key_is_retried() -> Result<()> {
    let (engine, _temp) = test_engine_with_keys(ScriptedKeys::new(&["k-1", "k-1", "k-2"])).await?;
    let (first, first_key) = open_account(&engine, "Ana Ribeiro", 0).await?;
    assert_eq!(first_key.as_str(), "k-1");

    let (second, second_key) = open_account(&engine, "Bruno Costa", 0).await?;
    assert_eq!(second_key.as_str(), "k-2");
    assert_ne!(first.id, second.id);

    // The new key routes transfers to the right account.
    deposit(&engine, &first, 100).await?;
    let receipt = engine.apply_debit(debit(&first, 40, &second_key)).await?;
    assert_eq!(receipt.payee_id, second.id);

    Ok(())
}

#[tokio::test]
async fn test_key_generation_gives_up_after_attempts() -> Result<()> {
    let (engine, _temp) = test_engine_with_keys(ScriptedKeys::new(&["dup"])).await?;
    open_account(&engine, "Ana Ribeiro", 0).await?;
    let other = engine
        .open_account(OpenAccountRequest::new("Bruno Costa", 0)?)
        .await?;

    let result = engine.ensure_transfer_key(other.id).await;

    match result {
        Err(err @ LedgerError::Persistence(_)) => assert!(err.is_retryable()),
        other => panic!("expected Persistence, got {other:?}"),
    }
    assert!(engine.account(other.id).await?.transfer_key.is_none());

    Ok(())
}

#[tokio::test]
async fn test_key_for_unknown_account() -> Result<()> {
    let (engine, _temp) = test_engine().await?;

    let result = engine.ensure_transfer_key(42).await;

    assert!(matches!(result, Err(LedgerError::AccountNotFound(42))));
    Ok(())
}

#[tokio::test]
async fn test_unknown_key_lookup() -> Result<()> {
    let (engine, _temp) = test_engine().await?;

    let result = engine
        .account_by_transfer_key(&TransferKey::new("nobody"))
        .await;

    assert!(matches!(result, Err(LedgerError::CounterpartyNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_same_name_accounts_get_distinct_keys() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (a, a_key) = open_account(&engine, "Maria Souza", 0).await?;
    let (b, b_key) = open_account(&engine, "Maria Souza", 0).await?;

    assert_ne!(a.id, b.id);
    assert_ne!(a_key, b_key);
    assert_eq!(engine.search_accounts("Maria Souza").await?.len(), 2);

    Ok(())
}
