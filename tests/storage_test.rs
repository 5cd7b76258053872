mod common;

use anyhow::Result;
use chrono::Utc;
use common::{deposit, open_account, test_engine};
use tesouro::domain::{NewTransaction, OpenAccountRequest, TransferKey};
use tesouro::storage::{
    is_check_violation, is_unique_violation, timestamp_now, AccountStore, TransactionLog,
};

#[tokio::test]
async fn test_store_rejects_balance_below_limit() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (account, _) = open_account(&engine, "Ana Ribeiro", 100).await?;
    let pool = engine.database().pool();

    AccountStore::set_balance(pool, account.id, -100, Utc::now()).await?;
    let err = AccountStore::set_balance(pool, account.id, -101, Utc::now())
        .await
        .unwrap_err();

    assert!(is_check_violation(&err));
    assert!(!is_unique_violation(&err));
    assert_eq!(engine.account(account.id).await?.balance, -100);

    Ok(())
}

#[tokio::test]
async fn test_store_rejects_duplicate_transfer_key() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let pool = engine.database().pool();
    let a = AccountStore::create(pool, &OpenAccountRequest::new("Ana Ribeiro", 0)?).await?;
    let b = AccountStore::create(pool, &OpenAccountRequest::new("Bruno Costa", 0)?).await?;
    let key = TransferKey::new("shared");

    assert!(AccountStore::assign_transfer_key(pool, a.id, &key).await?);
    let err = AccountStore::assign_transfer_key(pool, b.id, &key)
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));

    // A second key never replaces the first.
    assert!(!AccountStore::assign_transfer_key(pool, a.id, &TransferKey::new("other")).await?);
    let found = AccountStore::find_by_transfer_key(pool, &key).await?;
    assert_eq!(found.map(|account| account.id), Some(a.id));

    Ok(())
}

#[tokio::test]
async fn test_transaction_log_is_append_only() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (account, _) = open_account(&engine, "Carla Dias", 0).await?;
    deposit(&engine, &account, 75).await?;
    let pool = engine.database().pool();

    let update = sqlx::query("UPDATE transactions SET amount = 1 WHERE account_id = ?")
        .bind(account.id)
        .execute(pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM transactions WHERE account_id = ?")
        .bind(account.id)
        .execute(pool)
        .await;
    assert!(delete.is_err());

    let entries = TransactionLog::list_for_account(pool, account.id).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, 75);

    Ok(())
}

#[tokio::test]
async fn test_appended_entry_reads_back_identically() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (account, _) = open_account(&engine, "Davi Prado", 0).await?;
    let pool = engine.database().pool();

    let appended = TransactionLog::append(
        pool,
        NewTransaction::credit(account.id, 1234, "refund".to_string(), timestamp_now()),
    )
    .await?;

    let entries = TransactionLog::list_for_account(pool, account.id).await?;
    assert_eq!(entries, vec![appended]);
    assert_eq!(TransactionLog::count_for_account(pool, account.id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_claim_reports_missing_rows() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (account, _) = open_account(&engine, "Elisa Reis", 0).await?;

    let mut tx = engine.database().begin().await?;
    assert!(AccountStore::claim(&mut *tx, account.id).await?);
    assert!(!AccountStore::claim(&mut *tx, account.id + 1000).await?);
    tx.rollback().await?;

    Ok(())
}

#[tokio::test]
async fn test_migrations_can_run_twice() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (account, _) = open_account(&engine, "Fabio Silva", 0).await?;

    engine.database().migrate().await?;

    assert_eq!(engine.account(account.id).await?.full_name, "Fabio Silva");
    Ok(())
}
