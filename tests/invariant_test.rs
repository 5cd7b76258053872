mod common;

use anyhow::Result;
use common::{debit, deposit, open_account, test_engine};
use tesouro::LedgerError;
use tesouro::application::ErrorKind;
use tesouro::storage::TransactionLog;

/// A store that drops the payor's credit limit as soon as the log entry lands
/// makes the balance write trip the CHECK constraint.
#[tokio::test]
async fn test_store_check_failure_is_an_invariant_violation() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (payor, _) = open_account(&engine, "Ana Ribeiro", 100).await?;
    let (payee, payee_key) = open_account(&engine, "Bruno Costa", 0).await?;
    deposit(&engine, &payee, 10).await?;
    let pool = engine.database().pool();

    sqlx::query(
        r#"
        CREATE TRIGGER shrink_limit_on_log AFTER INSERT ON transactions
        BEGIN
            UPDATE accounts SET credit_limit = 0 WHERE id = NEW.account_id;
        END
        "#,
    )
    .execute(pool)
    .await?;

    let payor_before = engine.account(payor.id).await?;
    let payee_before = engine.account(payee.id).await?;

    let err = engine
        .apply_debit(debit(&payor, 50, &payee_key))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvariantViolation(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.is_retryable());

    assert_eq!(engine.account(payor.id).await?, payor_before);
    assert_eq!(engine.account(payee.id).await?, payee_before);
    assert_eq!(TransactionLog::count_for_account(pool, payor.id).await?, 0);

    Ok(())
}

/// A store that silently alters negative balances is caught by the
/// read-back before commit.
#[tokio::test]
async fn test_mismatched_read_back_rolls_back() -> Result<()> {
    let (engine, _temp) = test_engine().await?;
    let (payor, _) = open_account(&engine, "Carla Dias", 100).await?;
    let (payee, payee_key) = open_account(&engine, "Davi Prado", 0).await?;
    let pool = engine.database().pool();

    sqlx::query(
        r#"
        CREATE TRIGGER skew_negative_balance AFTER UPDATE OF balance ON accounts
        WHEN NEW.balance < 0
        BEGIN
            UPDATE accounts SET balance = NEW.balance + 1 WHERE id = NEW.id;
        END
        "#,
    )
    .execute(pool)
    .await?;

    let err = engine
        .apply_debit(debit(&payor, 50, &payee_key))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvariantViolation(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.is_retryable());

    assert_eq!(engine.account(payor.id).await?.balance, 0);
    assert_eq!(engine.account(payee.id).await?.balance, 0);
    assert!(engine.statement(payor.id).await?.transactions.is_empty());

    Ok(())
}
