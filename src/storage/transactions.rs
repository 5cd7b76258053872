use anyhow::{Context, Result};
use sqlx::{Row, SqliteExecutor};

use crate::domain::{AccountId, NewTransaction, Transaction, TransactionKind};

use super::{format_timestamp, parse_timestamp};

/// Adapter over the append-only `transactions` table.
pub struct TransactionLog;

impl TransactionLog {
    /// Append an entry; the store assigns the id.
    pub async fn append<'e>(
        executor: impl SqliteExecutor<'e>,
        entry: NewTransaction,
    ) -> Result<Transaction> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, kind, description, counterparty, completed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.account_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(&entry.description)
        .bind(&entry.counterparty)
        .bind(format_timestamp(entry.completed_at))
        .execute(executor)
        .await
        .context("Failed to append transaction")?;

        Ok(entry.with_id(result.last_insert_rowid()))
    }

    /// All entries of an account, oldest first; ties broken by id.
    pub async fn list_for_account<'e>(
        executor: impl SqliteExecutor<'e>,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, kind, description, counterparty, completed_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY completed_at, id
            "#,
        )
        .bind(account_id)
        .fetch_all(executor)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    pub async fn count_for_account<'e>(
        executor: impl SqliteExecutor<'e>,
        account_id: AccountId,
    ) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM transactions WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(executor)
            .await
            .context("Failed to count transactions")?;
        Ok(row.get("count"))
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("kind");
        let completed_at_str: String = row.get("completed_at");

        Ok(Transaction {
            id: row.get("id"),
            account_id: row.get("account_id"),
            amount: row.get("amount"),
            kind: TransactionKind::parse(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            description: row.get("description"),
            counterparty: row.get("counterparty"),
            completed_at: parse_timestamp(&completed_at_str)?,
        })
    }
}
