use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteExecutor};

use crate::domain::{Account, AccountId, Cents, OpenAccountRequest, TransferKey};

use super::{format_timestamp, parse_timestamp, timestamp_now};

const ACCOUNT_COLUMNS: &str =
    "id, full_name, balance, credit_limit, transfer_key, created_at, updated_at";

/// Adapter over the `accounts` table.
///
/// Every method takes an executor so it can run straight on the pool or
/// inside an atomic unit (`&mut *tx`).
pub struct AccountStore;

impl AccountStore {
    /// Insert a new account with a zero balance and no transfer key.
    pub async fn create<'e>(
        executor: impl SqliteExecutor<'e>,
        request: &OpenAccountRequest,
    ) -> Result<Account> {
        let created_at = timestamp_now();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (full_name, name_folded, balance, credit_limit, password_hash, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.full_name)
        .bind(fold_name(&request.full_name))
        .bind(request.credit_limit)
        .bind(&request.password_hash)
        .bind(format_timestamp(created_at))
        .bind(format_timestamp(created_at))
        .execute(executor)
        .await
        .context("Failed to create account")?;

        Ok(Account {
            id: result.last_insert_rowid(),
            full_name: request.full_name.clone(),
            balance: 0,
            credit_limit: request.credit_limit,
            transfer_key: None,
            created_at,
            updated_at: created_at,
        })
    }

    /// Open the unit's write transaction on the store, touching the row.
    ///
    /// SQLite has no `SELECT ... FOR UPDATE`; a no-op write takes the store's
    /// write lock before any read, so the unit never works from a stale
    /// snapshot. The lock is database-wide and only held for the unit's few
    /// statements; per-account exclusion comes from [`RowLocks`](super::RowLocks).
    /// Returns `false` if the account does not exist.
    pub async fn claim<'e>(executor: impl SqliteExecutor<'e>, id: AccountId) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET balance = balance WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .context("Failed to lock account row")?;
        Ok(result.rows_affected() == 1)
    }

    /// Get an account by ID.
    pub async fn find_by_id<'e>(
        executor: impl SqliteExecutor<'e>,
        id: AccountId,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get the account a transfer key points at.
    pub async fn find_by_transfer_key<'e>(
        executor: impl SqliteExecutor<'e>,
        key: &TransferKey,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE transfer_key = ?"
        ))
        .bind(key.as_str())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch account by transfer key")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Case-insensitive substring search on the display name.
    ///
    /// SQLite's `LIKE` only folds ASCII, so matching runs against a copy of
    /// the name lowercased on insert.
    pub async fn search_by_name<'e>(
        executor: impl SqliteExecutor<'e>,
        fragment: &str,
    ) -> Result<Vec<Account>> {
        let pattern = format!("%{}%", escape_like(&fold_name(fragment.trim())));

        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE name_folded LIKE ? ESCAPE '\\' ORDER BY full_name, id"
        ))
        .bind(pattern)
        .fetch_all(executor)
        .await
        .context("Failed to search accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Overwrite the balance. Callers must hold the row claim.
    pub async fn set_balance<'e>(
        executor: impl SqliteExecutor<'e>,
        id: AccountId,
        balance: Cents,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET balance = ?, updated_at = ? WHERE id = ?")
            .bind(balance)
            .bind(format_timestamp(at))
            .bind(id)
            .execute(executor)
            .await
            .context("Failed to update balance")?;

        if result.rows_affected() != 1 {
            anyhow::bail!("Balance update touched {} rows", result.rows_affected());
        }
        Ok(())
    }

    /// Set the transfer key if none is assigned yet.
    /// Returns `false` when the account already had one (or doesn't exist).
    /// A key already used by another account fails on the UNIQUE constraint.
    pub async fn assign_transfer_key<'e>(
        executor: impl SqliteExecutor<'e>,
        id: AccountId,
        key: &TransferKey,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET transfer_key = ? WHERE id = ? AND transfer_key IS NULL",
        )
        .bind(key.as_str())
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to assign transfer key")?;
        Ok(result.rows_affected() == 1)
    }

    /// Sum of all balances. Transfers never change it.
    pub async fn total_balance<'e>(executor: impl SqliteExecutor<'e>) -> Result<Cents> {
        let row = sqlx::query("SELECT COALESCE(SUM(balance), 0) AS total FROM accounts")
            .fetch_one(executor)
            .await
            .context("Failed to sum balances")?;
        Ok(row.get("total"))
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");
        let transfer_key: Option<String> = row.get("transfer_key");

        Ok(Account {
            id: row.get("id"),
            full_name: row.get("full_name"),
            balance: row.get("balance"),
            credit_limit: row.get("credit_limit"),
            transfer_key: transfer_key.map(TransferKey::new),
            created_at: parse_timestamp(&created_at_str)?,
            updated_at: parse_timestamp(&updated_at_str)?,
        })
    }
}

fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ana"), "ana");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_fold_name_handles_accents() {
        assert_eq!(fold_name("ÂNGELA Conceição"), "ângela conceição");
        assert_eq!(fold_name("JOÃO"), fold_name("joão"));
    }
}
