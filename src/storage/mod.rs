mod accounts;
mod database;
mod locks;
mod transactions;

pub use accounts::*;
pub use database::*;
pub use locks::*;
pub use transactions::*;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// SQL migration for the accounts table and the transaction log
pub const MIGRATION_001_LEDGER: &str = include_str!("migrations/001_ledger.sql");

/// Current time at the precision the store keeps, so a timestamp handed back
/// to a caller compares equal to the one read back later.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339: lexical order is chronological order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {s}"))?
        .with_timezone(&Utc))
}

/// True when the underlying store rejected a write on a CHECK constraint.
pub fn is_check_violation(err: &anyhow::Error) -> bool {
    database_error_matches(err, |db| db.is_check_violation())
}

/// True when the underlying store rejected a write on a UNIQUE constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    database_error_matches(err, |db| db.is_unique_violation())
}

fn database_error_matches(
    err: &anyhow::Error,
    pred: impl Fn(&dyn sqlx::error::DatabaseError) -> bool,
) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => pred(&**db),
        _ => false,
    }
}
