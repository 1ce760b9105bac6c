//! Database connection pool management and SQL execution collaborator.
//!
//! The listing engine never talks to sqlx directly; it goes through the
//! [`SqlExecutor`] trait so tests (and alternative storage backends) can
//! substitute their own execution and escaping.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo};

use crate::config::Config;
use crate::error::ListingResult;

/// A result row, keyed by select alias.
pub type Row = serde_json::Map<String, Value>;

/// Create a MySQL connection pool.
pub async fn create_pool(config: &Config) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to MySQL")?;

    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &MySqlPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Escaping primitive for values interpolated into compiled queries.
///
/// Every user-supplied filter value passes through [`SqlEscape::escape`]
/// before the query builder renders it into a predicate.
pub trait SqlEscape {
    /// Escape a single value.
    ///
    /// In numeric mode the value is reduced to a number literal (falling
    /// back to `0`), so no quoting is ever needed. In string mode MySQL
    /// metacharacters are backslash-escaped; `quote` additionally wraps
    /// the result in single quotes.
    fn escape(&self, value: &str, numeric: bool, quote: bool) -> String {
        if numeric {
            let trimmed = value.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return i.to_string();
            }
            if let Ok(f) = trimmed.parse::<f64>()
                && f.is_finite()
            {
                return f.to_string();
            }
            return "0".to_string();
        }

        let escaped = escape_string(value);
        if quote {
            format!("'{escaped}'")
        } else {
            escaped
        }
    }
}

/// Executes compiled listing queries.
#[async_trait]
pub trait SqlExecutor: SqlEscape + Send + Sync {
    /// Execute a SELECT and return all rows.
    async fn fetch_rows(&self, sql: &str) -> ListingResult<Vec<Row>>;

    /// Execute a query returning a single scalar (COUNT, etc.).
    async fn fetch_scalar(&self, sql: &str) -> ListingResult<i64>;
}

/// sqlx-backed executor for the catalog database.
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

impl SqlEscape for MySqlExecutor {}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    async fn fetch_rows(&self, sql: &str) -> ListingResult<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_scalar(&self, sql: &str) -> ListingResult<i64> {
        let value = sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(value)
    }
}

/// Backslash-escape MySQL string metacharacters.
fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert a MySQL row into a JSON map keyed by column alias.
///
/// DECIMAL columns are rendered as strings to preserve precision.
fn row_to_json(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let i = column.ordinal();
        let value = match column.type_info().name() {
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" => row
                .try_get::<Option<i64>, _>(i)
                .ok()
                .flatten()
                .map(Value::from),
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => row
                .try_get::<Option<u64>, _>(i)
                .ok()
                .flatten()
                .map(Value::from),
            "FLOAT" | "DOUBLE" => row
                .try_get::<Option<f64>, _>(i)
                .ok()
                .flatten()
                .map(Value::from),
            "DECIMAL" => row
                .try_get::<Option<rust_decimal::Decimal>, _>(i)
                .ok()
                .flatten()
                .map(|d| Value::String(d.to_string())),
            _ => row
                .try_get::<Option<String>, _>(i)
                .ok()
                .flatten()
                .map(Value::from),
        };
        out.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    out
}
