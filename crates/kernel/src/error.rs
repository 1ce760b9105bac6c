//! Kernel error types.

use thiserror::Error;

/// Errors surfaced by the catalog listing engine.
///
/// Sort field and direction problems coming from users are corrected by
/// falling back to defaults before a query is built; the variants here
/// indicate configuration or collaborator failures.
#[derive(Debug, Error)]
pub enum ListingError {
    /// A `filter_column_*` key survived sanitization but resolves to no
    /// column in the query spec. Indicates a schema/extension defect.
    #[error("unknown filter column '{0}'")]
    UnknownFilterColumn(String),

    /// A filter targets a column that declares no filter template.
    #[error("column '{0}' does not support filtering")]
    UnfilterableColumn(String),

    /// An order field/direction pair bypassed the allow-list check.
    /// Unreachable when the builder validated its inputs.
    #[error("invalid sort: {field} {direction}")]
    InvalidSort { field: String, direction: String },

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type alias using ListingError.
pub type ListingResult<T> = Result<T, ListingError>;
