//! Error types for resource tables.

use thiserror::Error;

/// Misconfiguration detected while building a resource table.
///
/// These are programming errors in a list view, not runtime conditions,
/// so `ResourceTableBuilder::build` fails fast instead of degrading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// No fetch source was wired.
    #[error("Resource table has no source")]
    MissingSource,

    /// Built outside a tokio runtime, so no cycle could ever run.
    #[error("Resource table must be built inside a tokio runtime")]
    NoRuntime,

    /// The settings collaborator reported a page size of zero.
    #[error("Items per page must be positive")]
    InvalidPageSize,

    /// A sortable column is not among the display columns.
    #[error("Sortable column '{0}' is not a display column")]
    UnknownSortColumn(String),

    /// A dynamic column is anchored on a column that is not displayed.
    #[error("Column '{column}' is anchored after '{anchor}', which is not a display column")]
    UnknownColumn { column: String, anchor: String },
}
