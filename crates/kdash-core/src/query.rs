//! Query state and the canonical query sent to list endpoints.

use serde::{Deserialize, Serialize};

// =============================================================================
// Query State
// =============================================================================

/// Direction of the active sort.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
    /// No direction picked yet. Read as ascending when building queries.
    #[default]
    Unset,
}

impl SortDirection {
    /// Whether this direction sorts ascending. `Unset` counts as ascending.
    pub fn is_ascending(self) -> bool {
        !matches!(self, SortDirection::Descending)
    }
}

/// Current sort selection.
///
/// Mutated only by sort header activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Column the user sorted by. `None` means the default (age) sort.
    pub active_column: Option<String>,

    /// Direction of the sort.
    pub direction: SortDirection,
}

impl SortState {
    /// Sort by the given column in the given direction.
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            active_column: Some(column.into()),
            direction,
        }
    }

    /// The unset default sort.
    pub fn unset() -> Self {
        Self::default()
    }
}

/// Current page selection. `index` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub index: usize,

    /// Items per page. Owned by the settings collaborator.
    pub size: usize,
}

impl PageState {
    /// First page with the given size.
    pub fn first(size: usize) -> Self {
        Self { index: 0, size }
    }
}

/// Current filter selection. An empty query means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
}

impl FilterState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    /// Check if a filter is active.
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }
}

// =============================================================================
// Query
// =============================================================================

/// The fully built query handed to a fetch collaborator.
///
/// Every field is always populated; collaborators may ignore fields their
/// endpoint does not support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// `"<a|d>,<backendField>"`.
    pub sort_by: String,

    pub items_per_page: usize,

    /// 1-based page number.
    pub page: usize,

    /// `""` or `"name,<query>"`.
    pub filter_by: String,
}

// =============================================================================
// List Result
// =============================================================================

/// Raw response of a list endpoint, before mapping to rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub items: Vec<T>,

    /// Total number of items across all pages.
    pub total_items: usize,
}

impl<T> ListResult<T> {
    pub fn new(items: Vec<T>, total_items: usize) -> Self {
        Self { items, total_items }
    }
}
