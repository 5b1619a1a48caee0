//! Query building.
//!
//! Turns the current sort, page and filter selections into the canonical
//! `Query` sent to a list endpoint. Everything here is pure.

use std::collections::HashMap;

use kdash_core::{
    FilterState, PageState, Query, SortState, TableConfig, DEFAULT_AGE_COLUMN, DEFAULT_AGE_FIELD,
};

/// Prefix of a name-substring filter.
const NAME_FILTER_PREFIX: &str = "name,";

// =============================================================================
// Field Map
// =============================================================================

/// Lookup from column id to the backend field it sorts on.
///
/// The age column always maps to the age field. Sorting on the age field
/// inverts the direction flag: "age ascending" in the UI means newest first,
/// which the backend reads as descending `creationTimestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    age_column: String,
    age_field: String,
    mappings: HashMap<String, String>,
}

impl FieldMap {
    /// The default mapping: `age -> creationTimestamp`, nothing else.
    pub fn new() -> Self {
        Self::with_age(DEFAULT_AGE_COLUMN, DEFAULT_AGE_FIELD)
    }

    /// A mapping with a custom age column and field.
    pub fn with_age(column: impl Into<String>, field: impl Into<String>) -> Self {
        let age_column = column.into();
        let age_field = field.into();
        let mut mappings = HashMap::new();
        mappings.insert(age_column.clone(), age_field.clone());
        Self {
            age_column,
            age_field,
            mappings,
        }
    }

    /// Build the mapping described by a table config.
    pub fn from_config(config: &TableConfig) -> Self {
        let mut fields = Self::with_age(&config.age_column, &config.age_field);
        for (column, field) in &config.field_mappings {
            fields = fields.map(column, field);
        }
        fields
    }

    /// Add a column -> field mapping. The age column cannot be remapped.
    pub fn map(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        let column = column.into();
        if column == self.age_column {
            tracing::warn!("Ignoring remap of age column '{}'", column);
            return self;
        }
        self.mappings.insert(column, field.into());
        self
    }

    /// Backend field for a column. Unmapped columns pass through unchanged.
    pub fn backend_field<'a>(&'a self, column: &'a str) -> &'a str {
        self.mappings
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }

    /// Column id of the age column.
    pub fn age_column(&self) -> &str {
        &self.age_column
    }

    /// Check if a backend field is the age field.
    pub fn is_age_field(&self, field: &str) -> bool {
        field == self.age_field
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// Build the query for the given selections.
pub fn build_query(
    sort: &SortState,
    page: &PageState,
    filter: &FilterState,
    fields: &FieldMap,
) -> Query {
    Query {
        sort_by: sort_by(sort, fields),
        items_per_page: page.size,
        page: page.index.saturating_add(1),
        filter_by: filter_by(filter),
    }
}

/// Format the `sortBy` parameter: `"<a|d>,<backendField>"`.
pub fn sort_by(sort: &SortState, fields: &FieldMap) -> String {
    let column = sort.active_column.as_deref().unwrap_or(fields.age_column());
    let field = fields.backend_field(column);

    let mut ascending = sort.direction.is_ascending();
    if fields.is_age_field(field) {
        ascending = !ascending;
    }

    let flag = if ascending { "a" } else { "d" };
    format!("{},{}", flag, field)
}

/// Format the `filterBy` parameter. Only names are filterable.
pub fn filter_by(filter: &FilterState) -> String {
    if filter.is_active() {
        format!("{}{}", NAME_FILTER_PREFIX, filter.query)
    } else {
        String::new()
    }
}
