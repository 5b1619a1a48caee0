//! Sort header state machine.
//!
//! Each sortable column owns a header that cycles between unsorted,
//! ascending and descending. Only one header is active at a time.

use kdash_core::{SortDirection, SortState};

/// State of one sortable column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortHeaderState {
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

impl SortHeaderState {
    fn direction(self) -> SortDirection {
        match self {
            SortHeaderState::Unsorted => SortDirection::Unset,
            SortHeaderState::Ascending => SortDirection::Ascending,
            SortHeaderState::Descending => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone)]
struct SortHeader {
    column: String,
    state: SortHeaderState,
}

/// All sort headers of one table.
///
/// The age column starts ascending, matching the default newest-first
/// query. When the table has no endpoint to sort against, every header is
/// disabled and activation is ignored.
#[derive(Debug, Clone)]
pub struct SortHeaders {
    age_column: String,
    headers: Vec<SortHeader>,
    active: Option<String>,
    enabled: bool,
}

impl SortHeaders {
    /// Create an empty header set.
    pub fn new(age_column: impl Into<String>) -> Self {
        Self {
            age_column: age_column.into(),
            headers: Vec::new(),
            active: None,
            enabled: true,
        }
    }

    /// Declare a sortable column. Declaring a column twice is a no-op.
    pub fn declare(&mut self, column: impl Into<String>) {
        let column = column.into();
        if self.headers.iter().any(|h| h.column == column) {
            return;
        }

        let state = if column == self.age_column {
            self.active = Some(column.clone());
            SortHeaderState::Ascending
        } else {
            SortHeaderState::Unsorted
        };
        self.headers.push(SortHeader { column, state });
    }

    /// Force every header unsortable.
    pub fn disable(&mut self) {
        if self.enabled {
            tracing::debug!("Sorting disabled: table has no endpoint");
        }
        self.enabled = false;
    }

    /// Check if a column can be sorted on.
    pub fn is_sortable(&self, column: &str) -> bool {
        self.enabled && self.headers.iter().any(|h| h.column == column)
    }

    /// Current state of a column's header.
    pub fn state(&self, column: &str) -> Option<SortHeaderState> {
        self.headers
            .iter()
            .find(|h| h.column == column)
            .map(|h| h.state)
    }

    /// Activate a column header (a click on it).
    ///
    /// Activating a new column resets the previous one and starts ascending;
    /// activating the active column toggles its direction. Returns the new
    /// sort selection, or `None` if the column is not sortable.
    pub fn activate(&mut self, column: &str) -> Option<SortState> {
        if !self.is_sortable(column) {
            tracing::debug!("Ignoring sort on non-sortable column '{}'", column);
            return None;
        }

        let already_active = self.active.as_deref() == Some(column);
        for header in &mut self.headers {
            header.state = if header.column == column {
                match (already_active, header.state) {
                    (true, SortHeaderState::Ascending) => SortHeaderState::Descending,
                    _ => SortHeaderState::Ascending,
                }
            } else {
                SortHeaderState::Unsorted
            };
        }
        self.active = Some(column.to_string());

        let direction = self.state(column).map(SortHeaderState::direction)?;
        Some(SortState::new(column, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> SortHeaders {
        let mut headers = SortHeaders::new("age");
        headers.declare("name");
        headers.declare("namespace");
        headers.declare("age");
        headers
    }

    #[test]
    fn test_initial_states() {
        let headers = headers();

        assert_eq!(headers.state("age"), Some(SortHeaderState::Ascending));
        assert_eq!(headers.state("name"), Some(SortHeaderState::Unsorted));
        assert_eq!(headers.state("namespace"), Some(SortHeaderState::Unsorted));
        assert_eq!(headers.state("status"), None);
    }

    #[test]
    fn test_activate_new_column_resets_previous() {
        let mut headers = headers();

        let sort = headers.activate("name").unwrap();
        assert_eq!(sort, SortState::new("name", SortDirection::Ascending));
        assert_eq!(headers.state("name"), Some(SortHeaderState::Ascending));
        assert_eq!(headers.state("age"), Some(SortHeaderState::Unsorted));

        let sort = headers.activate("namespace").unwrap();
        assert_eq!(sort.active_column.as_deref(), Some("namespace"));
        assert_eq!(headers.state("name"), Some(SortHeaderState::Unsorted));
    }

    #[test]
    fn test_activate_active_column_toggles() {
        let mut headers = headers();

        headers.activate("name");
        let sort = headers.activate("name").unwrap();
        assert_eq!(sort.direction, SortDirection::Descending);

        let sort = headers.activate("name").unwrap();
        assert_eq!(sort.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_age_column_toggles_from_initial_ascending() {
        let mut headers = headers();

        let sort = headers.activate("age").unwrap();
        assert_eq!(sort, SortState::new("age", SortDirection::Descending));
    }

    #[test]
    fn test_unknown_column_is_ignored() {
        let mut headers = headers();

        assert!(headers.activate("status").is_none());
        assert_eq!(headers.state("age"), Some(SortHeaderState::Ascending));

        // The age column is still the active one, so it toggles.
        let sort = headers.activate("age").unwrap();
        assert_eq!(sort.direction, SortDirection::Descending);
    }

    #[test]
    fn test_disabled_headers_ignore_activation() {
        let mut headers = headers();
        headers.disable();

        assert!(!headers.is_sortable("name"));
        assert!(headers.activate("name").is_none());
        assert_eq!(headers.state("name"), Some(SortHeaderState::Unsorted));
    }

    #[test]
    fn test_declare_twice_is_noop() {
        let mut headers = headers();
        headers.activate("name");
        headers.declare("name");

        assert_eq!(headers.state("name"), Some(SortHeaderState::Ascending));
    }
}
