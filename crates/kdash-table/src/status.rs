//! Status bindings for resource rows.
//!
//! A status binding maps a row predicate to a status glyph. Bindings are
//! evaluated in registration order and the first match wins, so views
//! register error bindings before pending and success bindings.

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Row predicate of a status binding.
pub type StatusPredicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// The status shown for a row. The neutral status has every field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub icon: String,
    pub css_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Status {
    /// The empty status used when no binding matches.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Check if this is the neutral status.
    pub fn is_neutral(&self) -> bool {
        self.icon.is_empty() && self.css_class.is_empty() && self.label.is_none()
    }
}

/// A registered status binding.
pub struct StatusBinding<R> {
    predicate: StatusPredicate<R>,
    status: Status,
}

impl<R> StatusBinding<R> {
    fn matches(&self, row: &R) -> bool {
        (self.predicate)(row)
    }
}

impl<R> fmt::Debug for StatusBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBinding")
            .field("status", &self.status)
            .finish()
    }
}

/// Ordered registry of status bindings.
pub struct StatusBindingRegistry<R> {
    bindings: RwLock<Vec<StatusBinding<R>>>,
}

impl<R> StatusBindingRegistry<R> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(Vec::new()),
        }
    }

    /// Register an icon binding.
    pub fn register_binding<F>(
        &self,
        icon: impl Into<String>,
        css_class: impl Into<String>,
        predicate: F,
    ) where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.push(
            Status {
                icon: icon.into(),
                css_class: css_class.into(),
                label: None,
            },
            Arc::new(predicate),
        );
    }

    /// Register a binding with a text label instead of an icon.
    pub fn register_labeled_binding<F>(
        &self,
        css_class: impl Into<String>,
        predicate: F,
        label: impl Into<String>,
    ) where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.push(
            Status {
                icon: String::new(),
                css_class: css_class.into(),
                label: Some(label.into()),
            },
            Arc::new(predicate),
        );
    }

    fn push(&self, status: Status, predicate: StatusPredicate<R>) {
        tracing::debug!("Registered status binding: {}", status.css_class);
        self.bindings.write().push(StatusBinding { predicate, status });
    }

    /// Status of a row: the first matching binding, or the neutral status.
    pub fn status_of(&self, row: &R) -> Status {
        let bindings = self.bindings.read();
        bindings
            .iter()
            .find(|b| b.matches(row))
            .map(|b| b.status.clone())
            .unwrap_or_else(Status::neutral)
    }

    /// Get the count of registered bindings.
    pub fn count(&self) -> usize {
        self.bindings.read().len()
    }
}

impl<R> Default for StatusBindingRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Row Interaction
// =============================================================================

/// Hover and expansion state of rows in a status table.
///
/// Rows with errors can be expanded to show details. A hover icon hints at
/// the expansion while the row is hovered and still collapsed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RowInteraction {
    hovered: Option<usize>,
    expanded: Option<usize>,
}

impl RowInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer entered a row.
    pub fn row_over(&mut self, index: usize) {
        self.hovered = Some(index);
    }

    /// Pointer left the hovered row.
    pub fn row_leave(&mut self) {
        self.hovered = None;
    }

    pub fn is_row_hovered(&self, index: usize) -> bool {
        self.hovered == Some(index)
    }

    /// Toggle expansion of a row. Rows without errors never expand.
    pub fn expand(&mut self, index: usize, has_errors: bool) {
        if !has_errors {
            return;
        }
        self.expanded = if self.expanded == Some(index) {
            None
        } else {
            Some(index)
        };
    }

    pub fn is_row_expanded(&self, index: usize) -> bool {
        self.expanded == Some(index)
    }

    /// Whether to show the expansion hint on a row.
    pub fn show_hover_icon(&self, index: usize, has_errors: bool) -> bool {
        self.is_row_hovered(index) && has_errors && !self.is_row_expanded(index)
    }

    /// Forget hover and expansion, e.g. after the rows were replaced.
    pub fn reset(&mut self) {
        self.hovered = None;
        self.expanded = None;
    }
}
