//! Column Registry.
//!
//! This module provides:
//! - `Column` - A registered data or action column with a visibility predicate
//! - `ColumnRegistry` - Ordered storage consulted by the rendering layer
//!
//! Predicates may read external mutable state (such as the namespace
//! selection) and are never cached: every call re-evaluates them.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Prefix of action column ids in the rendered layout.
const ACTION_COLUMN_PREFIX: &str = "action-";

/// Visibility predicate of a column.
pub type VisibilityFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// An opaque reference to the component that renders an action column.
///
/// The engine never interprets it; it is threaded through to the
/// rendering layer as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub key: String,
}

impl ComponentRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// What a column renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// A field of the row.
    Data,
    /// An interactive control rendered by the referenced component.
    Action(ComponentRef),
}

/// A registered column.
#[derive(Clone)]
pub struct Column {
    pub id: String,
    pub kind: ColumnKind,

    /// Display column this column is spliced after, for dynamic columns.
    pub after: Option<String>,

    visible: VisibilityFn,
}

impl Column {
    /// Evaluate the visibility predicate.
    pub fn is_visible(&self) -> bool {
        (self.visible)()
    }

    /// Check if this is an action column.
    pub fn is_action(&self) -> bool {
        matches!(self.kind, ColumnKind::Action(_))
    }

    /// The action component, for action columns.
    pub fn component(&self) -> Option<&ComponentRef> {
        match &self.kind {
            ColumnKind::Action(component) => Some(component),
            ColumnKind::Data => None,
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("after", &self.after)
            .finish()
    }
}

/// Registry of the columns of one table.
///
/// Columns are registered once at view construction and never removed.
/// Registering the same id twice yields two entries.
pub struct ColumnRegistry {
    columns: RwLock<Vec<Column>>,
}

impl ColumnRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            columns: RwLock::new(Vec::new()),
        }
    }

    /// Register a column with a visibility predicate.
    pub fn register_column<F>(&self, id: impl Into<String>, kind: ColumnKind, visible: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.push(Column {
            id: id.into(),
            kind,
            after: None,
            visible: Arc::new(visible),
        });
    }

    /// Register an always-visible action column.
    ///
    /// The column id is `action-<id>`.
    pub fn register_action_column(&self, id: &str, component: ComponentRef) {
        self.push(Column {
            id: format!("{}{}", ACTION_COLUMN_PREFIX, id),
            kind: ColumnKind::Action(component),
            after: None,
            visible: Arc::new(|| true),
        });
    }

    /// Register a data column spliced in after `after` while `visible` holds.
    pub fn register_dynamic_column<F>(
        &self,
        id: impl Into<String>,
        after: impl Into<String>,
        visible: F,
    ) where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.push(Column {
            id: id.into(),
            kind: ColumnKind::Data,
            after: Some(after.into()),
            visible: Arc::new(visible),
        });
    }

    fn push(&self, column: Column) {
        let mut columns = self.columns.write();
        if columns.iter().any(|c| c.id == column.id) {
            tracing::warn!("Column '{}' registered more than once", column.id);
        }
        tracing::debug!("Registered column: {}", column.id);
        columns.push(column);
    }

    /// Registered columns whose predicate currently holds, in order.
    pub fn visible_columns(&self) -> Vec<Column> {
        let columns = self.columns.read();
        columns.iter().filter(|c| c.is_visible()).cloned().collect()
    }

    /// All registered columns, visible or not.
    pub fn all(&self) -> Vec<Column> {
        self.columns.read().clone()
    }

    /// Get the count of registered columns.
    pub fn count(&self) -> usize {
        self.columns.read().len()
    }

    /// Compute the ordered column ids the renderer draws.
    ///
    /// Starts from the static display columns. Registered data columns whose
    /// predicate is false are removed, visible ones missing from the display
    /// list are appended. Visible dynamic columns are spliced in right after
    /// their anchor. Action columns come last.
    pub fn layout(&self, display_columns: &[String]) -> Vec<String> {
        let columns = self.columns.read();

        let mut layout: Vec<String> = display_columns
            .iter()
            .filter(|id| {
                columns
                    .iter()
                    .filter(|c| &c.id == *id && c.after.is_none() && !c.is_action())
                    .all(|c| c.is_visible())
            })
            .cloned()
            .collect();

        for column in columns.iter() {
            if column.is_action() || !column.is_visible() || layout.contains(&column.id) {
                continue;
            }
            match &column.after {
                Some(anchor) => match layout.iter().position(|id| id == anchor) {
                    Some(pos) => layout.insert(pos + 1, column.id.clone()),
                    None => layout.push(column.id.clone()),
                },
                None => layout.push(column.id.clone()),
            }
        }

        for column in columns.iter().filter(|c| c.is_action() && c.is_visible()) {
            layout.push(column.id.clone());
        }

        layout
    }
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::new()
    }
}
