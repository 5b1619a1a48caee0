//! Generic resource-table engine.
//!
//! Every list view (pods, deployments, services, ...) plugs into this crate
//! through a [`ResourceSource`] and gets:
//! - Sort, page and filter handling with one coherent fetch per change
//! - "Latest request wins" cycles with a flicker-free loading indicator
//! - Column and status-glyph registries for the rendering layer
//!
//! ## Example
//!
//! ```ignore
//! let table = ResourceTable::builder()
//!     .source(Arc::new(PodSource::new(client)))
//!     .sortable(["name", "age"])
//!     .register_binding("error", "kd-error", |pod: &Pod| pod.has_errors())
//!     .build()?;
//!
//! table.set_sort("name");
//! let snapshot = table.snapshot();
//! ```

pub mod columns;
pub mod engine;
pub mod error;
pub mod query;
pub mod sort;
pub mod source;
pub mod status;
pub mod store;

#[cfg(test)]
mod test_support;

pub use columns::{Column, ColumnKind, ColumnRegistry, ComponentRef};
pub use engine::{
    FetchPhase, ListUpdate, QueryState, ResourceTable, ResourceTableBuilder, TableId, Trigger,
};
pub use error::TableError;
pub use query::{build_query, FieldMap};
pub use sort::{SortHeaderState, SortHeaders};
pub use source::{
    DetailParams, HrefBuilder, LogNotifier, Notifier, PathHrefBuilder, ResourceSource,
    Settings, SharedSettings,
};
pub use status::{RowInteraction, Status, StatusBindingRegistry};
pub use store::{TableSnapshot, TableStore};
