//! Resource Table
//!
//! `ResourceTable` is the single engine type every list view plugs into:
//! - Query state (sort, page, filter) and sort headers
//! - Fetch cycles through the `FetchCoordinator`
//! - Column and status registries for the rendering layer
//!
//! ## Trigger Flow
//!
//! ```text
//! header click / pager / filter box
//!        │
//!        ▼
//! mutate one query field
//! (sort also resets page)
//!        │
//!        ▼
//! build Query ──► FetchCoordinator ──► ResourceSource::fetch
//!                                            │
//!                                            ▼
//!                                  ResourceSource::map
//!                                            │
//!                                            ▼
//!                                       TableStore ──► renderer
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use kdash_core::{FilterState, PageState, SortState, TableConfig};

use crate::columns::{Column, ColumnKind, ColumnRegistry, ComponentRef};
use crate::error::TableError;
use crate::query::{build_query, FieldMap};
use crate::sort::{SortHeaderState, SortHeaders};
use crate::source::{
    DetailParams, HrefBuilder, LogNotifier, Notifier, PathHrefBuilder, ResourceSource,
    Settings, SharedSettings,
};
use crate::status::{RowInteraction, Status, StatusBindingRegistry};
use crate::store::{TableSnapshot, TableStore};

mod coordinator;

pub use coordinator::{FetchCoordinator, FetchPhase, ListUpdate, Trigger};

// =============================================================================
// Identifiers and Query State
// =============================================================================

/// Unique identifier of one table instance, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(uuid::Uuid);

impl TableId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current sort, page and filter selections of a table.
///
/// Each input handler owns exactly one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub sort: SortState,
    pub page: PageState,
    pub filter: FilterState,
}

// =============================================================================
// Resource Table
// =============================================================================

/// A list view's table: query state, fetch cycles, columns and statuses.
///
/// Built with [`ResourceTable::builder`]. Building fires the initial load.
pub struct ResourceTable<S: ResourceSource> {
    id: TableId,
    source: Arc<S>,
    settings: Arc<dyn Settings>,
    href_builder: Arc<dyn HrefBuilder>,
    detail_state: Option<String>,
    fields: FieldMap,
    state: Mutex<QueryState>,
    headers: Mutex<SortHeaders>,
    columns: ColumnRegistry,
    statuses: StatusBindingRegistry<S::Row>,
    rows: Mutex<RowInteraction>,
    store: Arc<TableStore<S::Row>>,
    coordinator: Arc<FetchCoordinator<S>>,
}

impl<S: ResourceSource> ResourceTable<S> {
    /// Start building a table.
    pub fn builder() -> ResourceTableBuilder<S> {
        ResourceTableBuilder::new()
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Activate a column's sort header.
    ///
    /// Resets the page to the first one. Returns `false` (and starts no
    /// cycle) when the column is not sortable.
    pub fn set_sort(&self, column: &str) -> bool {
        let Some(sort) = self.headers.lock().activate(column) else {
            return false;
        };
        {
            let mut state = self.state.lock();
            state.sort = sort;
            state.page.index = 0;
        }
        self.trigger(Trigger::SortChanged);
        true
    }

    /// Move to a 0-based page.
    pub fn set_page(&self, index: usize) {
        self.state.lock().page.index = index;
        self.trigger(Trigger::PageChanged);
    }

    /// Filter by name substring. An empty query clears the filter.
    pub fn set_filter(&self, query: impl Into<String>) {
        self.state.lock().filter = FilterState::new(query);
        self.trigger(Trigger::FilterChanged);
    }

    /// Re-fetch with the current selections.
    pub fn refresh(&self) {
        self.trigger(Trigger::Refresh);
    }

    fn trigger(&self, trigger: Trigger) {
        let (query, filtered) = {
            let mut state = self.state.lock();
            match self.settings.items_per_page() {
                0 => tracing::warn!(
                    table = %self.id,
                    "Ignoring page size 0, keeping {}",
                    state.page.size
                ),
                size => state.page.size = size,
            }
            let query = build_query(&state.sort, &state.page, &state.filter, &self.fields);
            (query, state.filter.is_active())
        };
        self.rows.lock().reset();
        self.coordinator.start_cycle(trigger, query, filtered);
    }

    // =========================================================================
    // Query State
    // =========================================================================

    /// Copy of the current selections.
    pub fn query_state(&self) -> QueryState {
        self.state.lock().clone()
    }

    /// State of a column's sort header.
    pub fn header_state(&self, column: &str) -> Option<SortHeaderState> {
        self.headers.lock().state(column)
    }

    pub fn is_sortable(&self, column: &str) -> bool {
        self.headers.lock().is_sortable(column)
    }

    /// Phase of the current fetch cycle.
    pub fn phase(&self) -> FetchPhase {
        self.coordinator.phase()
    }

    // =========================================================================
    // Store
    // =========================================================================

    /// Read-only view of the table store.
    pub fn store(&self) -> &TableStore<S::Row> {
        &self.store
    }

    pub fn snapshot(&self) -> TableSnapshot<S::Row> {
        self.store.snapshot()
    }

    /// Subscribe to store changes.
    pub fn subscribe(&self) -> watch::Receiver<TableSnapshot<S::Row>> {
        self.store.subscribe()
    }

    /// Subscribe to committed list updates.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<ListUpdate> {
        self.coordinator.subscribe_updates()
    }

    /// Whether to show the "nothing here" placeholder instead of a table.
    pub fn show_zero_state(&self) -> bool {
        let snapshot = self.store.snapshot();
        snapshot.total_items == 0 && !snapshot.is_loading && !self.state.lock().filter.is_active()
    }

    // =========================================================================
    // Columns and Statuses
    // =========================================================================

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    /// Registered columns whose predicate currently holds.
    pub fn visible_columns(&self) -> Vec<Column> {
        self.columns.visible_columns()
    }

    /// Ordered column ids to render.
    pub fn layout(&self) -> Vec<String> {
        self.columns.layout(&self.source.display_columns())
    }

    /// Status glyph of a row.
    pub fn status_of(&self, row: &S::Row) -> Status {
        self.statuses.status_of(row)
    }

    /// Detail link of a resource, or `""` when the view has no detail page.
    pub fn details_href(&self, name: &str, namespace: Option<&str>) -> String {
        let Some(state_name) = &self.detail_state else {
            return String::new();
        };
        let params = DetailParams {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        };
        self.href_builder.href(state_name, &params)
    }

    // =========================================================================
    // Row Interaction
    // =========================================================================

    pub fn row_over(&self, index: usize) {
        self.rows.lock().row_over(index);
    }

    pub fn row_leave(&self) {
        self.rows.lock().row_leave();
    }

    /// Toggle expansion of a row with errors.
    pub fn expand_row(&self, index: usize, has_errors: bool) {
        self.rows.lock().expand(index, has_errors);
    }

    pub fn is_row_expanded(&self, index: usize) -> bool {
        self.rows.lock().is_row_expanded(index)
    }

    pub fn show_hover_icon(&self, index: usize, has_errors: bool) -> bool {
        self.rows.lock().show_hover_icon(index, has_errors)
    }
}

impl<S: ResourceSource> Drop for ResourceTable<S> {
    fn drop(&mut self) {
        // Late results of a destroyed view must not write anywhere.
        self.coordinator.cancel();
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ResourceTable`].
pub struct ResourceTableBuilder<S: ResourceSource> {
    source: Option<Arc<S>>,
    settings: Option<Arc<dyn Settings>>,
    notifier: Arc<dyn Notifier>,
    href_builder: Arc<dyn HrefBuilder>,
    config: TableConfig,
    fields: Option<FieldMap>,
    sortable: Vec<String>,
    detail_state: Option<String>,
    list_id: Option<String>,
    columns: ColumnRegistry,
    statuses: StatusBindingRegistry<S::Row>,
}

impl<S: ResourceSource> ResourceTableBuilder<S> {
    fn new() -> Self {
        Self {
            source: None,
            settings: None,
            notifier: Arc::new(LogNotifier),
            href_builder: Arc::new(PathHrefBuilder),
            config: TableConfig::default(),
            fields: None,
            sortable: Vec::new(),
            detail_state: None,
            list_id: None,
            columns: ColumnRegistry::new(),
            statuses: StatusBindingRegistry::new(),
        }
    }

    /// The fetch and mapping strategy.
    pub fn source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    /// Settings collaborator. Defaults to settings seeded from the config.
    pub fn settings(mut self, settings: Arc<dyn Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Receiver of fetch errors. Defaults to logging them.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn href_builder(mut self, href_builder: Arc<dyn HrefBuilder>) -> Self {
        self.href_builder = href_builder;
        self
    }

    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Column -> backend field mapping. Defaults to the one in the config.
    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Declare sortable columns.
    pub fn sortable<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.sortable.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Route name of the resource detail page.
    pub fn detail_state(mut self, state_name: impl Into<String>) -> Self {
        self.detail_state = Some(state_name.into());
        self
    }

    /// Identifier carried by list updates. Defaults to the table id.
    pub fn list_id(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn register_column<F>(self, id: impl Into<String>, kind: ColumnKind, visible: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.columns.register_column(id, kind, visible);
        self
    }

    pub fn register_action_column(self, id: &str, component: ComponentRef) -> Self {
        self.columns.register_action_column(id, component);
        self
    }

    pub fn register_dynamic_column<F>(
        self,
        id: impl Into<String>,
        after: impl Into<String>,
        visible: F,
    ) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.columns.register_dynamic_column(id, after, visible);
        self
    }

    pub fn register_binding<F>(
        self,
        icon: impl Into<String>,
        css_class: impl Into<String>,
        predicate: F,
    ) -> Self
    where
        F: Fn(&S::Row) -> bool + Send + Sync + 'static,
    {
        self.statuses.register_binding(icon, css_class, predicate);
        self
    }

    pub fn register_labeled_binding<F>(
        self,
        css_class: impl Into<String>,
        predicate: F,
        label: impl Into<String>,
    ) -> Self
    where
        F: Fn(&S::Row) -> bool + Send + Sync + 'static,
    {
        self.statuses.register_labeled_binding(css_class, predicate, label);
        self
    }

    /// Validate the wiring, build the table and fire the initial load.
    pub fn build(self) -> Result<ResourceTable<S>, TableError> {
        let source = self.source.ok_or(TableError::MissingSource)?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(TableError::NoRuntime);
        }

        let settings: Arc<dyn Settings> = match self.settings {
            Some(settings) => settings,
            None => Arc::new(SharedSettings::new(self.config.items_per_page)),
        };
        let page_size = settings.items_per_page();
        if page_size == 0 {
            return Err(TableError::InvalidPageSize);
        }

        let display_columns = source.display_columns();
        for column in &self.sortable {
            if !display_columns.contains(column) {
                return Err(TableError::UnknownSortColumn(column.clone()));
            }
        }
        for column in self.columns.all() {
            if let Some(anchor) = &column.after {
                if !display_columns.contains(anchor) {
                    return Err(TableError::UnknownColumn {
                        column: column.id.clone(),
                        anchor: anchor.clone(),
                    });
                }
            }
        }

        let fields = self
            .fields
            .unwrap_or_else(|| FieldMap::from_config(&self.config));

        let mut headers = SortHeaders::new(fields.age_column());
        for column in &self.sortable {
            headers.declare(column.clone());
        }
        if source.endpoint().is_none() {
            headers.disable();
        }

        let id = TableId::new();
        let list_id = self.list_id.unwrap_or_else(|| id.to_string());
        let store = Arc::new(TableStore::new());
        let coordinator = Arc::new(FetchCoordinator::new(
            id,
            list_id.clone(),
            source.clone(),
            store.clone(),
            self.notifier,
            self.config.loading_delay(),
        ));

        let table = ResourceTable {
            id,
            source,
            settings,
            href_builder: self.href_builder,
            detail_state: self.detail_state,
            fields,
            state: Mutex::new(QueryState {
                sort: SortState::unset(),
                page: PageState::first(page_size),
                filter: FilterState::default(),
            }),
            headers: Mutex::new(headers),
            columns: self.columns,
            statuses: self.statuses,
            rows: Mutex::new(RowInteraction::new()),
            store,
            coordinator,
        };

        tracing::info!(
            table = %id,
            list = %list_id,
            columns = table.columns.count(),
            bindings = table.statuses.count(),
            "Resource table created"
        );

        table.trigger(Trigger::Initial);
        Ok(table)
    }
}
