//! Collaborator traits for resource tables.
//!
//! A concrete list view plugs into the engine through `ResourceSource`.
//! Settings, notifications and detail links are external collaborators
//! passed in at construction, so the engine can be driven by mocks in tests.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use kdash_core::{FetchError, ListResult, Query};

// =============================================================================
// Resource Source
// =============================================================================

/// The fetch and mapping strategy of one resource kind.
///
/// This trait returns futures, allowing the engine to spawn them however it
/// wants. This enables testing with sources that resolve on demand.
pub trait ResourceSource: Send + Sync + 'static {
    /// Item type of the raw list response.
    type Raw: Send + 'static;

    /// Row type the table renders.
    type Row: Clone + Send + Sync + 'static;

    /// Fetch one page of the collection. Fields the endpoint does not support
    /// may be ignored.
    fn fetch(&self, query: Query) -> BoxFuture<'static, Result<ListResult<Self::Raw>, FetchError>>;

    /// Map a raw response to rows. Must be total over well-formed input.
    fn map(&self, raw: ListResult<Self::Raw>) -> Vec<Self::Row>;

    /// Static column ids, in display order.
    fn display_columns(&self) -> Vec<String>;

    /// The list endpoint backing this source. Without one the table cannot
    /// sort server-side and its headers are disabled.
    fn endpoint(&self) -> Option<&str>;
}

// =============================================================================
// Settings
// =============================================================================

/// Global settings read by the engine. The engine never writes them.
#[cfg_attr(test, mockall::automock)]
pub trait Settings: Send + Sync {
    /// Page size for every table.
    fn items_per_page(&self) -> usize;

    /// Whether more than one namespace is selected.
    fn multiple_namespaces_selected(&self) -> bool;
}

/// In-process settings backed by atomics.
#[derive(Debug)]
pub struct SharedSettings {
    items_per_page: AtomicUsize,
    multiple_namespaces: AtomicBool,
}

impl SharedSettings {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            items_per_page: AtomicUsize::new(items_per_page),
            multiple_namespaces: AtomicBool::new(false),
        }
    }

    pub fn set_items_per_page(&self, items: usize) {
        self.items_per_page.store(items, Ordering::Relaxed);
    }

    pub fn set_multiple_namespaces(&self, selected: bool) {
        self.multiple_namespaces.store(selected, Ordering::Relaxed);
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Settings for SharedSettings {
    fn items_per_page(&self) -> usize {
        self.items_per_page.load(Ordering::Relaxed)
    }

    fn multiple_namespaces_selected(&self) -> bool {
        self.multiple_namespaces.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Receives fetch errors of current cycles.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &FetchError);
}

/// Notifier that reports through `tracing`.
///
/// Rejected requests (4xx) are warnings; everything else is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, error: &FetchError) {
        if error.is_client_error() {
            tracing::warn!("Fetch rejected: {}", error);
        } else {
            tracing::error!("Fetch failed: {}", error);
        }
    }
}

// =============================================================================
// Detail Links
// =============================================================================

/// Parameters of a resource detail link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailParams {
    pub name: String,
    pub namespace: Option<String>,
}

/// Builds detail links. Purely a routing concern.
pub trait HrefBuilder: Send + Sync {
    fn href(&self, state_name: &str, params: &DetailParams) -> String;
}

/// Builds `/{state}/{namespace}/{name}` or `/{state}/{name}` paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathHrefBuilder;

impl HrefBuilder for PathHrefBuilder {
    fn href(&self, state_name: &str, params: &DetailParams) -> String {
        match &params.namespace {
            Some(namespace) => format!("/{}/{}/{}", state_name, namespace, params.name),
            None => format!("/{}/{}", state_name, params.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_settings() {
        let settings = SharedSettings::default();
        assert_eq!(settings.items_per_page(), 10);
        assert!(!settings.multiple_namespaces_selected());

        settings.set_items_per_page(50);
        settings.set_multiple_namespaces(true);
        assert_eq!(settings.items_per_page(), 50);
        assert!(settings.multiple_namespaces_selected());
    }

    #[test]
    fn test_path_href() {
        let builder = PathHrefBuilder;

        let namespaced = DetailParams {
            name: "web-1".to_string(),
            namespace: Some("default".to_string()),
        };
        assert_eq!(builder.href("pod", &namespaced), "/pod/default/web-1");

        let cluster_scoped = DetailParams {
            name: "node-a".to_string(),
            namespace: None,
        };
        assert_eq!(builder.href("node", &cluster_scoped), "/node/node-a");
    }
}
