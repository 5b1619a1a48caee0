//! Pod list view over an in-memory cluster.
//!
//! `PodSource` answers list queries the way a real list endpoint does:
//! name filter, sort and pagination happen "server-side", after an
//! artificial round-trip latency. Pods are stored as raw JSON documents and
//! decoded on every fetch, so a malformed document fails the fetch.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use kdash_core::{FetchError, ListResult, Query, TableConfig};
use kdash_table::{
    ColumnKind, ComponentRef, ResourceSource, ResourceTable, Settings, TableError,
};

use crate::render::Cells;

const FIXTURE: &str = include_str!("../fixtures/pods.json");

// =============================================================================
// Raw Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Running,
    Pending,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// A pod as the list endpoint returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub object_meta: ObjectMeta,
    pub status: PodPhase,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub node_name: Option<String>,
}

/// Load the bundled pod fixture as raw documents.
pub fn fixture_documents() -> Result<Vec<serde_json::Value>, serde_json::Error> {
    serde_json::from_str(FIXTURE)
}

/// Decode raw pod documents.
pub fn decode(documents: &[serde_json::Value]) -> Result<Vec<Pod>, FetchError> {
    documents
        .iter()
        .enumerate()
        .map(|(index, document)| {
            Pod::deserialize(document)
                .map_err(|e| FetchError::Decode(format!("pod #{}: {}", index, e)))
        })
        .collect()
}

// =============================================================================
// Rows
// =============================================================================

/// A rendered pod row.
#[derive(Debug, Clone, PartialEq)]
pub struct PodRow {
    pub name: String,
    pub namespace: String,
    pub created: String,
    pub phase: PodPhase,
    pub restarts: u32,
    pub warnings: Vec<String>,
    pub node: Option<String>,
}

impl PodRow {
    pub fn has_errors(&self) -> bool {
        self.phase == PodPhase::Failed || !self.warnings.is_empty()
    }
}

impl From<Pod> for PodRow {
    fn from(pod: Pod) -> Self {
        Self {
            name: pod.object_meta.name,
            namespace: pod.object_meta.namespace,
            created: pod.object_meta.creation_timestamp,
            phase: pod.status,
            restarts: pod.restart_count,
            warnings: pod.warnings,
            node: pod.node_name,
        }
    }
}

impl Cells for PodRow {
    fn cell(&self, column: &str) -> Option<String> {
        match column {
            "name" => Some(self.name.clone()),
            "namespace" => Some(self.namespace.clone()),
            "restarts" => Some(self.restarts.to_string()),
            "age" => Some(self.created.clone()),
            "node" => Some(self.node.clone().unwrap_or_else(|| "<none>".to_string())),
            _ => None,
        }
    }
}

// =============================================================================
// Source
// =============================================================================

/// In-memory pod list endpoint.
pub struct PodSource {
    documents: Arc<Vec<serde_json::Value>>,
    latency: Duration,
    fail_next: AtomicBool,
}

impl PodSource {
    pub fn new(documents: Vec<serde_json::Value>) -> Self {
        Self {
            documents: Arc::new(documents),
            latency: Duration::ZERO,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next fetch fail with a 503.
    pub fn fail_next(&self) {
        self.fail_next.store(true, AtomicOrdering::SeqCst);
    }
}

impl ResourceSource for PodSource {
    type Raw = Pod;
    type Row = PodRow;

    fn fetch(&self, query: Query) -> BoxFuture<'static, Result<ListResult<Pod>, FetchError>> {
        let documents = self.documents.clone();
        let latency = self.latency;
        let fail = self.fail_next.swap(false, AtomicOrdering::SeqCst);

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if fail {
                return Err(FetchError::Status {
                    code: 503,
                    message: "cluster unavailable".to_string(),
                });
            }
            let pods = decode(&documents)?;
            Ok(answer(&pods, &query))
        })
    }

    fn map(&self, raw: ListResult<Pod>) -> Vec<PodRow> {
        raw.items.into_iter().map(PodRow::from).collect()
    }

    fn display_columns(&self) -> Vec<String> {
        ["statusicon", "name", "restarts", "age"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn endpoint(&self) -> Option<&str> {
        Some("api/v1/pod")
    }
}

/// Filter, sort and paginate like the list endpoint.
fn answer(pods: &[Pod], query: &Query) -> ListResult<Pod> {
    let mut matching: Vec<Pod> = match query.filter_by.split_once(',') {
        Some(("name", needle)) => pods
            .iter()
            .filter(|p| p.object_meta.name.contains(needle))
            .cloned()
            .collect(),
        _ => pods.to_vec(),
    };

    if let Some((direction, field)) = query.sort_by.split_once(',') {
        matching.sort_by(|a, b| {
            let ordering = compare(a, b, field);
            if direction == "d" {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let total_items = matching.len();
    let start = query.page.saturating_sub(1) * query.items_per_page;
    let items = matching
        .into_iter()
        .skip(start)
        .take(query.items_per_page)
        .collect();
    ListResult::new(items, total_items)
}

fn compare(a: &Pod, b: &Pod, field: &str) -> Ordering {
    match field {
        "name" => a.object_meta.name.cmp(&b.object_meta.name),
        "namespace" => a.object_meta.namespace.cmp(&b.object_meta.namespace),
        "creationTimestamp" => a
            .object_meta
            .creation_timestamp
            .cmp(&b.object_meta.creation_timestamp),
        "restartCount" => a.restart_count.cmp(&b.restart_count),
        _ => Ordering::Equal,
    }
}

// =============================================================================
// View
// =============================================================================

/// Display options local to the pod list.
#[derive(Debug, Default)]
pub struct PodListOptions {
    wide: AtomicBool,
}

impl PodListOptions {
    /// Show the node column.
    pub fn set_wide(&self, wide: bool) {
        self.wide.store(wide, AtomicOrdering::Relaxed);
    }

    pub fn is_wide(&self) -> bool {
        self.wide.load(AtomicOrdering::Relaxed)
    }
}

/// Build the pod list table.
///
/// The namespace column appears after the name while more than one
/// namespace is selected. The node column is only shown in wide output.
pub fn pod_list(
    source: Arc<PodSource>,
    settings: Arc<dyn Settings>,
    options: Arc<PodListOptions>,
    config: TableConfig,
) -> Result<ResourceTable<PodSource>, TableError> {
    let namespaces = settings.clone();

    ResourceTable::builder()
        .source(source)
        .settings(settings)
        .config(config)
        .list_id("pods")
        .detail_state("pod")
        .sortable(["name", "age"])
        .register_dynamic_column("namespace", "name", move || {
            namespaces.multiple_namespaces_selected()
        })
        .register_column("node", ColumnKind::Data, move || options.is_wide())
        .register_action_column("menu", ComponentRef::new("pod-menu"))
        .register_binding("error", "kd-error", |pod: &PodRow| pod.has_errors())
        .register_binding("timelapse", "kd-muted", |pod: &PodRow| {
            pod.phase == PodPhase::Pending
        })
        .register_binding("check_circle", "kd-success", |pod: &PodRow| {
            pod.phase == PodPhase::Running
        })
        .register_labeled_binding(
            "kd-muted",
            |pod: &PodRow| pod.phase == PodPhase::Succeeded,
            "Completed",
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sort_by: &str, items_per_page: usize, page: usize, filter_by: &str) -> Query {
        Query {
            sort_by: sort_by.to_string(),
            items_per_page,
            page,
            filter_by: filter_by.to_string(),
        }
    }

    fn names(result: &ListResult<Pod>) -> Vec<&str> {
        result
            .items
            .iter()
            .map(|p| p.object_meta.name.as_str())
            .collect()
    }

    fn fixture_pods() -> Vec<Pod> {
        decode(&fixture_documents().unwrap()).unwrap()
    }

    #[test]
    fn test_fixture_parses() {
        let pods = fixture_pods();
        assert_eq!(pods.len(), 6);
        assert_eq!(pods[3].status, PodPhase::Failed);
        assert_eq!(pods[2].node_name, None);
        assert!(pods[0].warnings.is_empty());
    }

    #[test]
    fn test_decode_reports_malformed_document() {
        let mut documents = fixture_documents().unwrap();
        documents.push(serde_json::json!({ "status": "Running" }));

        let err = decode(&documents).unwrap_err();
        assert!(matches!(&err, FetchError::Decode(message) if message.starts_with("pod #6")));
    }

    #[tokio::test]
    async fn test_malformed_document_fails_fetch() {
        let source = PodSource::new(vec![serde_json::json!({ "objectMeta": 7 })]);

        let err = source.fetch(query("a,name", 10, 1, "")).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_unknown_phase() {
        let json = r#"{
            "objectMeta": {
                "name": "x",
                "namespace": "default",
                "creationTimestamp": "2026-01-01T00:00:00Z"
            },
            "status": "Evicted"
        }"#;
        let pod: Pod = serde_json::from_str(json).unwrap();
        assert_eq!(pod.status, PodPhase::Unknown);
    }

    #[test]
    fn test_answer_newest_first() {
        let pods = fixture_pods();
        let result = answer(&pods, &query("d,creationTimestamp", 3, 1, ""));

        assert_eq!(names(&result), vec!["worker-7", "web-2", "api-0"]);
        assert_eq!(result.total_items, 6);
    }

    #[test]
    fn test_answer_filters_before_paging() {
        let pods = fixture_pods();
        let result = answer(&pods, &query("a,name", 1, 2, "name,web"));

        assert_eq!(names(&result), vec!["web-2"]);
        assert_eq!(result.total_items, 2);
    }

    #[test]
    fn test_answer_past_last_page() {
        let pods = fixture_pods();
        let result = answer(&pods, &query("a,name", 10, 4, ""));

        assert!(result.items.is_empty());
        assert_eq!(result.total_items, 6);
    }

    #[test]
    fn test_row_errors() {
        let pods = fixture_pods();
        let rows: Vec<PodRow> = pods.into_iter().map(PodRow::from).collect();

        assert!(rows.iter().find(|r| r.name == "worker-7").unwrap().has_errors());
        assert!(!rows.iter().find(|r| r.name == "web-1").unwrap().has_errors());
        assert_eq!(rows[1].cell("restarts").as_deref(), Some("1"));
        assert_eq!(rows[1].cell("statusicon"), None);
        assert_eq!(rows[0].cell("node").as_deref(), Some("node-a"));
        assert_eq!(rows[2].cell("node").as_deref(), Some("<none>"));
    }

    #[tokio::test]
    async fn test_failing_fetch() {
        let source = PodSource::new(fixture_documents().unwrap());
        source.fail_next();

        let err = source.fetch(query("a,name", 10, 1, "")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 503, .. }));
        assert!(source.fetch(query("a,name", 10, 1, "")).await.is_ok());
    }
}
