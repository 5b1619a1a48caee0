//! kdash demo - drives a pod list table through a scripted session.
//!
//! Loads the table configuration, builds the pod list view over an
//! in-memory cluster with a slow endpoint and prints the table after every
//! user input.

mod pods;
mod render;

use std::sync::Arc;
use std::time::Duration;

use kdash_core::{config_path, TableConfig};
use kdash_table::{FetchPhase, ResourceTable, SharedSettings};

use pods::{fixture_documents, pod_list, PodListOptions, PodSource};
use render::render;

/// Endpoint latency. Longer than the default loading delay, so the loading
/// indicator shows.
const LATENCY: Duration = Duration::from_millis(250);

// =============================================================================
// Session
// =============================================================================

/// Wait until the current cycle is done, committed or failed.
async fn wait_idle(table: &ResourceTable<PodSource>) {
    while table.phase() != FetchPhase::Idle {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn show(step: &str, table: &ResourceTable<PodSource>) {
    println!("-- {}", step);
    println!("{}\n", render("pods", table));
}

async fn run(config: TableConfig) -> Result<(), String> {
    let documents =
        fixture_documents().map_err(|e| format!("Failed to parse pod fixture: {}", e))?;
    tracing::info!("Loaded {} pod documents", documents.len());

    let source = Arc::new(PodSource::new(documents).with_latency(LATENCY));
    // Small pages, so the fixture spans more than one.
    let settings = Arc::new(SharedSettings::new(config.items_per_page.min(4)));

    let options = Arc::new(PodListOptions::default());

    let table = pod_list(source.clone(), settings.clone(), options.clone(), config)
        .map_err(|e| format!("Failed to build pod list: {}", e))?;

    tokio::time::sleep(LATENCY / 2).await;
    show("initial load (in flight)", &table);
    wait_idle(&table).await;
    show("initial load", &table);

    table.set_sort("name");
    wait_idle(&table).await;
    show("sort by name", &table);

    // Only the last page request may land.
    table.set_page(1);
    table.set_page(0);
    table.set_page(1);
    wait_idle(&table).await;
    show("page 2", &table);

    settings.set_multiple_namespaces(true);
    table.set_filter("web");
    wait_idle(&table).await;
    show("filter 'web', all namespaces", &table);

    options.set_wide(true);
    show("wide output", &table);

    source.fail_next();
    table.refresh();
    wait_idle(&table).await;
    show("refresh against an unavailable cluster", &table);

    if let Some(row) = table.store().rows().first() {
        println!(
            "details of {}: {}",
            row.name,
            table.details_href(&row.name, Some(&row.namespace))
        );
    }

    Ok(())
}

// =============================================================================
// Entry Point
// =============================================================================

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("kdash demo starting...");

    let config = TableConfig::load_or_default();
    if config_path().map_or(true, |p| !p.exists()) {
        tracing::info!("Create ~/.config/kdash/table.toml to customize");
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(config)) {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
