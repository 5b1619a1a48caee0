//! Plain-text table rendering.

use std::fmt::Write;

use kdash_table::{ResourceSource, ResourceTable, SortHeaderState};

/// Column values of a row, by column id.
pub trait Cells {
    fn cell(&self, column: &str) -> Option<String>;
}

const STATUS_COLUMN: &str = "statusicon";

/// Render the current table snapshot as aligned text.
pub fn render<S>(title: &str, table: &ResourceTable<S>) -> String
where
    S: ResourceSource,
    S::Row: Cells,
{
    let snapshot = table.snapshot();
    let page = table.query_state().page.index + 1;

    let mut out = String::new();
    let _ = write!(out, "{} ({} total, page {})", title, snapshot.total_items, page);
    if snapshot.is_loading {
        out.push_str(" [loading]");
    }

    if table.show_zero_state() {
        out.push_str("\nNothing to display");
        return out;
    }

    let layout = table.layout();
    let columns = table.columns().all();

    let header: Vec<String> = layout.iter().map(|id| header(table, id)).collect();
    let rows: Vec<Vec<String>> = snapshot
        .rows
        .iter()
        .map(|row| {
            layout
                .iter()
                .map(|id| {
                    if id == STATUS_COLUMN {
                        let status = table.status_of(row);
                        if status.is_neutral() {
                            return "-".to_string();
                        }
                        return status.label.unwrap_or(status.icon);
                    }
                    if let Some(component) = columns
                        .iter()
                        .find(|c| &c.id == id)
                        .and_then(|c| c.component())
                    {
                        return format!("[{}]", component.key);
                    }
                    row.cell(id).unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..layout.len())
        .map(|i| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    for line in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        out.push('\n');
        out.push_str(cells.join("  ").trim_end());
    }
    out
}

fn header<S: ResourceSource>(table: &ResourceTable<S>, id: &str) -> String {
    if id == STATUS_COLUMN {
        return "STATUS".to_string();
    }
    if id.starts_with("action-") {
        return String::new();
    }
    let label = id.to_uppercase();
    match table.header_state(id) {
        Some(SortHeaderState::Ascending) => format!("{} ^", label),
        Some(SortHeaderState::Descending) => format!("{} v", label),
        _ => label,
    }
}
