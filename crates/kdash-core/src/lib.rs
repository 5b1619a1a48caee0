//! Core types for kdash resource tables.
//!
//! This crate contains the data structures shared by the table engine and
//! the views built on top of it:
//! - Sort, page and filter selections
//! - The canonical `Query` handed to fetch collaborators
//! - Raw list results
//! - Configuration types
//! - Error types

mod config;
mod error;
mod query;

pub use config::{config_path, TableConfig, DEFAULT_AGE_COLUMN, DEFAULT_AGE_FIELD};
pub use error::{ConfigError, FetchError};
pub use query::{FilterState, ListResult, PageState, Query, SortDirection, SortState};
