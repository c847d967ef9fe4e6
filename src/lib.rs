// BankGrid - virtualized, filterable, sortable record grids for the bank admin dashboard

pub mod auth;
pub mod config;
pub mod debounce;
pub mod filter;
pub mod grid;
pub mod models;
pub mod record;
pub mod sort;
pub mod source;
pub mod viewport;

// Re-export main types for convenience
pub use config::GridConfig;
pub use debounce::Debouncer;
pub use filter::{Constraint, DatePreset, FilterSpec, filter, filter_indices};
pub use grid::{GridView, Header, WindowMode};
pub use models::{Admin, Transaction, TransactionStatus};
pub use record::{Column, FieldKind, FieldValue, Record};
pub use sort::{SortDirection, SortSpec, sort, sort_indices};
pub use source::{Generate, read_jsonl, write_jsonl};
pub use viewport::{Viewport, ViewportState, Window, compute_window};
