pub mod classify;
pub mod config;
pub mod crosstab;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod models;
pub mod report;
pub mod source;
pub mod summary;
pub mod timeline;

pub use classify::{classify, Classification, EmergencyCategory, Priority, Status};
pub use config::FetchConfig;
pub use error::{FetchError, Result};
pub use fetch::{Dashboard, DashboardView, FetchLoop, FetchOutcome, FetchProgress, FetchState};
pub use filters::{FilterOptions, FlagFilter, RecordFilter};
pub use models::*;
pub use source::{HttpPageSource, PageSource, SnapshotPageSource};
pub use summary::{calculate_totals, summarize_districts};
pub use timeline::TimeRange;
