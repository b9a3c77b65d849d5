pub mod analytics;
pub mod cli;
pub mod cli_types;
pub mod config;
pub mod discover;
pub mod error;
pub mod reconcile;
pub mod scanner;
pub mod storage;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use types::*;
pub use error::{CatalogError, Result};
pub use scanner::{classify, resolve_title, Classification, ProjectWalker, SkipReason, WalkOptions, WalkStats};
pub use reconcile::{reconcile, Admission, Reconciler, Reconciliation};
pub use storage::{LifecycleStore, ListFilter, MemoryCatalog, Page, SqliteCatalog};
pub use discover::{discover, discover_with, DiscoveryEvent, DiscoveryReport};
pub use analytics::AnalyticsReport;
pub use config::CliConfig;
pub use cli::CliApp;
pub use ui::UIManager;
