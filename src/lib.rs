// Library exports for sqlharness
// This lets the binary and the integration tests share the same modules

pub mod catalog;
pub mod config;
pub mod error;
pub mod execute;
pub mod format;
pub mod provider;
pub mod table_spec;

// Re-export commonly used types
pub use catalog::descriptor::DescriptorPool;
pub use catalog::QueryCatalog;
pub use config::{AnalyzedPlanHook, ExecuteQueryConfig, ToolMode};
pub use error::{HarnessError, Result};
pub use execute::execute_query;
pub use provider::{csv_table, sstable_table, Column, HarnessTable};
pub use table_spec::{TableFormat, TableSpec};
