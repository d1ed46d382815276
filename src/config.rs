//! Invocation configuration: tool mode, catalog and the inspection hook.

use std::fmt;
use std::str::FromStr;

use datafusion::logical_expr::LogicalPlan;
use tracing::debug;

use crate::catalog::descriptor::DescriptorPool;
use crate::catalog::QueryCatalog;
use crate::error::{HarnessError, Result};
use crate::provider::{csv_table, sstable_table};
use crate::table_spec::{TableFormat, TableSpec};

/// Which engine stage prefix a run invokes and renders. Fixed before
/// dispatch begins; there are no mode transitions mid-invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    Parse,
    Resolve,
    Explain,
    #[default]
    Execute,
}

impl FromStr for ToolMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parse" => Ok(ToolMode::Parse),
            "resolve" => Ok(ToolMode::Resolve),
            "explain" => Ok(ToolMode::Explain),
            "execute" => Ok(ToolMode::Execute),
            other => Err(HarnessError::InvalidArgument(format!(
                "invalid tool mode '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolMode::Parse => "parse",
            ToolMode::Resolve => "resolve",
            ToolMode::Explain => "explain",
            ToolMode::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Inspection callback handed the resolved plan exactly once per
/// resolve-or-later run; an error return vetoes the rest of the run before
/// any output is written.
pub type AnalyzedPlanHook = Box<dyn Fn(&LogicalPlan) -> Result<()> + Send + Sync>;

/// Everything one invocation needs: the mode, the catalog it owns and the
/// optional post-resolve hook. Mutated during the configuration phase,
/// read-only during dispatch.
#[derive(Default)]
pub struct ExecuteQueryConfig {
    mode: ToolMode,
    catalog: QueryCatalog,
    analyzed_plan_hook: Option<AnalyzedPlanHook>,
}

impl ExecuteQueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.mode
    }

    pub fn set_tool_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    /// Parses one of the four mode names; an unknown name fails without
    /// touching the configured mode.
    pub fn set_tool_mode_from_name(&mut self, name: &str) -> Result<()> {
        self.mode = name.parse()?;
        Ok(())
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    pub fn mutable_catalog(&mut self) -> &mut QueryCatalog {
        &mut self.catalog
    }

    pub fn set_analyzed_plan_hook(&mut self, hook: AnalyzedPlanHook) {
        self.analyzed_plan_hook = Some(hook);
    }

    pub fn analyzed_plan_hook(&self) -> Option<&AnalyzedPlanHook> {
        self.analyzed_plan_hook.as_ref()
    }

    /// Parses and registers every table spec, stopping at the first bad
    /// one. Tables registered before the failure stay registered; there is
    /// no batch rollback.
    pub fn add_tables_from_specs<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<()> {
        for raw in specs {
            let spec = TableSpec::parse(raw.as_ref())?;
            debug!("building table '{}' from spec '{}'", spec.name, raw.as_ref());
            let table = match spec.format {
                TableFormat::Csv => csv_table(&spec.name, spec.path())?,
                TableFormat::SsTable => {
                    sstable_table(&spec.name, spec.path(), self.catalog.descriptor_pool())?
                }
            };
            self.catalog.register(table);
        }
        Ok(())
    }

    /// `"none"` leaves the catalog without a pool; any other value is the
    /// path of a descriptor file.
    pub fn set_descriptor_pool_from_source(&mut self, source: &str) -> Result<()> {
        if source == "none" {
            return Ok(());
        }
        let pool = DescriptorPool::from_file(source)?;
        self.catalog.set_descriptor_pool(pool);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn mode_names_are_total_over_the_four_modes() {
        assert_eq!("parse".parse::<ToolMode>().unwrap(), ToolMode::Parse);
        assert_eq!("resolve".parse::<ToolMode>().unwrap(), ToolMode::Resolve);
        assert_eq!("explain".parse::<ToolMode>().unwrap(), ToolMode::Explain);
        assert_eq!("execute".parse::<ToolMode>().unwrap(), ToolMode::Execute);
    }

    #[test]
    fn bad_mode_name_leaves_config_unchanged() {
        let mut config = ExecuteQueryConfig::new();
        config.set_tool_mode(ToolMode::Resolve);
        let err = config.set_tool_mode_from_name("bad-mode").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
        assert_eq!(config.tool_mode(), ToolMode::Resolve);
    }

    #[test]
    fn default_mode_is_execute() {
        assert_eq!(ExecuteQueryConfig::new().tool_mode(), ToolMode::Execute);
    }

    #[test]
    fn bad_spec_registers_nothing() {
        let mut config = ExecuteQueryConfig::new();
        assert!(config.add_tables_from_specs(&["==="]).is_err());
        assert_eq!(config.catalog().tables().count(), 0);
    }

    #[test]
    fn batch_failure_keeps_earlier_registrations() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        file.flush().unwrap();
        let good = format!("Good=csv:{}", file.path().display());

        let mut config = ExecuteQueryConfig::new();
        let specs = [good, "Bad=csv:/definitely/not/here.csv".to_string()];
        let err = config.add_tables_from_specs(&specs).unwrap_err();
        assert!(matches!(err, HarnessError::NotFound(_)));
        assert!(config.catalog().get_table("Good").is_some());
        assert!(config.catalog().get_table("Bad").is_none());
    }

    #[test]
    fn descriptor_pool_source_none_is_a_no_op() {
        let mut config = ExecuteQueryConfig::new();
        config.set_descriptor_pool_from_source("none").unwrap();
        assert!(config.catalog().descriptor_pool().is_none());
    }
}
