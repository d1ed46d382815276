//! Per-invocation registry of tables the engine resolves names against.

pub mod descriptor;

use std::collections::BTreeMap;
use std::sync::Arc;

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::catalog::TableProvider;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use tracing::debug;

use crate::error::Result;
use crate::provider::{schema_from_columns, HarnessTable};
use descriptor::DescriptorPool;

/// Owns every table of one invocation plus the optional descriptor pool.
/// Built once during configuration, read-mostly afterwards.
#[derive(Debug, Default)]
pub struct QueryCatalog {
    tables: BTreeMap<String, Arc<HarnessTable>>,
    descriptor_pool: Option<DescriptorPool>,
}

impl QueryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its name. Re-registering a name replaces the
    /// earlier entry: the last registration is the one lookups observe.
    pub fn register(&mut self, table: Arc<HarnessTable>) {
        debug!(
            "registering table '{}' ({} columns)",
            table.name(),
            table.columns().len()
        );
        self.tables.insert(table.name().to_owned(), table);
    }

    /// Exact, case-sensitive lookup.
    pub fn get_table(&self, name: &str) -> Option<&Arc<HarnessTable>> {
        self.tables.get(name)
    }

    /// All registered tables, in name order.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<HarnessTable>> {
        self.tables.values()
    }

    pub fn set_descriptor_pool(&mut self, pool: DescriptorPool) {
        self.descriptor_pool = Some(pool);
    }

    pub fn descriptor_pool(&self) -> Option<&DescriptorPool> {
        self.descriptor_pool.as_ref()
    }

    /// Looks up a message type by qualified name. `None` when no descriptor
    /// pool is configured or the pool does not define the type; neither is
    /// an error.
    pub fn get_type(&self, name: &str) -> Option<SchemaRef> {
        let descriptor = self.descriptor_pool.as_ref()?.get(name)?;
        Some(schema_from_columns(&descriptor.columns()))
    }

    /// Hands every registered table to the engine's session catalog.
    pub fn register_into(&self, ctx: &SessionContext) -> Result<()> {
        for table in self.tables.values() {
            let provider: Arc<dyn TableProvider> = table.clone();
            // Bare reference keeps the name verbatim; the `&str` conversion
            // would lowercase it and break case-sensitive lookups.
            ctx.register_table(TableReference::bare(table.name()), provider)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::csv_table;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn table_with_header(name: &str, header: &str) -> Arc<HarnessTable> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{header}").unwrap();
        file.flush().unwrap();
        csv_table(name, file.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let mut catalog = QueryCatalog::new();
        catalog.register(table_with_header("People", "id,name"));
        assert!(catalog.get_table("People").is_some());
        assert!(catalog.get_table("people").is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut catalog = QueryCatalog::new();
        catalog.register(table_with_header("T", "a,b"));
        catalog.register(table_with_header("T", "a,b,c"));
        assert_eq!(catalog.tables().count(), 1);
        assert_eq!(catalog.get_table("T").unwrap().columns().len(), 3);
    }

    #[test]
    fn enumeration_is_name_ordered() {
        let mut catalog = QueryCatalog::new();
        catalog.register(table_with_header("b", "x"));
        catalog.register(table_with_header("a", "x"));
        let names: Vec<&str> = catalog.tables().map(|t| t.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn get_type_without_pool_is_none() {
        let catalog = QueryCatalog::new();
        assert!(catalog.get_type("zoo.Animal").is_none());
    }

    #[test]
    fn get_type_resolves_pool_entries() {
        let mut catalog = QueryCatalog::new();
        catalog.set_descriptor_pool(
            DescriptorPool::from_json(
                r#"{"types": {"zoo.Animal": {"fields": [{"name": "legs", "type": "int64"}]}}}"#,
            )
            .unwrap(),
        );
        let schema = catalog.get_type("zoo.Animal").unwrap();
        assert_eq!(schema.fields().len(), 1);
        assert!(catalog.get_type("zoo.Plant").is_none());
    }
}
