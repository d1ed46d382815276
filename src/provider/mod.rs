//! File-backed tables exposed to the engine as table providers.

mod csv;
mod indexed;

pub use csv::{csv_table, CsvCursor};
pub use indexed::{sstable_table, DecodedRow, SsTableCursor};

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::catalog::{Session, TableProvider};
use datafusion::datasource::streaming::StreamingTable;
use datafusion::datasource::TableType;
use datafusion::logical_expr::Expr;
use datafusion::physical_plan::streaming::PartitionStream;
use datafusion::physical_plan::ExecutionPlan;
use tracing::debug;

/// A named, typed output column of a harness table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

pub(crate) fn schema_from_columns(columns: &[Column]) -> SchemaRef {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(c.name.as_str(), c.data_type.clone(), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// A read-only, file-backed table. Scans are sequential and lazy: every
/// scan opens an independent cursor over the backing file, so the engine
/// restarts iteration simply by scanning again. The backing file handle is
/// owned by the cursor and released when the scan finishes.
#[derive(Debug)]
pub struct HarnessTable {
    name: String,
    columns: Vec<Column>,
    schema: SchemaRef,
    stream: Arc<dyn PartitionStream>,
}

impl HarnessTable {
    pub(crate) fn new(name: &str, columns: Vec<Column>, stream: Arc<dyn PartitionStream>) -> Self {
        let schema = stream.schema().clone();
        Self {
            name: name.to_owned(),
            columns,
            schema,
            stream,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

#[async_trait]
impl TableProvider for HarnessTable {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    async fn scan(
        &self,
        state: &dyn Session,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> datafusion::error::Result<Arc<dyn ExecutionPlan>> {
        debug!(
            "scan requested for table '{}' (projection: {:?}, limit: {:?})",
            self.name, projection, limit
        );
        let table = StreamingTable::try_new(self.schema.clone(), vec![self.stream.clone()])?;
        table.scan(state, projection, filters, limit).await
    }
}
