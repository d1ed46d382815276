//! Indexed-file tables: a sorted key-value container whose values decode
//! against a descriptor-pool message type.
//!
//! Container layout: line 1 is a JSON header `{"value_type": "pkg.Name"}`;
//! every later line is `<key>\t<JSON object>`, keys in ascending order.
//! The decoded fields become typed columns after a leading `key` column;
//! iteration follows the container's native key order.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::sync::Arc;

use datafusion::arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::execution::TaskContext;
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::streaming::PartitionStream;
use datafusion::physical_plan::SendableRecordBatchStream;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{schema_from_columns, Column, HarnessTable};
use crate::catalog::descriptor::{DescriptorPool, FieldKind, MessageDescriptor};
use crate::error::{HarnessError, Result};

const BATCH_SIZE: usize = 1024;

/// Builds a table from an indexed key-value container. Requires a
/// descriptor pool to resolve the container's value type; the whole
/// container is validated here (sortedness and decodability), scans then
/// re-read lazily.
pub fn sstable_table(
    name: &str,
    path: &str,
    pool: Option<&DescriptorPool>,
) -> Result<Arc<HarnessTable>> {
    let pool = pool.ok_or_else(|| {
        HarnessError::InvalidArgument(format!(
            "table '{name}' uses the sstable format, which requires a descriptor pool"
        ))
    })?;
    let value_type = read_header(path)?;
    let descriptor = pool
        .get(&value_type)
        .ok_or_else(|| {
            HarnessError::InvalidArgument(format!(
                "descriptor pool does not define value type '{value_type}' (table '{name}')"
            ))
        })?
        .clone();

    let mut columns = vec![Column::new("key", DataType::Utf8)];
    columns.extend(descriptor.columns());

    let mut cursor = SsTableCursor::open(path, descriptor.clone())?;
    let mut rows = 0usize;
    while cursor.advance()?.is_some() {
        rows += 1;
    }
    debug!(
        "sstable table '{}': value type {}, {} columns, {} rows ({})",
        name,
        value_type,
        columns.len(),
        rows,
        path
    );

    let stream = Arc::new(SsTablePartition {
        schema: schema_from_columns(&columns),
        path: path.to_owned(),
        descriptor,
    });
    Ok(Arc::new(HarnessTable::new(name, columns, stream)))
}

#[derive(Debug, Deserialize)]
struct ContainerHeader {
    value_type: String,
}

fn read_header(path: &str) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        HarnessError::NotFound(format!("cannot open sstable file '{path}': {e}"))
    })?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;
    if line.trim().is_empty() {
        return Err(HarnessError::InvalidArgument(format!(
            "sstable file '{path}' is missing its header line"
        )));
    }
    let header: ContainerHeader = serde_json::from_str(line.trim()).map_err(|e| {
        HarnessError::InvalidArgument(format!("malformed sstable header in '{path}': {e}"))
    })?;
    Ok(header.value_type)
}

/// One decoded container entry: the key plus the value's JSON object, type
/// checked against the table's descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    pub key: String,
    pub value: serde_json::Map<String, Value>,
}

/// Forward-only cursor over a container's entries in native key order.
/// Owns its file handle; a fresh cursor starts at the first entry.
#[derive(Debug)]
pub struct SsTableCursor {
    lines: Lines<BufReader<File>>,
    descriptor: MessageDescriptor,
    last_key: Option<String>,
    line_no: usize,
}

impl SsTableCursor {
    pub fn open(path: &str, descriptor: MessageDescriptor) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            HarnessError::NotFound(format!("cannot open sstable file '{path}': {e}"))
        })?;
        let mut lines = BufReader::new(file).lines();
        if lines.next().transpose()?.is_none() {
            return Err(HarnessError::InvalidArgument(format!(
                "sstable file '{path}' is missing its header line"
            )));
        }
        Ok(Self {
            lines,
            descriptor,
            last_key: None,
            line_no: 1,
        })
    }

    pub fn advance(&mut self) -> Result<Option<DecodedRow>> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line?;
        self.line_no += 1;

        let Some((key, value)) = line.split_once('\t') else {
            return Err(HarnessError::InvalidArgument(format!(
                "sstable line {} is missing the key/value tab separator",
                self.line_no
            )));
        };
        if let Some(last) = &self.last_key {
            if key < last.as_str() {
                return Err(HarnessError::InvalidArgument(format!(
                    "sstable keys out of order at line {}: '{}' after '{}'",
                    self.line_no, key, last
                )));
            }
        }

        let parsed: Value = serde_json::from_str(value).map_err(|e| {
            HarnessError::InvalidArgument(format!(
                "undecodable value at sstable line {}: {e}",
                self.line_no
            ))
        })?;
        let Some(object) = parsed.as_object() else {
            return Err(HarnessError::InvalidArgument(format!(
                "value at sstable line {} is not a JSON object",
                self.line_no
            )));
        };
        for field in &self.descriptor.fields {
            let Some(v) = object.get(&field.name) else {
                continue;
            };
            if v.is_null() {
                continue;
            }
            let matches_kind = match field.kind {
                FieldKind::String => v.is_string(),
                FieldKind::Int64 => v.is_i64(),
                FieldKind::Double => v.is_number(),
                FieldKind::Bool => v.is_boolean(),
            };
            if !matches_kind {
                return Err(HarnessError::InvalidArgument(format!(
                    "field '{}' at sstable line {}: expected {}",
                    field.name,
                    self.line_no,
                    field.kind.type_name()
                )));
            }
        }

        self.last_key = Some(key.to_owned());
        Ok(Some(DecodedRow {
            key: key.to_owned(),
            value: object.clone(),
        }))
    }
}

#[derive(Debug)]
struct SsTablePartition {
    schema: SchemaRef,
    path: String,
    descriptor: MessageDescriptor,
}

impl PartitionStream for SsTablePartition {
    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn execute(&self, _ctx: Arc<TaskContext>) -> SendableRecordBatchStream {
        debug!("starting sstable scan over '{}'", self.path);
        let batches = SsTableBatchIter {
            schema: self.schema.clone(),
            path: self.path.clone(),
            descriptor: self.descriptor.clone(),
            cursor: None,
            done: false,
        };
        Box::pin(RecordBatchStreamAdapter::new(
            self.schema.clone(),
            futures::stream::iter(batches),
        ))
    }
}

struct SsTableBatchIter {
    schema: SchemaRef,
    path: String,
    descriptor: MessageDescriptor,
    cursor: Option<SsTableCursor>,
    done: bool,
}

impl Iterator for SsTableBatchIter {
    type Item = datafusion::error::Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cursor.is_none() {
            match SsTableCursor::open(&self.path, self.descriptor.clone()) {
                Ok(cursor) => self.cursor = Some(cursor),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into_external()));
                }
            }
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return None;
        };

        let mut rows: Vec<DecodedRow> = Vec::with_capacity(BATCH_SIZE);
        while rows.len() < BATCH_SIZE {
            match cursor.advance() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into_external()));
                }
            }
        }
        if rows.is_empty() {
            return None;
        }
        Some(rows_to_batch(&self.schema, &self.descriptor, &rows))
    }
}

fn rows_to_batch(
    schema: &SchemaRef,
    descriptor: &MessageDescriptor,
    rows: &[DecodedRow],
) -> datafusion::error::Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(descriptor.fields.len() + 1);
    let keys: StringArray = rows.iter().map(|r| Some(r.key.as_str())).collect();
    columns.push(Arc::new(keys));
    for field in &descriptor.fields {
        let values = rows.iter().map(|r| r.value.get(&field.name));
        let array: ArrayRef = match field.kind {
            FieldKind::String => Arc::new(
                values
                    .map(|v| v.and_then(Value::as_str).map(str::to_owned))
                    .collect::<StringArray>(),
            ),
            FieldKind::Int64 => {
                Arc::new(values.map(|v| v.and_then(Value::as_i64)).collect::<Int64Array>())
            }
            FieldKind::Double => Arc::new(
                values
                    .map(|v| v.and_then(Value::as_f64))
                    .collect::<Float64Array>(),
            ),
            FieldKind::Bool => Arc::new(
                values
                    .map(|v| v.and_then(Value::as_bool))
                    .collect::<BooleanArray>(),
            ),
        };
        columns.push(array);
    }
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}
