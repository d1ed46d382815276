//! CSV-backed tables: header-derived string columns, lazy row scans.
//!
//! The consumed format is deliberately plain: the first line is a
//! comma-separated header that fixes column names and arity, every later
//! line is one data row. No quoting or escaping; every field is a string.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::sync::Arc;

use datafusion::arrow::array::{ArrayRef, StringArray};
use datafusion::arrow::datatypes::{DataType, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::execution::TaskContext;
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::streaming::PartitionStream;
use datafusion::physical_plan::SendableRecordBatchStream;
use tracing::debug;

use super::{schema_from_columns, Column, HarnessTable};
use crate::error::{HarnessError, Result};

const BATCH_SIZE: usize = 1024;

/// Builds a table from a CSV file. Fails with `NotFound` when the file
/// cannot be opened. The whole file is validated here so a ragged data row
/// fails construction rather than a later scan.
pub fn csv_table(name: &str, path: &str) -> Result<Arc<HarnessTable>> {
    let mut cursor = CsvCursor::open(path)?;
    let columns: Vec<Column> = cursor
        .header()
        .iter()
        .map(|h| Column::new(h.as_str(), DataType::Utf8))
        .collect();

    let mut rows = 0usize;
    while cursor.advance()?.is_some() {
        rows += 1;
    }
    debug!(
        "csv table '{}': {} columns, {} rows ({})",
        name,
        columns.len(),
        rows,
        path
    );

    let stream = Arc::new(CsvPartition {
        schema: schema_from_columns(&columns),
        path: path.to_owned(),
    });
    Ok(Arc::new(HarnessTable::new(name, columns, stream)))
}

/// Forward-only cursor over the data rows of a CSV file. Each instance owns
/// its own file handle; dropping the cursor closes the file. Re-opening
/// yields a fresh cursor positioned at the first data row.
#[derive(Debug)]
pub struct CsvCursor {
    lines: Lines<BufReader<File>>,
    header: Vec<String>,
    line_no: usize,
}

impl CsvCursor {
    pub fn open(path: &str) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            HarnessError::NotFound(format!("cannot open csv file '{path}': {e}"))
        })?;
        let mut lines = BufReader::new(file).lines();
        let header_line = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(HarnessError::InvalidArgument(format!(
                    "csv file '{path}' is empty, expected a header row"
                )))
            }
        };
        let header: Vec<String> = header_line.split(',').map(str::to_owned).collect();
        Ok(Self {
            lines,
            header,
            line_no: 1,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Returns the next data row, split on commas, or `None` at end of
    /// file. A row whose field count differs from the header is malformed.
    pub fn advance(&mut self) -> Result<Option<Vec<String>>> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line?;
        self.line_no += 1;
        let fields: Vec<String> = line.split(',').map(str::to_owned).collect();
        if fields.len() != self.header.len() {
            return Err(HarnessError::InvalidArgument(format!(
                "csv row at line {} has {} fields, header has {}",
                self.line_no,
                fields.len(),
                self.header.len()
            )));
        }
        Ok(Some(fields))
    }
}

#[derive(Debug)]
struct CsvPartition {
    schema: SchemaRef,
    path: String,
}

impl PartitionStream for CsvPartition {
    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn execute(&self, _ctx: Arc<TaskContext>) -> SendableRecordBatchStream {
        debug!("starting csv scan over '{}'", self.path);
        let batches = CsvBatchIter {
            schema: self.schema.clone(),
            path: self.path.clone(),
            cursor: None,
            done: false,
        };
        Box::pin(RecordBatchStreamAdapter::new(
            self.schema.clone(),
            futures::stream::iter(batches),
        ))
    }
}

/// Pull-based batch iterator. Opens the file on the first pull so every
/// scan gets an independent cursor starting at the first data row.
struct CsvBatchIter {
    schema: SchemaRef,
    path: String,
    cursor: Option<CsvCursor>,
    done: bool,
}

impl Iterator for CsvBatchIter {
    type Item = datafusion::error::Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cursor.is_none() {
            match CsvCursor::open(&self.path) {
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

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(BATCH_SIZE);
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
        Some(rows_to_batch(&self.schema, &rows))
    }
}

fn rows_to_batch(schema: &SchemaRef, rows: &[Vec<String>]) -> datafusion::error::Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for col in 0..schema.fields().len() {
        let values: StringArray = rows.iter().map(|r| Some(r[col].as_str())).collect();
        columns.push(Arc::new(values));
    }
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}
