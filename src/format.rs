//! Textual renderings of each mode's result. Every rendering ends with
//! exactly one trailing blank line.

use std::io::Write;

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::error::DataFusionError;
use datafusion::logical_expr::LogicalPlan;
use datafusion::sql::parser::Statement;

use crate::error::{HarnessError, Result};

/// Engine parse tree, rendered as the engine provides it.
pub fn write_statement(out: &mut dyn Write, statement: &Statement) -> Result<()> {
    writeln!(out, "{statement:#?}")?;
    writeln!(out)?;
    Ok(())
}

/// Resolved or optimized logical plan, rendered as the engine provides it.
pub fn write_plan(out: &mut dyn Write, plan: &LogicalPlan) -> Result<()> {
    writeln!(out, "{}", plan.display_indent())?;
    writeln!(out)?;
    Ok(())
}

/// Row stream as a bordered text table: a `+`/`-` border above the header,
/// below the header and after the last row; one space of margin per side;
/// cells left-aligned; column width = widest of header and values. Rows
/// keep the order the evaluator emitted them in.
pub fn write_batches(
    out: &mut dyn Write,
    schema: &SchemaRef,
    batches: &[RecordBatch],
) -> Result<()> {
    let headers: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(headers.len());
            for col in 0..headers.len() {
                let text = array_value_to_string(batch.column(col), row)
                    .map_err(|e| HarnessError::Engine(DataFusionError::from(e)))?;
                widths[col] = widths[col].max(text.len());
                cells.push(text);
            }
            rows.push(cells);
        }
    }

    let border = border_line(&widths);
    writeln!(out, "{border}")?;
    write_row(out, &headers, &widths)?;
    writeln!(out, "{border}")?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    writeln!(out, "{border}")?;
    writeln!(out)?;
    Ok(())
}

fn border_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn write_row(out: &mut dyn Write, cells: &[String], widths: &[usize]) -> Result<()> {
    let mut line = String::from("|");
    for (cell, &width) in cells.iter().zip(widths) {
        line.push_str(&format!(" {cell:<width$} |"));
    }
    writeln!(out, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::StringArray;
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch(schema: &SchemaRef, values: &[&str]) -> RecordBatch {
        let array = StringArray::from(values.to_vec());
        RecordBatch::try_new(schema.clone(), vec![Arc::new(array)]).unwrap()
    }

    #[test]
    fn widths_cover_header_and_values() {
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new(
            "col1",
            DataType::Utf8,
            true,
        )]));
        let batch = batch(&schema, &["goodbye", "hello"]);
        let mut out = Vec::new();
        write_batches(&mut out, &schema, &[batch]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "+---------+\n\
             | col1    |\n\
             +---------+\n\
             | goodbye |\n\
             | hello   |\n\
             +---------+\n\
             \n"
        );
    }

    #[test]
    fn empty_header_name_renders_blank_cell() {
        let schema: SchemaRef =
            Arc::new(Schema::new(vec![Field::new("", DataType::Utf8, true)]));
        let batch = batch(&schema, &["1"]);
        let mut out = Vec::new();
        write_batches(&mut out, &schema, &[batch]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "+---+\n|   |\n+---+\n| 1 |\n+---+\n\n"
        );
    }

    #[test]
    fn zero_rows_still_draws_borders() {
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new(
            "col1",
            DataType::Utf8,
            true,
        )]));
        let mut out = Vec::new();
        write_batches(&mut out, &schema, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "+------+\n| col1 |\n+------+\n+------+\n\n"
        );
    }

    #[test]
    fn rows_keep_emission_order_across_batches() {
        let schema: SchemaRef =
            Arc::new(Schema::new(vec![Field::new("c", DataType::Utf8, true)]));
        let first = batch(&schema, &["z"]);
        let second = batch(&schema, &["a"]);
        let mut out = Vec::new();
        write_batches(&mut out, &schema, &[first, second]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "+---+\n| c |\n+---+\n| z |\n| a |\n+---+\n\n"
        );
    }
}
