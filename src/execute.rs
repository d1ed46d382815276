//! Mode dispatch: runs the minimal engine stage prefix for the selected
//! mode, then renders the result.

use std::io::Write;
use std::sync::Arc;

use datafusion::arrow::datatypes::{Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::logical_expr::LogicalPlan;
use datafusion::prelude::{SessionConfig, SessionContext};
use datafusion::sql::parser::Statement;
use tracing::debug;

use crate::config::{ExecuteQueryConfig, ToolMode};
use crate::error::Result;
use crate::format;

/// Intermediate result of the stage prefix a mode runs.
enum ModeResult {
    Parsed(Statement),
    Resolved(LogicalPlan),
    Planned(LogicalPlan),
    Executed {
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    },
}

/// Runs `sql` under the configured mode and writes the rendering to `out`.
/// Nothing is written unless every invoked stage, and the inspection hook
/// when one is set, succeeds.
pub async fn execute_query(
    sql: &str,
    config: &ExecuteQueryConfig,
    out: &mut dyn Write,
) -> Result<()> {
    match dispatch(sql, config).await? {
        ModeResult::Parsed(statement) => format::write_statement(out, &statement),
        ModeResult::Resolved(plan) | ModeResult::Planned(plan) => format::write_plan(out, &plan),
        ModeResult::Executed { schema, batches } => format::write_batches(out, &schema, &batches),
    }
}

async fn dispatch(sql: &str, config: &ExecuteQueryConfig) -> Result<ModeResult> {
    let mode = config.tool_mode();
    debug!("dispatching query in {} mode", mode);

    // One engine session per invocation; a single partition keeps scans
    // sequential and row emission deterministic. Identifier normalization
    // is off so table and column lookups stay case-sensitive.
    let session_config = SessionConfig::new()
        .with_target_partitions(1)
        .set_bool("datafusion.sql_parser.enable_ident_normalization", false);
    let ctx = SessionContext::new_with_config(session_config);
    config.catalog().register_into(&ctx)?;
    let state = ctx.state();

    let statement = state.sql_to_statement(sql, "generic")?;
    if mode == ToolMode::Parse {
        return Ok(ModeResult::Parsed(statement));
    }

    let plan = state.statement_to_plan(statement).await?;
    if let Some(hook) = config.analyzed_plan_hook() {
        hook(&plan)?;
    }
    if mode == ToolMode::Resolve {
        return Ok(ModeResult::Resolved(plan));
    }

    let optimized = state.optimize(&plan)?;
    if mode == ToolMode::Explain {
        return Ok(ModeResult::Planned(optimized));
    }

    let df = ctx.execute_logical_plan(optimized).await?;
    let schema: SchemaRef = Arc::new(Schema::from(df.schema()));
    let batches = df.collect().await?;
    debug!("query produced {} batches", batches.len());
    Ok(ModeResult::Executed { schema, batches })
}
