use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlharness::{execute_query, ExecuteQueryConfig};

/// One-shot SQL query harness: parse, resolve, explain or execute a query
/// against file-backed tables.
#[derive(Parser, Debug)]
#[command(name = "sqlharness", version, about)]
struct Args {
    /// Stage to run: parse, resolve, explain or execute
    #[arg(long, default_value = "execute")]
    mode: String,

    /// Table definition `Name=Format:Path` (repeatable; formats: csv, sstable)
    #[arg(long = "table-spec")]
    table_specs: Vec<String>,

    /// Descriptor pool source: "none" or a path to a descriptor file
    #[arg(long, default_value = "none")]
    descriptor_pool: String,

    /// SQL text to run
    query: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the query output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlharness=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    debug!("tool arguments: {:?}", args);

    let mut config = ExecuteQueryConfig::new();
    config.set_tool_mode_from_name(&args.mode)?;
    config.set_descriptor_pool_from_source(&args.descriptor_pool)?;
    config.add_tables_from_specs(&args.table_specs)?;

    let mut out = Vec::new();
    execute_query(&args.query, &config, &mut out).await?;
    std::io::stdout().write_all(&out)?;
    Ok(())
}
