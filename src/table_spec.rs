//! Parser for the table-spec mini-language: `Name=Format:Arg[:Arg...]`.

use crate::error::{HarnessError, Result};

/// Storage formats the harness can ingest. This is a closed set: adding a
/// format means adding a variant here and a provider for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    SsTable,
}

/// One parsed table specification. Immutable once parsed; consumed by the
/// catalog builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub format: TableFormat,
    pub args: Vec<String>,
}

impl TableSpec {
    /// Splits `spec` on the first `=` into a table name and the remainder,
    /// then splits the remainder on `:` into a format tag and its
    /// arguments. Pure; no side effects.
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, rest) = spec.split_once('=').ok_or_else(|| {
            HarnessError::InvalidArgument(format!("table spec '{spec}' is missing '='"))
        })?;
        if name.is_empty() {
            return Err(HarnessError::InvalidArgument(format!(
                "table spec '{spec}' has an empty table name"
            )));
        }

        let mut parts = rest.split(':');
        let tag = parts.next().unwrap_or_default();
        let args: Vec<String> = parts.map(str::to_owned).collect();

        let format = match tag {
            "csv" => TableFormat::Csv,
            "sstable" => TableFormat::SsTable,
            other => {
                return Err(HarnessError::InvalidArgument(format!(
                    "unknown table format '{other}' in spec '{spec}'"
                )))
            }
        };

        let parsed = TableSpec {
            name: name.to_owned(),
            format,
            args,
        };
        parsed.check_arity(spec)?;
        Ok(parsed)
    }

    fn check_arity(&self, raw: &str) -> Result<()> {
        // Both formats currently take exactly one path argument. The
        // two-argument sstable form is reserved and rejected.
        match self.format {
            TableFormat::Csv | TableFormat::SsTable => {
                if self.args.len() != 1 {
                    return Err(HarnessError::InvalidArgument(format!(
                        "table spec '{raw}' expects exactly one path argument, got {}",
                        self.args.len()
                    )));
                }
                if self.args[0].is_empty() {
                    return Err(HarnessError::InvalidArgument(format!(
                        "table spec '{raw}' has an empty path argument"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &str {
        &self.args[0]
    }
}
