//! `check` and `sources` command implementations

use crate::Format;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};
use varconf::{
    resolve, ConfigLoader, Context, DeclarationTable, Kind, Origin, ParseError, ResolveError,
    ResolvedConfiguration, Rule, Value,
};

/// A variable named on the command line as `KEY[:type]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    pub key: String,
    pub kind: Kind,
}

impl FromStr for VariableSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, kind) = match s.split_once(':') {
            Some((key, kind)) => (key, kind.parse::<Kind>()?),
            None => (s, Kind::default()),
        };
        if key.is_empty() {
            return Err(format!("Missing variable name in '{}'", s));
        }
        Ok(Self {
            key: key.to_string(),
            kind,
        })
    }
}

/// Build a table from the required, optional and production variables, in that order.
pub fn declaration_table(
    require: &[VariableSpec],
    optional: &[VariableSpec],
    production: &[VariableSpec],
) -> DeclarationTable<Option<Value>> {
    let mut table = DeclarationTable::new();
    for spec in require {
        table.insert(spec.key.clone(), spec.kind.declare(Rule::Default, true));
    }
    for spec in optional {
        table.insert(spec.key.clone(), spec.kind.declare(Rule::Default, false));
    }
    for spec in production {
        table.insert(spec.key.clone(), spec.kind.declare(Rule::Production, true));
    }
    table
}

#[derive(Serialize)]
struct CheckReport<'a> {
    context: Context,
    files: &'a [PathBuf],
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'a ResolvedConfiguration<Option<Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [ParseError]>,
}

/// Resolve `table` and print the outcome. Returns whether resolution succeeded.
pub fn check(
    loader: &ConfigLoader,
    table: &DeclarationTable<Option<Value>>,
    format: Format,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let sources = loader.sources()?;
    debug!(variables = table.len(), context = %sources.context, "Checking variables");

    let result = resolve(
        table,
        &sources.environment,
        &sources.file,
        sources.context,
    );

    let (values, errors) = match &result {
        Ok(values) => (Some(values), None),
        Err(ResolveError::Combined(combined)) => (None, Some(combined.errors())),
        Err(ResolveError::Parser { key, source }) => {
            anyhow::bail!("Parser for {} failed: {}", key, source)
        }
    };

    match format {
        Format::Json => {
            let report = CheckReport {
                context: sources.context,
                files: &sources.files_read,
                values,
                errors,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Format::Text => {
            writeln!(out, "context: {}", sources.context)?;
            for path in &sources.files_read {
                writeln!(out, "file: {}", path.display())?;
            }
            if let Some(values) = values {
                for (key, value) in values.iter() {
                    match (value, values.origin(key)) {
                        (Some(value), Some(origin)) => {
                            writeln!(out, "{}={} ({})", key, value, origin)?
                        }
                        _ => writeln!(out, "{}=<unset>", key)?,
                    }
                }
            }
            if let Some(errors) = errors {
                writeln!(
                    out,
                    "There were {} errors while parsing.",
                    errors.len()
                )?;
                for error in errors {
                    writeln!(out, "  {}", error)?;
                }
            }
        }
    }

    match &result {
        Ok(_) => info!(variables = table.len(), "All variables resolved"),
        Err(err) => info!(error = %err, "Variables failed to resolve"),
    }
    Ok(result.is_ok())
}

#[derive(Serialize)]
struct SourcesReport<'a> {
    context: Context,
    files: &'a [PathBuf],
    variables: BTreeMap<&'a str, &'a str>,
    environment: Vec<&'a str>,
}

/// Print the merged file source, the files read and the context.
///
/// Environment variables that shadow file keys are listed by name only.
pub fn sources(loader: &ConfigLoader, format: Format, out: &mut impl Write) -> anyhow::Result<()> {
    let sources = loader.sources()?;
    let keys = sources.file.sorted_keys();
    let shadowed: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|key| sources.environment.contains(key))
        .collect();

    match format {
        Format::Json => {
            let report = SourcesReport {
                context: sources.context,
                files: &sources.files_read,
                variables: sources.file.iter().collect(),
                environment: shadowed,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Format::Text => {
            writeln!(out, "context: {}", sources.context)?;
            for path in &sources.files_read {
                writeln!(out, "file: {}", path.display())?;
            }
            for key in &keys {
                let Some(value) = sources.file.get(key) else {
                    continue;
                };
                let origin = if shadowed.contains(key) {
                    Origin::Environment
                } else {
                    Origin::File
                };
                writeln!(out, "{}={} ({})", key, value, origin)?;
            }
        }
    }
    Ok(())
}
