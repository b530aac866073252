//! Resolves component inputs from a JSON file and prints the resolved tables.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use beanmeta_core::{AccessTimeout, ComponentInput};
use beanmeta_resolver::{DescriptorBuilder, DescriptorRegistry, ResolverConfig, ValidationMode};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "beanmeta-resolve")]
#[command(about = "Resolve component metadata into per-operation descriptor tables", long_about = None)]
struct Cli {
    /// JSON file holding one component input or an array of them
    input: PathBuf,

    /// Collect configuration errors instead of stopping at the first one
    #[arg(long, env = "BEANMETA_LENIENT")]
    lenient: bool,

    /// Default access timeout of singleton components, in milliseconds
    #[arg(long, env = "BEANMETA_SINGLETON_TIMEOUT_MS", default_value_t = 300_000)]
    singleton_timeout_ms: u64,

    /// Default access timeout of stateful components, in milliseconds (unbounded if unset)
    #[arg(long, env = "BEANMETA_STATEFUL_TIMEOUT_MS")]
    stateful_timeout_ms: Option<u64>,

    /// Parameter type accepted by one-arg scheduled callbacks
    #[arg(long, env = "BEANMETA_SCHEDULE_CONTEXT_TYPE", default_value = "Timer")]
    schedule_context_type: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Cli {
    fn config(&self) -> ResolverConfig {
        ResolverConfig {
            validation_mode: if self.lenient {
                ValidationMode::Lenient
            } else {
                ValidationMode::Strict
            },
            stateful_access_timeout: self
                .stateful_timeout_ms
                .map_or(AccessTimeout::Unbounded, AccessTimeout::Millis),
            singleton_access_timeout: AccessTimeout::Millis(self.singleton_timeout_ms),
            schedule_context_type: self.schedule_context_type.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Many(Vec<ComponentInput>),
    One(Box<ComponentInput>),
}

impl InputFile {
    fn into_inputs(self) -> Vec<ComponentInput> {
        match self {
            Self::Many(inputs) => inputs,
            Self::One(input) => vec![*input],
        }
    }
}

fn init_logging(format: LogFormat) {
    // Logs go to stderr; stdout carries the resolved tables.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let raw = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let inputs = serde_json::from_str::<InputFile>(&raw)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?
        .into_inputs();

    let builder = DescriptorBuilder::new(cli.config());
    let registry = DescriptorRegistry::new();
    let reports = registry.resolve_module(&builder, &inputs);

    let results: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| match &report.result {
            Ok(errors) => serde_json::json!({
                "component": report.component,
                "table": registry.get(&report.component).as_deref(),
                "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
            Err(err) => serde_json::json!({
                "component": report.component,
                "failed": err.to_string(),
                "kind": err.kind().to_string(),
            }),
        })
        .collect();

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &results).context("failed to write results")?;
    writeln!(out)?;

    let failed = reports.iter().filter(|r| !r.is_published()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} components failed to resolve", reports.len());
    }
    Ok(())
}
