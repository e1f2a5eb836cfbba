//! spicegen - resolve subject types of a compiled SpiceDB schema
//!
//! Reads the compiled schema graph as JSON, resolves every relation and
//! permission, and writes the resolved schema as JSON for the code emitter.
//! Nothing is written unless the whole schema resolves.

use anyhow::{Context, Result};
use clap::Parser;
use spicegen::pipeline::load_compiled;
use spicegen::SpicegenConfig;
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info};

/// spicegen CLI
#[derive(Parser)]
#[command(name = "spicegen")]
#[command(about = "Resolve allowed subject types for a compiled SpiceDB schema")]
#[command(version)]
struct Cli {
    /// Compiled schema graph (JSON)
    #[arg(long, default_value = "schema.json")]
    schema_file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, env = "SPICEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Skip members whose name starts with this prefix (overrides config)
    #[arg(long)]
    ignore_prefix: Option<String>,

    /// Maximum subject-relation hops followed from a permission (overrides config)
    #[arg(long)]
    max_indirection_depth: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout may carry the schema
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(cli) {
        error!("{:#}", err);
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = SpicegenConfig::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => SpicegenConfig::default(),
    };

    // Apply CLI overrides
    if let Some(prefix) = cli.ignore_prefix {
        config.output.ignore_prefix = prefix;
    }
    if let Some(depth) = cli.max_indirection_depth {
        config.resolver.max_indirection_depth = Some(depth);
    }

    config.validate()?;

    let compiled = load_compiled(&cli.schema_file)
        .with_context(|| format!("Failed to read compiled schema {}", cli.schema_file.display()))?;
    info!(
        definitions = compiled.object_definitions.len(),
        caveats = compiled.caveat_definitions.len(),
        "Loaded compiled schema from {:?}",
        cli.schema_file
    );

    let schema = config
        .schema_builder()
        .build(&compiled)
        .context("Failed to resolve schema")?;

    let mut rendered = if config.output.pretty {
        serde_json::to_string_pretty(&schema)?
    } else {
        serde_json::to_string(&schema)?
    };
    rendered.push('\n');

    match &cli.output_path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write output {}", path.display()))?;
            info!("Wrote resolved schema to {:?}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
