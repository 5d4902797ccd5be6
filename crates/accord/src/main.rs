//! CLI entry point for resolving Accord deployment configuration.
//!
//! Loads the built-in application schema, reads the layers given on
//! the command line (lowest precedence first, optionally topped by an
//! environment-variable layer), resolves once, and prints the redacted
//! view. Exit codes distinguish the failure classes so operators can
//! tell bad deployment input from a bad schema or an unreachable
//! source: 0 success, 10 schema error, 11 source read error, 12 merge
//! conflict, 13 validation failure.

use accord_config::{
    ConfigError, DEFAULT_ENV_PREFIX, EnvSource, FileSource, Layer, Snapshot, resolve, schema,
};
use anyhow::{Context, bail};
use clap::Parser;
use log::debug;
use serde_json::json;

const EXIT_USAGE: i32 = 1;
const EXIT_SCHEMA: i32 = 10;
const EXIT_SOURCE: i32 = 11;
const EXIT_CONFLICT: i32 = 12;
const EXIT_VALIDATION: i32 = 13;

/// Resolve and validate Accord configuration layers.
#[derive(Debug, Parser)]
#[command(name = "accord", version, about)]
struct Cli {
    /// Configuration layers as name=path, lowest precedence first.
    layers: Vec<String>,

    /// Append a highest-precedence layer from prefixed environment variables.
    #[arg(long)]
    env: bool,

    /// Environment variable prefix used with --env.
    #[arg(long, default_value = DEFAULT_ENV_PREFIX)]
    env_prefix: String,

    /// Print the redacted view (or the failure report) as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    env_logger::init();
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let registry = match schema::application() {
        Ok(registry) => registry,
        Err(err) => return report_failure(&ConfigError::Schema(err), cli.json),
    };

    let mut layers = Vec::new();
    for (rank, arg) in cli.layers.iter().enumerate() {
        let (name, path) = match parse_layer_arg(arg) {
            Ok(parts) => parts,
            Err(err) => {
                eprintln!("{err:#}");
                return EXIT_USAGE;
            }
        };
        let source = FileSource::new(name, path);
        match Layer::load(rank as i32, &source) {
            Ok(layer) => layers.push(layer),
            Err(err) => return report_failure(&ConfigError::Source(err), cli.json),
        }
    }

    if cli.env {
        let source = EnvSource::from_process("env", &cli.env_prefix);
        match Layer::load(layers.len() as i32, &source) {
            Ok(layer) => layers.push(layer),
            Err(err) => return report_failure(&ConfigError::Source(err), cli.json),
        }
    }
    debug!("loaded {} layer(s)", layers.len());

    match resolve(&registry, &layers) {
        Ok(snapshot) => {
            print_snapshot(&snapshot, cli.json);
            0
        }
        Err(err) => report_failure(&err, cli.json),
    }
}

/// Split a `name=path` layer argument.
fn parse_layer_arg(arg: &str) -> anyhow::Result<(&str, &str)> {
    let (name, path) = arg
        .split_once('=')
        .with_context(|| format!("invalid layer argument \"{arg}\": expected name=path"))?;
    if name.is_empty() || path.is_empty() {
        bail!("invalid layer argument \"{arg}\": name and path must be non-empty");
    }
    Ok((name, path))
}

/// Print the redacted view; secrets never reach stdout in the clear.
fn print_snapshot(snapshot: &Snapshot, as_json: bool) {
    let view = snapshot.redacted();
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).expect("redacted view serializes")
        );
    } else {
        for (key, value) in &view {
            println!("{key} = {value}");
        }
    }
}

/// Report a failure and pick its exit code.
fn report_failure(err: &ConfigError, as_json: bool) -> i32 {
    if as_json {
        let report = match err {
            ConfigError::Conflict(conflicts) => json!({
                "error": "conflict",
                "conflicts": conflicts,
            }),
            ConfigError::Validation(violations) => json!({
                "error": "validation",
                "violations": violations,
            }),
            ConfigError::Schema(inner) => json!({
                "error": "schema",
                "message": inner.to_string(),
            }),
            ConfigError::Source(inner) => json!({
                "error": "source",
                "message": inner.to_string(),
            }),
        };
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&report).expect("report serializes")
        );
    } else {
        eprintln!("{err}");
    }
    match err {
        ConfigError::Schema(_) => EXIT_SCHEMA,
        ConfigError::Source(_) => EXIT_SOURCE,
        ConfigError::Conflict(_) => EXIT_CONFLICT,
        ConfigError::Validation(_) => EXIT_VALIDATION,
    }
}
