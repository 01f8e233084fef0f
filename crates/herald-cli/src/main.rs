//! Herald - Concourse resource reporting build state to GitHub and Google Chat
//!
//! A single executable installed as `/opt/resource/{check,in,out}`; the name
//! it is invoked as selects the protocol step.
//!
//! - `check`: validate `source`, emit a placeholder version
//! - `in`: validate `source`, echo the requested version
//! - `out`: report `params.state` for the repository under the working root
//!
//! The request is read from stdin, the response is written to stdout, logs
//! go to stderr.

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{info, warn, Level};

use herald_core::{BuildEnvironment, ProdPutter, Settings, Step};

#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concourse resource reporting build state to GitHub and Google Chat", long_about = None)]
struct Cli {
    /// Emit JSON-formatted log lines
    #[arg(long, env = "HERALD_LOG_JSON")]
    log_json: bool,

    /// Arguments passed by Concourse; for `in` and `out`, the working directory
    args: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("herald: error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let arg0 = std::env::args().next().unwrap_or_default();
    let step = invoked_step(&arg0)?;

    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .map_err(|e| anyhow!("reading stdin: {e}"))?;

    let log_level = peek_log_level(&input)?;
    let level = herald_core::parse_log_level(&log_level);
    herald_core::init_tracing(level.unwrap_or(Level::INFO), cli.log_json);
    if level.is_none() {
        warn!(log_level = %log_level, "unknown log_level, using info");
    }
    info!(event = "herald.start", build = %herald_core::build_info(), step = %step);

    let mut stdout = std::io::stdout().lock();
    match step {
        Step::Check => herald_core::check(&input, &mut stdout)?,
        Step::Get => herald_core::get(&input, &mut stdout)?,
        Step::Put => {
            let settings = Settings::from_env();
            let env = BuildEnvironment::from_env();
            let mut putter = ProdPutter::new(settings, env);
            herald_core::put(&mut putter, &input, &mut stdout, &cli.args).await?;
        }
    }
    Ok(())
}

/// Map the basename of argv[0] to a protocol step.
fn invoked_step(arg0: &str) -> Result<Step> {
    let name = Path::new(arg0)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match Step::from_invoked_name(&name) {
        Some(step) => Ok(step),
        None => bail!("invoked as '{name}'; want: one of [check in out]"),
    }
}

/// Extract `source.log_level` before the request is validated, so that
/// validation itself can be logged at the requested level.
fn peek_log_level(input: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(input)
        .map_err(|e| anyhow!("peeking into JSON for log_level: {e}"))?;
    let level = value
        .get("source")
        .and_then(|source| source.get("log_level"))
        .and_then(Value::as_str)
        .filter(|level| !level.is_empty())
        .unwrap_or("info");
    Ok(level.to_string())
}
