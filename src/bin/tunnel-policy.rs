//! Tunnel Policy CLI
//!
//! Evaluates a policy document against an input document and reports the
//! decision through stdout and the exit code.

use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tunnel_policy::{EngineConfig, PolicyEngine};

#[derive(Parser, Debug)]
#[command(name = "tunnel-policy")]
#[command(about = "Evaluate a tunnel policy against an input document")]
struct Args {
    /// Path to the policy document (JSON)
    #[arg(short = 'p', long)]
    policy: PathBuf,

    /// Path to the input document (JSON), or "-" for stdin
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print the evaluation trace as JSON instead of true/false
    #[arg(long)]
    explain: bool,
}

/// Exit code when the policy does not match
const EXIT_NO_MATCH: u8 = 1;

/// Exit code for I/O, configuration or document errors
const EXIT_ERROR: u8 = 2;

fn read_payload(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading input from stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!("Engine configuration: {:?}", config);

    let engine = PolicyEngine::new(config);
    let policy = read_payload(&args.policy)?;
    let input = read_payload(&args.input)?;

    if args.explain {
        let evaluation = engine.explain(&policy, &input)?;
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(evaluation.matched);
    }

    let matched = engine.validate(&policy, &input);
    println!("{}", matched);
    Ok(matched)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    info!("Evaluating {:?} against {:?}", args.policy, args.input);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NO_MATCH),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
