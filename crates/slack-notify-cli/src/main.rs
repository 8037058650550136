//! slack-notify - Concourse resource entrypoint
//!
//! Installed as `/opt/resource/{check,in,out}`; the verb is taken from the
//! executable name unless `--cmd` is given.
//!
//! ## Verbs
//!
//! - `check`: no versions to discover
//! - `in <destination>`: echo the requested version
//! - `out <source>`: post the build notification to Slack

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use slack_notify_core::{init_tracing, Resource};
use tracing::{debug, Level};

#[derive(Parser, Debug)]
#[command(name = "slack-notify")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concourse resource posting build notifications to Slack", long_about = None)]
struct Cli {
    /// Resource verb: check, in, out (default: executable name)
    #[arg(long)]
    cmd: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Arguments for the verb (destination or source directory)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn verb(&self, program: &str) -> String {
        match &self.cmd {
            Some(cmd) => cmd.clone(),
            None => Path::new(program)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let program = std::env::args().next().unwrap_or_default();

    match run(&cli, &program).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, program: &str) -> Result<()> {
    let verb = cli.verb(program);
    debug!(verb = %verb, args = ?cli.args, "dispatching");

    Resource::new()
        .exec(
            &verb,
            &cli.args,
            std::io::stdin().lock(),
            std::io::stdout().lock(),
        )
        .await
        .with_context(|| format!("{verb} failed"))
}
