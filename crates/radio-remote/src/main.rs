//! `radio-remote`: drive a single-button station player from stdin.
//!
//! Each input line is a button signal (`down 1`, `up 1`, `click 1`, `long 1`)
//! or a control command (`stop`, `status`, `quit`). Status lines go to stdout,
//! logs to stderr.

use anyhow::Result;
use clap::Parser;
use radio_remote::{cli, runtime};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    let default_filter = if args.verbose {
        "debug"
    } else {
        "info,radio_remote=info,station_player=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    runtime::run(&args)
}
