//! Binary crate for the `skycast` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - The interactive prompt loop
//! - Human-friendly output formatting

use clap::Parser;

mod cli;
mod interactive;
mod view;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cmd = cli::Cli::parse();
    cmd.run().await
}

/// Logs go to stderr so they never interleave with prompts on stdout.
/// `RUST_LOG` overrides the filter; `SKYCAST_LOG_JSON` switches to JSON lines.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("skycast=warn,skycast_core=warn"));

    if std::env::var_os("SKYCAST_LOG_JSON").is_some() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
