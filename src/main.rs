use clap::Parser;
use forumrouter::cli::{run_cli, Cli};
use forumrouter::telemetry::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging(&LogConfig::from_env())?;
    run_cli(Cli::parse())
}
