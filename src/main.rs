use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, trace};

use checadoc::cli::{execute_command, get_log_level, Cli, CommandContext};
use checadoc::config::CheckConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CheckConfig::load(cli.config.as_deref()).context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    let log_level = get_log_level(cli.verbose, config.log_level.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("checadoc started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let ctx = CommandContext {
        config,
        json: cli.json,
    };

    if let Err(e) = execute_command(cli.command, &ctx).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
