use anyhow::Result;
use clap::Parser;

use temple_voice::{
    app::{load_config, load_config_from},
    cli::{handle_command, Cli},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // An explicit file replaces the global and local config layers
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    handle_command(cli.command, config).await
}
