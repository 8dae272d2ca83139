mod backend;
mod cli;
mod commands;
mod output;

use clap::Parser;
use roster::Instance;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("roster=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_json_flag(cli.json);
    let config = backend::load_config(&cli.backend_config).await?;
    let backend_box = backend::create_backend(&cli.backend_config).await?;
    tracing::debug!("Opened {}", backend::backend_label(&cli.backend_config));

    let instance = Instance::open(backend_box, config);

    let result = match &cli.command {
        Commands::Account(command) => commands::account::run(&instance, command, format).await,
        Commands::Files(command) => commands::files::run(&instance, command, format).await,
        Commands::Privileges(command) => {
            commands::privileges::run(&instance, command, format).await
        }
        Commands::Stats(command) => commands::stats::run(&instance, command, format).await,
    };

    // A failed command may still have written partial changes; save them
    // so the JSON file matches what the backend saw.
    if let Err(e) = backend::persist(&instance, &cli.backend_config).await {
        tracing::error!("Failed to save database: {e}");
        if result.is_ok() {
            return Err(e);
        }
    }

    result
}
