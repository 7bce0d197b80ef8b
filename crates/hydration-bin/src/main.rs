//! auth-hydrate - run auth session hydration against a scripted provider.

mod simulate;

use std::path::PathBuf;

use auth_hydration::SingletonRegistry;
use clap::{Parser, Subcommand};
use hydration_config_and_utils::{init_logging, Config, Paths};

/// Auth hydration command-line interface.
#[derive(Parser)]
#[command(name = "auth-hydrate")]
#[command(about = "Run auth session hydration against a scripted session provider")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for the config file. Defaults to ~/.auth-hydration
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Hydrate once against scripted provider timing and print the result
    Simulate(simulate::SimulateArgs),
    /// Print the effective configuration
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config)?;

    match cli.command {
        Commands::Simulate(args) => {
            let report = simulate::run(SingletonRegistry::process(), &config, args).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
