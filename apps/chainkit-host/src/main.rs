use anyhow::{Context, Result};
use chainkit::{Core, CoreProvider};
use chainkit_bootstrap::runner::{self, RunOptions, ShutdownOptions};
use chainkit_bootstrap::{AppConfig, CliArgs};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use serde_json::json;
use std::path::PathBuf;

mod registered_modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// ChainKit host - composes the linked modules into one core
#[derive(Parser)]
#[command(name = "chainkit-host")]
#[command(about = "ChainKit host - composes the linked modules into one core")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every module and wait for Ctrl+C / SIGTERM
    Run,
    /// Register modules, apply config values, print the result and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (CHAINKIT__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    if cli.verbose > 0 {
        // Module loggers filter on the core key, not on the subscriber.
        let level = if cli.verbose == 1 { "debug" } else { "verbose" };
        config.values.insert("logLevel".to_string(), json!(level));
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    chainkit_bootstrap::init_logging(&logging_config, &config.home_dir());

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    tracing::info!(home_dir = %config.host.home_dir, "ChainKit host starting");
    let core = CoreProvider::global().get_default();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            runner::run(RunOptions {
                core,
                app: config,
                shutdown: ShutdownOptions::Signals,
            })
            .await
        }
        Commands::Check => check(&core, &config),
    }
}

fn check(core: &Core, config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration…");
    runner::compose(core, config)?;

    println!("Configuration is valid");
    println!("modules:");
    for name in core.module_names() {
        println!("  - {name}");
    }
    println!("keys:");
    let snapshot = core
        .config()
        .snapshot()
        .context("Failed to read config values")?;
    for (key, value) in snapshot {
        println!("  {key}: {value}");
    }
    Ok(())
}
