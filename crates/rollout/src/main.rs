mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{Context, EXIT_INTERRUPTED};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rollout")]
#[command(version)]
#[command(about = "Deploy every service in rollout.kdl, in order, to every region", long_about = None)]
struct Cli {
    /// Path to rollout.kdl (default: ROLLOUT_REGISTRY_PATH, then upward search)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the deployment pipeline (default)
    Deploy {
        /// Deploy a single service
        #[arg(short = 'n', long)]
        service: Option<String>,
    },
    /// Restart or redeploy unreachable services
    Recover {
        /// Recover a single service
        #[arg(short = 'n', long)]
        service: Option<String>,
    },
    /// Report the healthy share of services (exit 0 / 1 / 2)
    Monitor,
    /// Check the registry and every service directory without deploying
    Validate,
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let command = cli.command.unwrap_or(Commands::Deploy { service: None });

    match command {
        Commands::Deploy { service } => {
            let ctx = Context::load(cli.registry, service.as_deref())?;
            commands::deploy::handle(ctx).await
        }
        Commands::Recover { service } => {
            let ctx = Context::load(cli.registry, service.as_deref())?;
            commands::recover::handle(ctx).await
        }
        Commands::Monitor => {
            let ctx = Context::load(cli.registry, None)?;
            commands::monitor::handle(ctx).await
        }
        Commands::Validate => {
            let ctx = Context::load(cli.registry, None)?;
            commands::validate::handle(ctx).await
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Dropping the run on interrupt kills any child process still attached to it
    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                commands::error_exit_code(&e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!("{}", "Interrupted; re-run to start again from the top".yellow());
            EXIT_INTERRUPTED
        }
    };

    std::process::exit(code);
}
