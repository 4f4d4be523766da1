use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "shardwatch",
    about = "Shardwatch — task health verdicts for cluster jobs",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Health check configuration (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed task snapshots (one JSON object per line) through the adaptive
    /// checker and print one verdict per snapshot.
    Replay {
        /// Snapshot file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Probe a single health endpoint once.
    Probe {
        /// Host running the task
        #[arg(long)]
        host: String,
        /// Health port
        #[arg(long)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shardwatch=info".parse()?)
        )
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay { input, format } => {
            commands::replay::replay(&config, &input, &format).await
        }
        Commands::Probe { host, port } => {
            commands::probe::probe(&config, &host, port).await
        }
    }
}
