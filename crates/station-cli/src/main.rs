//! `station-audio` - command-line entry point for the EAS Station audio core.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "station-audio")]
#[command(author, version, about = "EAS Station audio core", long_about = None)]
struct Cli {
    /// Path to the station configuration file, instead of the platform default.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start ingest, decode, and playout, and block until interrupted.
    Run(commands::run::RunArgs),

    /// Print a point-in-time status snapshot, as JSON.
    Status(commands::status::StatusArgs),

    /// List available audio capture/playback devices.
    Devices(commands::devices::DevicesArgs),

    /// Inject a synthetic alert directly into the playout queue, bypassing
    /// the decoder. For manually exercising playout/precedence/GPIO wiring.
    InjectTestAlert(commands::inject_test_alert::InjectTestAlertArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(station_config::default_config_path);

    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &config_path),
        Commands::Status(args) => commands::status::run(args, &config_path),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::InjectTestAlert(args) => commands::inject_test_alert::run(args, &config_path),
    }
}
