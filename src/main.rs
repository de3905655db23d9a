use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use feedbot::{Config, Syncer};

#[derive(Parser)]
#[command(name = "feedbot")]
#[command(about = "Relays an RSS feed into a Telegram channel", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Sync once and exit
    #[arg(long)]
    once: bool,
}

fn load_config(path: &Path) -> feedbot::Result<Config> {
    let config = match Config::load_with_env(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            eprintln!("Using default configuration with environment overrides.");
            let mut config = Config::default();
            config.apply_env_overrides()?;
            config
        }
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = feedbot::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feedbot::logging::init_console_only(&config.logging.level);
    }

    info!("feedbot {}", env!("CARGO_PKG_VERSION"));

    let mut syncer = match Syncer::from_config(&config).await {
        Ok(syncer) => syncer,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    if cli.once {
        return match syncer.run_once(&cancel).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) if e.is_cancelled() => ExitCode::SUCCESS,
            Err(e) => {
                error!("Sync failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let (trigger_tx, trigger_rx) = mpsc::channel(1);
    spawn_trigger_listener(trigger_tx);

    syncer.run(&cancel, trigger_rx).await;
    ExitCode::SUCCESS
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, shutting down"),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
        cancel.cancel();
    });
}

/// Sync out of schedule on SIGHUP.
#[cfg(unix)]
fn spawn_trigger_listener(trigger: mpsc::Sender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                error!("Failed to install SIGHUP handler: {}", e);
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("Received SIGHUP");
            // A pending trigger already covers this one.
            let _ = trigger.try_send(());
        }
    });
}

#[cfg(not(unix))]
fn spawn_trigger_listener(_trigger: mpsc::Sender<()>) {}
