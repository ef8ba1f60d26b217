use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

mod console;

use console::Command;
use embedmpv::utils::config::{Config, EngineKind};
use embedmpv::utils::load_config;
use embedmpv::PlayerSessionController;

/// embedmpv - drive an embedded mpv playback session from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Media file to load after initialization
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Configuration file (replaces the system/user files)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Engine backend
    #[arg(short, long, value_enum)]
    engine: Option<EngineKind>,

    /// mpv executable for the mpv-ipc backend
    #[arg(long, value_name = "PATH")]
    mpv_binary: Option<PathBuf>,

    /// Command timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_config().context("Failed to load configuration")?,
    };
    apply_args(&mut config, &args);
    config.validate()?;

    let log_level = if args.debug {
        "debug"
    } else {
        config.general.log_level.as_str()
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting embedmpv v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    let session = PlayerSessionController::from_config(&config)?;

    // Print every status event as it arrives
    let mut events = session.status().subscribe();
    tokio::spawn(async move {
        while events.changed().await.is_ok() {
            if let Some(event) = events.borrow_and_update().clone() {
                println!("{}", event);
            }
        }
    });

    if let Some(file) = &args.file {
        // Failures are already on the status line; keep the console usable
        match session.initialize().await {
            Ok(()) => {
                if let Err(e) = session.load_media(file.to_string_lossy()).await {
                    debug!("Loading {} failed: {}", file.display(), e);
                }
            }
            Err(e) => debug!("Initialization failed: {}", e),
        }
    }

    println!("{}", console::HELP);
    run_console(&session, config.speed.step).await?;

    info!("Shutting down");
    Ok(())
}

/// Command-line flags take precedence over every configuration layer
fn apply_args(config: &mut Config, args: &Args) {
    if let Some(kind) = args.engine {
        config.engine.kind = kind;
    }
    if let Some(binary) = &args.mpv_binary {
        config.engine.mpv.binary = binary.clone();
    }
    if let Some(timeout) = args.timeout_ms {
        config.engine.command_timeout_ms = timeout;
    }
}

async fn run_console(session: &PlayerSessionController, step: f64) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let command = match console::parse(&line, step) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Intent(intent) => {
                let name = intent.name();
                if let Err(e) = session.dispatch(intent).await {
                    debug!("{} failed: {}", name, e);
                }
            }
            Command::Status => {
                let snapshot = session.snapshot();
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Command::Presets => {
                let presets: Vec<String> = session
                    .presets()
                    .as_slice()
                    .iter()
                    .map(|p| format!("{:.2}x", p))
                    .collect();
                println!("{}", presets.join("  "));
            }
            Command::Help => println!("{}", console::HELP),
            Command::Quit => break,
        }
    }

    Ok(())
}
