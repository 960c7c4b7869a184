//! Zipline CLI

mod demo;
mod server;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zipline_config::{Config, LogFormat};

#[derive(Parser)]
#[command(name = "zipline")]
#[command(about = "Gzip middleware demo server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo routes behind the gzip middleware
    Serve {
        /// Path to configuration file (defaults are used when omitted)
        #[arg(short, long, env = "ZIPLINE_CONFIG")]
        config: Option<PathBuf>,

        /// Listen address, overrides `server.listen`
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Log level or filter directive, overrides `logging.level`
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "zipline.yaml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            log_level,
        } => {
            let mut config = match config {
                Some(path) => load(&path)?,
                None => Config::default(),
            };
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if let Some(level) = log_level {
                config.logging.level = level;
            }

            init_tracing(&config.logging.level, config.logging.format)?;

            tracing::info!(
                listen = %config.server.listen,
                gzip = config.gzip.enabled,
                level = %config.gzip.level,
                min_length = config.gzip.min_length,
                "Configuration loaded"
            );

            let engine = demo::engine(&config.gzip)?;
            server::run(config.server.listen, engine).await?;

            tracing::info!("Server stopped");
            Ok(())
        }

        Commands::Validate { config: path } => {
            init_tracing("warn", LogFormat::Text)?;

            match zipline_config::load(&path) {
                Ok(cfg) => {
                    println!("✓ Configuration is valid: {}", path.display());
                    println!("  Listen: {}", cfg.server.listen);
                    println!("  Gzip: {}", if cfg.gzip.enabled { "enabled" } else { "disabled" });
                    println!("  Level: {}", cfg.gzip.level);
                    println!("  Min length: {}", cfg.gzip.min_length);
                    println!("  Excluded extensions: {}", cfg.gzip.excluded_extensions.len());
                    println!("  Excluded paths: {}", cfg.gzip.excluded_paths.len());
                    println!("  Excluded path regexes: {}", cfg.gzip.excluded_path_regexes.len());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Zipline");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Config> {
    zipline_config::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))
}

// RUST_LOG wins over the configured level when set.
fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{level}'"))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    Ok(())
}
