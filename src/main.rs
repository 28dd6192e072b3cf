//! # Derivative Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione e override da CLI/env
//! - Avvio del workflow su uno o più target
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (sottocomando, config, verbose)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` vince)
//! 3. Carica la config dal file (default se assente) e applica `OPTIMIZER_API_KEY`
//! 4. `optimize`: esegue il workflow in sequenza su ogni target
//!
//! Un'ottimizzazione fallita non cambia l'exit code: il file resta quello originale.
//!
//! ## Esempio di utilizzo:
//! ```bash
//! derivative-optimizer init --api-key abc123 --mode lossy
//! derivative-optimizer optimize /var/www/files/styles/thumbnail --verbose
//! derivative-optimizer optimize public://styles/large/photo.jpg --dry-run
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use derivative_optimizer::{
    BatchOptimizer, CompressionMode, Config, LocalFileService, ReqwestHttpService, Workflow,
};

#[derive(Parser)]
#[command(name = "derivative-optimizer")]
#[command(about = "Replace derivative images with their remotely optimized versions")]
struct Args {
    /// Configuration file (default: <config dir>/derivative-optimizer/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize files, directories or logical URIs (scheme://path), one at a time
    Optimize {
        /// Targets to optimize
        #[arg(required = true)]
        targets: Vec<String>,

        /// Compression mode (overrides the config file)
        #[arg(short, long, value_enum)]
        mode: Option<CompressionMode>,

        /// API key (overrides the config file and environment)
        #[arg(long)]
        api_key: Option<String>,

        /// Upload and poll, but never download or replace anything
        #[arg(long)]
        dry_run: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Write a configuration file
    Init {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(short, long, value_enum, default_value = "glossy")]
        mode: CompressionMode,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check that the configuration is ready for use
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    match args.command {
        Command::Optimize {
            targets,
            mode,
            api_key,
            dry_run,
            no_progress,
        } => {
            let mut config = Config::from_file(&config_path).await?;
            config.apply_env();
            if let Some(key) = api_key {
                config.api_key = key;
            }
            if let Some(mode) = mode {
                config.compression_type = mode;
            }

            let files = match config.temp_dir.clone() {
                Some(dir) => LocalFileService::new(dir),
                None => LocalFileService::default(),
            };
            let workflow = Workflow::new(&config, ReqwestHttpService::new(), files).with_dry_run(dry_run);
            let batch = BatchOptimizer::new(workflow).with_progress(!no_progress);
            batch.run(&targets).await;
        }
        Command::Init {
            api_key,
            mode,
            force,
        } => {
            if config_path.exists() && !force {
                return Err(anyhow::anyhow!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                ));
            }
            let config = Config {
                api_key: api_key.unwrap_or_default(),
                compression_type: mode,
                ..Default::default()
            };
            config.save_to_file(&config_path).await?;
            info!("Wrote configuration to {}", config_path.display());
        }
        Command::Check => {
            let mut config = Config::from_file(&config_path).await?;
            config.apply_env();
            config.check_ready()?;
            info!(
                "✅ Configuration ready: {} compression, endpoint {}",
                config.compression_type,
                config.upload_endpoint()
            );
        }
    }

    Ok(())
}
