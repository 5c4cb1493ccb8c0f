//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `download`: catalog lookup and the per-track acquisition loop
//! - `tools`: encoder and credential checks
//! - `settings`: config file inspection and initialisation

mod download;
mod settings;
mod tools;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::model::Service;

pub use download::{DownloadArgs, cmd_download};
pub use settings::cmd_config;
pub use tools::cmd_check_tools;

/// tunefetch CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download a track, album or playlist (Spotify URL, URI or ISRC)
    #[command(visible_alias = "dl")]
    Download {
        /// Spotify link, spotify: URI or bare ISRC
        url: String,
        /// Service to try first (tidal, amazon, qobuz)
        #[arg(short, long)]
        service: Option<Service>,
        /// Quality for the chosen service (Tidal tier or Qobuz format id)
        #[arg(short, long)]
        quality: Option<String>,
        /// Output directory
        #[arg(short, long, env = "TUNEFETCH_OUTPUT_DIR")]
        output: Option<PathBuf>,
        /// Don't embed lyrics
        #[arg(long)]
        no_lyrics: bool,
        /// Don't embed the high-resolution cover
        #[arg(long)]
        no_cover_max: bool,
    },
    /// Check that ffmpeg and catalog credentials are available
    CheckTools,
    /// Show the effective configuration
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = crate::config::load();

    match &cli.command {
        Commands::Download {
            url,
            service,
            quality,
            output,
            no_lyrics,
            no_cover_max,
        } => {
            let rt = Runtime::new()?;
            let args = DownloadArgs {
                url: url.clone(),
                service: *service,
                quality: quality.clone(),
                output: output.clone(),
                lyrics: !no_lyrics,
                cover_max: !no_cover_max,
            };
            cmd_download(&rt, &config, &args)
        }
        Commands::CheckTools => cmd_check_tools(&config),
        Commands::Config { init } => cmd_config(&config, *init),
    }
}
