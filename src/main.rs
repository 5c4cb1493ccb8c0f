//! tunefetch - lossless track acquisition from a music catalog.
//!
//! Looks tracks up in the Spotify catalog, acquires the audio from Tidal,
//! Amazon Music or Qobuz (falling back between them), publishes the file
//! into the music library, and tags it with lyrics and high-resolution
//! artwork.

pub mod acquire;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod endpoints;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod manifest;
pub mod metadata;
pub mod model;
pub mod progress;
pub mod resolver;
pub mod services;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // RUST_LOG wins over the default level
    let default_level = if args.verbose { "tunefetch=debug" } else { "tunefetch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
