//! Command-line interface for tunefetch.
//!
//! Subcommands download tracks, albums and playlists, check the external
//! tools tunefetch relies on, and manage the config file.

mod commands;

pub use commands::{Cli, Commands, run_command};
