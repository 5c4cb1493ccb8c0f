//! External tool and credential checks.

use crate::config::{self, Config};
use crate::manifest::Encoder;

/// Check that ffmpeg and catalog credentials are available
pub fn cmd_check_tools(config: &Config) -> anyhow::Result<()> {
    println!("Checking tools...\n");

    let encoder = Encoder::locate(config.tools.ffmpeg.as_deref());
    match encoder.version() {
        Some(version) => println!("✓ ffmpeg: {} ({})", version, encoder.program()),
        None => {
            println!("✗ ffmpeg: NOT FOUND");
            print_ffmpeg_install_instructions();
        }
    }

    println!();
    println!("Spotify credentials:");
    if config.credentials().is_configured() {
        println!("✓ configured");
    } else {
        println!("✗ not configured (only ISRC downloads will work)");
        println!("  Create an app at: https://developer.spotify.com/dashboard");
        println!("  Then set [spotify] client_id and client_secret");
    }

    println!();
    match config::config_path() {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (no config directory)"),
    }

    Ok(())
}

fn print_ffmpeg_install_instructions() {
    println!();
    println!("ffmpeg is needed to repackage segmented Tidal streams into FLAC.");
    println!();
    println!("Installation:");
    println!("  Windows: winget install ffmpeg");
    println!("  macOS:   brew install ffmpeg");
    println!("  Linux:   apt install ffmpeg  (or your distro's package manager)");
    println!();
    println!("Or set [tools] ffmpeg = \"/path/to/ffmpeg\" in the config file.");
}
