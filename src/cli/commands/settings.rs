//! Config file inspection.

use crate::config::{self, Config};

/// Print the effective configuration, or write defaults with `init`.
pub fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let path = config::save(&Config::default())?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    match config::config_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config directory, using defaults)"),
    }
    println!("# output directory: {}", config.output_dir().display());
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
