//! Server Configuration
//!
//! Locates and loads the application configuration before logging is set up.

use kuba_sankey::config::ApplicationConfig;
use std::path::{Path, PathBuf};

/// Default configuration file in the working directory
const DEFAULT_CONFIG_FILE: &str = "sankey.toml";

/// Load configuration
///
/// Priority:
/// 1. `--config` command-line flag
/// 2. SANKEY_CONFIG environment variable
/// 3. sankey.toml in the working directory
/// 4. Default configuration (with environment overrides)
///
/// An explicitly requested file that fails to load is an error; the
/// implicit `sankey.toml` falls back to defaults.
pub fn load_config(cli_path: Option<&Path>) -> Result<ApplicationConfig, String> {
    let explicit = cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("SANKEY_CONFIG").ok().map(PathBuf::from));

    if let Some(path) = explicit {
        return match ApplicationConfig::load(&path) {
            Ok(config) => {
                eprintln!("[config] Loaded configuration from: {}", path.display());
                Ok(config)
            },
            Err(e) => Err(format!("{}: {}", path.display(), e)),
        };
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        match ApplicationConfig::load(default_path) {
            Ok(config) => {
                eprintln!("[config] Loaded configuration from {}", DEFAULT_CONFIG_FILE);
                return Ok(config);
            },
            Err(e) => {
                eprintln!(
                    "[config] Failed to load {}: {}. Using defaults.",
                    DEFAULT_CONFIG_FILE, e
                );
            },
        }
    }

    eprintln!("[config] Using default configuration");
    let config = ApplicationConfig::from_env();
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
