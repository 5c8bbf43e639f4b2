mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Upper bound for `writer.sync_every`.
pub const MAX_SYNC_EVERY: u32 = 1_000_000;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    tracing::debug!("Loaded config from {:?}", path);
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./flvkit.toml",
        "~/.config/flvkit/config.toml",
        "/etc/flvkit/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.writer.sync_every > MAX_SYNC_EVERY {
        anyhow::bail!(
            "writer.sync_every must be at most {} (got {})",
            MAX_SYNC_EVERY,
            config.writer.sync_every
        );
    }

    Ok(())
}
