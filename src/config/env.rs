//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `STOATBRIDGE_DISCORD_TOKEN` - Discord bot token
//! - `STOATBRIDGE_STOAT_TOKEN` - Stoat bot token
//! - `STOATBRIDGE_DISCORD_CHANNEL_IDS` - comma-separated Discord channel ids
//! - `STOATBRIDGE_STOAT_CHANNEL_IDS` - comma-separated Stoat channel ids
//! - `STOATBRIDGE_STOAT_API_URL` - Stoat REST API base URL

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "STOATBRIDGE";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens, and deploy-specific values
/// like the channel pair lists, to be provided without editing the file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }
    if let Ok(token) = env::var(format!("{}_STOAT_TOKEN", ENV_PREFIX)) {
        config.stoat.token = token;
    }

    if let Ok(ids) = env::var(format!("{}_DISCORD_CHANNEL_IDS", ENV_PREFIX)) {
        config.discord.channels = split_ids(&ids);
    }
    if let Ok(ids) = env::var(format!("{}_STOAT_CHANNEL_IDS", ENV_PREFIX)) {
        config.stoat.channels = split_ids(&ids);
    }

    if let Ok(url) = env::var(format!("{}_STOAT_API_URL", ENV_PREFIX)) {
        config.stoat.api_url = url;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `STOATBRIDGE_CONFIG`, otherwise returns "stoatbridge.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "stoatbridge.conf".to_string())
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
