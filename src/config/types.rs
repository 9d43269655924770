//! Configuration type definitions.

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub stoat: StoatConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Bridged channel ids, positionally paired with `stoat.channels`.
    /// Kept as strings in the file; snowflakes overflow common config
    /// number handling.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl DiscordConfig {
    /// Channel ids parsed to snowflakes. Validation guarantees this
    /// cannot fail after startup.
    pub fn channel_ids(&self) -> Vec<u64> {
        self.channels
            .iter()
            .filter_map(|raw| raw.trim().parse().ok())
            .collect()
    }
}

/// Stoat bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoatConfig {
    pub token: String,
    /// Bridged channel ids, positionally paired with `discord.channels`.
    #[serde(default)]
    pub channels: Vec<String>,
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    crate::stoat::client::DEFAULT_API_URL.to_string()
}

/// Relay tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Capacity of the reply identity cache.
    pub reply_cache_size: usize,
    /// Inclusive attachment re-upload ceiling, in bytes.
    pub max_file_bytes: u64,
    /// Excerpt length for reply quote lines, in characters.
    pub quote_snippet_chars: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Matches Discord's upload restrictions.
            max_file_bytes: 25 * 1024 * 1024,
            reply_cache_size: 500,
            quote_snippet_chars: 80,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_defaults() {
        let bridge = BridgeConfig::default();
        assert_eq!(bridge.reply_cache_size, 500);
        assert_eq!(bridge.max_file_bytes, 26_214_400);
        assert_eq!(bridge.quote_snippet_chars, 80);
    }

    #[test]
    fn test_channel_ids_parse() {
        let discord = DiscordConfig {
            token: "t".to_string(),
            channels: vec!["123".to_string(), " 456 ".to_string()],
        };
        assert_eq!(discord.channel_ids(), vec![123, 456]);
    }
}
