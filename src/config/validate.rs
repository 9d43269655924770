//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.
//! A broken channel pairing must never reach the relay, so all problems
//! are fatal and reported together.

use std::collections::HashSet;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.stoat.token.is_empty() {
        errors.push("stoat.token is required".to_string());
    }

    if config.discord.channels.is_empty() {
        errors.push("discord.channels is empty - no channel pairs configured".to_string());
    }
    if config.discord.channels.len() != config.stoat.channels.len() {
        errors.push(format!(
            "channel list length mismatch: {} Discord ids vs {} Stoat ids",
            config.discord.channels.len(),
            config.stoat.channels.len()
        ));
    }

    for (i, raw) in config.discord.channels.iter().enumerate() {
        match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => errors.push(format!(
                "discord.channels[{}] '{}' is not a valid channel id",
                i, raw
            )),
            Ok(_) => {}
        }
    }
    for (i, raw) in config.stoat.channels.iter().enumerate() {
        if raw.trim().is_empty() {
            errors.push(format!("stoat.channels[{}] is empty", i));
        }
    }

    let unique: HashSet<&str> = config.discord.channels.iter().map(String::as_str).collect();
    if unique.len() != config.discord.channels.len() {
        errors.push("discord.channels contains duplicate ids".to_string());
    }
    let unique: HashSet<&str> = config.stoat.channels.iter().map(String::as_str).collect();
    if unique.len() != config.stoat.channels.len() {
        errors.push("stoat.channels contains duplicate ids".to_string());
    }

    if config.bridge.reply_cache_size == 0 {
        errors.push("bridge.reply_cache_size must be non-zero".to_string());
    }
    if config.bridge.max_file_bytes == 0 {
        errors.push("bridge.max_file_bytes must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_valid_config() -> Config {
        Config {
            discord: DiscordConfig {
                token: "discord_token".to_string(),
                channels: vec!["123".to_string(), "456".to_string()],
            },
            stoat: StoatConfig {
                token: "stoat_token".to_string(),
                channels: vec!["01AAA".to_string(), "01BBB".to_string()],
                api_url: "https://api.example".to_string(),
            },
            bridge: BridgeConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_empty_tokens_fail() {
        let mut config = make_valid_config();
        config.discord.token = String::new();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("discord.token"));

        let mut config = make_valid_config();
        config.stoat.token = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_length_mismatch_fails() {
        let mut config = make_valid_config();
        config.stoat.channels.pop();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("length mismatch"));
    }

    #[test]
    fn test_duplicate_channels_fail() {
        let mut config = make_valid_config();
        config.discord.channels = vec!["123".to_string(), "123".to_string()];

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_non_numeric_discord_id_fails() {
        let mut config = make_valid_config();
        config.discord.channels[0] = "general".to_string();

        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a valid channel id"));
    }

    #[test]
    fn test_zero_cache_size_fails() {
        let mut config = make_valid_config();
        config.bridge.reply_cache_size = 0;
        assert!(validate_config(&config).is_err());
    }
}
