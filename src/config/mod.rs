//! Configuration loading (HOCON file + environment overrides).

pub mod env;
pub mod types;
pub mod validate;

use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::{ConfigError, ConfigResult};
use types::Config;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load a config file, apply environment overrides, and validate.
pub fn load_and_validate(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let config = env::apply_env_overrides(load_config(path)?);
    validate::validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hocon::HoconLoader;

    fn load_str(content: &str) -> Result<Config, ConfigError> {
        HoconLoader::new()
            .load_str(content)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })?
            .resolve()
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
    }

    #[test]
    fn test_minimal_config_parses() {
        let config = load_str(
            r#"
            discord {
              token = "dtok"
              channels = ["123456789012345678"]
            }
            stoat {
              token = "stok"
              channels = ["01ABCDEFGHJKMNPQRSTVWXYZ01"]
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.discord.token, "dtok");
        assert_eq!(config.discord.channel_ids(), vec![123456789012345678]);
        assert_eq!(config.stoat.channels.len(), 1);
        // Ambient defaults fill in.
        assert_eq!(config.bridge.reply_cache_size, 500);
        assert!(config.stoat.api_url.starts_with("https://"));
    }

    #[test]
    fn test_bridge_overrides_parse() {
        let config = load_str(
            r#"
            discord { token = "d", channels = ["1"] }
            stoat { token = "s", channels = ["A"] }
            bridge {
              reply_cache_size = 100
              max_file_bytes = 1048576
              quote_snippet_chars = 40
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.bridge.reply_cache_size, 100);
        assert_eq!(config.bridge.max_file_bytes, 1_048_576);
        assert_eq!(config.bridge.quote_snippet_chars, 40);
    }
}
