//! Channel pair registry.
//!
//! Static bidirectional mapping between Discord channel ids and Stoat
//! channel ids, zipped positionally from the two configured lists.
//! Built once at startup, read-only afterwards.

use std::collections::HashMap;

use crate::common::error::ConfigError;

/// Bidirectional Discord <-> Stoat channel mapping.
#[derive(Debug)]
pub struct ChannelPairRegistry {
    discord_to_stoat: HashMap<u64, String>,
    stoat_to_discord: HashMap<String, u64>,
}

impl ChannelPairRegistry {
    /// Build the registry from the two positionally-paired id lists.
    ///
    /// Fails when the lists differ in length or when any id appears in
    /// more than one pair.
    pub fn from_lists(discord: &[u64], stoat: &[String]) -> Result<Self, ConfigError> {
        if discord.len() != stoat.len() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Channel list length mismatch: {} Discord ids vs {} Stoat ids",
                    discord.len(),
                    stoat.len()
                ),
            });
        }

        let mut discord_to_stoat = HashMap::with_capacity(discord.len());
        let mut stoat_to_discord = HashMap::with_capacity(stoat.len());

        for (d, s) in discord.iter().zip(stoat) {
            if discord_to_stoat.insert(*d, s.clone()).is_some() {
                return Err(ConfigError::ValidationError {
                    message: format!("Discord channel {} appears in more than one pair", d),
                });
            }
            if stoat_to_discord.insert(s.clone(), *d).is_some() {
                return Err(ConfigError::ValidationError {
                    message: format!("Stoat channel {} appears in more than one pair", s),
                });
            }
        }

        Ok(Self {
            discord_to_stoat,
            stoat_to_discord,
        })
    }

    /// The Stoat channel paired with a Discord channel, if bridged.
    pub fn stoat_for(&self, discord_channel: u64) -> Option<&str> {
        self.discord_to_stoat
            .get(&discord_channel)
            .map(String::as_str)
    }

    /// The Discord channel paired with a Stoat channel, if bridged.
    pub fn discord_for(&self, stoat_channel: &str) -> Option<u64> {
        self.stoat_to_discord.get(stoat_channel).copied()
    }

    /// Number of configured pairs.
    pub fn len(&self) -> usize {
        self.discord_to_stoat.len()
    }

    /// Iterate over (discord, stoat) pairs, for startup logging and
    /// webhook provisioning.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.discord_to_stoat
            .iter()
            .map(|(d, s)| (*d, s.as_str()))
    }
}
