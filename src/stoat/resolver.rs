//! Stoat mention and emoji resolution.
//!
//! Text leaving Stoat carries `<@ULID>` user tokens and `:ULID:` custom
//! emoji tokens. Discord has no equivalent syntax for either, so both
//! are rewritten to plain display text. Emoji names are cached for the
//! process lifetime; users are looked up per message (mentions are rare
//! and the directory is authoritative).

use std::collections::HashMap;
use std::sync::RwLock;

use fancy_regex::Regex;
use tracing::debug;

use crate::common::text::{collect_tokens, substitute_tokens};
use crate::stoat::client::StoatClient;

/// Process-wide custom emoji name cache, populated lazily on first
/// resolution miss and never evicted.
#[derive(Debug, Default)]
pub struct EmojiCache {
    names: RwLock<HashMap<String, String>>,
}

impl EmojiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, emoji_id: &str) -> Option<String> {
        self.names
            .read()
            .expect("emoji cache lock poisoned")
            .get(emoji_id)
            .cloned()
    }

    pub fn insert(&self, emoji_id: String, name: String) {
        self.names
            .write()
            .expect("emoji cache lock poisoned")
            .insert(emoji_id, name);
    }

    pub fn len(&self) -> usize {
        self.names.read().expect("emoji cache lock poisoned").len()
    }
}

/// Rewrites Stoat reference tokens into Discord-friendly plain text.
#[derive(Debug)]
pub struct StoatResolver {
    /// `<@ULID>` user mention.
    user_pattern: Regex,
    /// `:ULID:` custom emoji.
    emoji_pattern: Regex,
}

impl Default for StoatResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StoatResolver {
    pub fn new() -> Self {
        Self {
            user_pattern: Regex::new(r"<@([A-Z0-9]{26})>").unwrap(),
            emoji_pattern: Regex::new(r":([A-Z0-9]{26}):").unwrap(),
        }
    }

    /// Resolve user mentions and custom emoji in `text` for Discord.
    ///
    /// Lookups that fail leave the token verbatim; nothing outside a
    /// matched token is touched.
    pub async fn resolve_for_discord(
        &self,
        client: &StoatClient,
        emoji_cache: &EmojiCache,
        text: &str,
    ) -> String {
        let step1 = self.resolve_users(client, text).await;
        self.resolve_emoji(client, emoji_cache, &step1).await
    }

    async fn resolve_users(&self, client: &StoatClient, text: &str) -> String {
        let mut names: HashMap<String, String> = HashMap::new();
        for user_id in collect_tokens(&self.user_pattern, text) {
            match client.fetch_user(&user_id).await {
                Ok(user) => {
                    names.insert(user_id, user.display().to_string());
                }
                Err(e) => debug!("Could not resolve Stoat user {}: {}", user_id, e),
            }
        }

        substitute_tokens(&self.user_pattern, text, |id| {
            names.get(id).map(|name| format!("@{}", name))
        })
    }

    async fn resolve_emoji(
        &self,
        client: &StoatClient,
        emoji_cache: &EmojiCache,
        text: &str,
    ) -> String {
        let mut names: HashMap<String, String> = HashMap::new();
        for emoji_id in collect_tokens(&self.emoji_pattern, text) {
            if let Some(name) = emoji_cache.get(&emoji_id) {
                names.insert(emoji_id, name);
                continue;
            }
            // Cache miss: ask the emoji directory once, remember the
            // answer. A second miss leaves the token verbatim.
            match client.fetch_emoji(&emoji_id).await {
                Ok(emoji) => {
                    emoji_cache.insert(emoji_id.clone(), emoji.name.clone());
                    debug!(
                        "Cached Stoat emoji {} -> :{}: ({} known)",
                        emoji.id,
                        emoji.name,
                        emoji_cache.len()
                    );
                    names.insert(emoji_id, emoji.name);
                }
                Err(e) => debug!("Could not resolve Stoat emoji {}: {}", emoji_id, e),
            }
        }

        substitute_tokens(&self.emoji_pattern, text, |id| {
            names.get(id).map(|name| render_emoji(name))
        })
    }
}

/// Render a resolved emoji name: the Unicode emoji itself when the name
/// is a standard shortcode, the `:name:` form otherwise.
fn render_emoji(name: &str) -> String {
    match emojis::get_by_shortcode(name) {
        Some(emoji) => emoji.as_str().to_string(),
        None => format!(":{}:", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoji_cache_round_trip() {
        let cache = EmojiCache::new();
        assert!(cache.get("01EMO").is_none());

        cache.insert("01EMO".to_string(), "pepega".to_string());
        assert_eq!(cache.get("01EMO").as_deref(), Some("pepega"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_render_emoji_prefers_unicode() {
        assert_eq!(render_emoji("thumbsup"), "👍");
        assert_eq!(render_emoji("pepega"), ":pepega:");
    }

    #[test]
    fn test_user_pattern_requires_full_ulid() {
        let resolver = StoatResolver::new();
        // Too short, lowercase, or unterminated tokens never match.
        for text in [
            "<@01ABC>",
            "<@01abcdefghijklmnopqrstuvwx>",
            "<@01ABCDEFGHJKMNPQRSTVWXYZ01",
        ] {
            let out = substitute_tokens(&resolver.user_pattern, text, |_| {
                Some("@SHOULD_NOT_APPEAR".to_string())
            });
            assert_eq!(out, text);
        }
    }

    #[test]
    fn test_substitution_only_touches_tokens() {
        let resolver = StoatResolver::new();
        let ulid = "01ABCDEFGHJKMNPQRSTVWXYZ01";
        let text = format!("hi <@{}>, bye", ulid);
        let out = substitute_tokens(&resolver.user_pattern, &text, |id| {
            assert_eq!(id, ulid);
            Some("@Addie".to_string())
        });
        assert_eq!(out, "hi @Addie, bye");
    }
}
