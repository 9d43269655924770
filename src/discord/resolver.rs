//! Discord mention and emoji resolution.
//!
//! Text leaving Discord carries `<@id>`, `<#id>`, `<@&id>` and
//! `<a:name:id>` tokens. Stoat has no equivalent syntax for any of them,
//! so each resolved reference becomes plain display text (`@Nickname`,
//! `#channel-name`, `@role-name`, `:name:`). Tokens that fail to resolve
//! are left exactly as they arrived.

use std::collections::HashMap;

use fancy_regex::Regex;
use serenity::model::id::{ChannelId, RoleId, UserId};
use serenity::prelude::Context;
use tracing::debug;

use crate::common::text::{collect_tokens, substitute_tokens};

/// Rewrites Discord reference tokens into Stoat-friendly plain text.
#[derive(Debug)]
pub struct DiscordResolver {
    /// Pattern for user mentions (`<@123>` or `<@!123>`).
    user_pattern: Regex,
    /// Pattern for channel mentions (`<#123>`).
    channel_pattern: Regex,
    /// Pattern for role mentions (`<@&123>`).
    role_pattern: Regex,
    /// Pattern for custom emojis (`<:name:id>` or `<a:name:id>`).
    emoji_pattern: Regex,
}

impl Default for DiscordResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscordResolver {
    pub fn new() -> Self {
        Self {
            user_pattern: Regex::new(r"<@!?(\d+)>").unwrap(),
            channel_pattern: Regex::new(r"<#(\d+)>").unwrap(),
            role_pattern: Regex::new(r"<@&(\d+)>").unwrap(),
            emoji_pattern: Regex::new(r"<a?:([a-zA-Z0-9_]+):\d+>").unwrap(),
        }
    }

    /// Resolve all reference tokens in `text` for Stoat.
    ///
    /// Names come from the gateway cache of the guild owning `channel`;
    /// members missing from the cache are fetched over HTTP once. Any
    /// reference that still fails stays verbatim.
    pub async fn resolve_for_stoat(
        &self,
        ctx: &Context,
        channel: ChannelId,
        text: &str,
    ) -> String {
        let user_ids = collect_u64s(&self.user_pattern, text);
        let channel_ids = collect_u64s(&self.channel_pattern, text);
        let role_ids = collect_u64s(&self.role_pattern, text);

        let mut users: HashMap<u64, String> = HashMap::new();
        let mut channels: HashMap<u64, String> = HashMap::new();
        let mut roles: HashMap<u64, String> = HashMap::new();

        // Cache pass. Guild refs cannot be held across await points, so
        // everything needed is copied out first.
        let owning_guild = {
            let mut owning = None;
            for guild_id in ctx.cache.guilds() {
                let Some(guild) = ctx.cache.guild(guild_id) else {
                    continue;
                };
                if !guild.channels.contains_key(&channel) {
                    continue;
                }
                owning = Some(guild_id);

                for id in &user_ids {
                    if let Some(member) = guild.members.get(&UserId::new(*id)) {
                        users.insert(*id, member.display_name().to_string());
                    }
                }
                for id in &channel_ids {
                    if let Some(ch) = guild.channels.get(&ChannelId::new(*id)) {
                        channels.insert(*id, ch.name.clone());
                    }
                }
                for id in &role_ids {
                    if let Some(role) = guild.roles.get(&RoleId::new(*id)) {
                        roles.insert(*id, role.name.clone());
                    }
                }
                break;
            }
            owning
        };

        // HTTP fallback for members the cache has not seen yet.
        if let Some(guild_id) = owning_guild {
            for id in &user_ids {
                if users.contains_key(id) {
                    continue;
                }
                match ctx.http.get_member(guild_id, UserId::new(*id)).await {
                    Ok(member) => {
                        users.insert(*id, member.display_name().to_string());
                    }
                    Err(e) => debug!("Could not fetch member {}: {}", id, e),
                }
            }
        }

        let step1 = substitute_tokens(&self.user_pattern, text, |raw| {
            lookup_u64(&users, raw).map(|name| format!("@{}", name))
        });
        let step2 = substitute_tokens(&self.channel_pattern, &step1, |raw| {
            lookup_u64(&channels, raw).map(|name| format!("#{}", name))
        });
        let step3 = substitute_tokens(&self.role_pattern, &step2, |raw| {
            lookup_u64(&roles, raw).map(|name| format!("@{}", name))
        });
        self.strip_custom_emoji(&step3)
    }

    /// Convert custom emoji tokens to their `:name:` form. Pure text,
    /// no directory involved - the name is embedded in the token.
    pub fn strip_custom_emoji(&self, text: &str) -> String {
        self.emoji_pattern.replace_all(text, ":$1:").to_string()
    }
}

fn collect_u64s(pattern: &Regex, text: &str) -> Vec<u64> {
    collect_tokens(pattern, text)
        .into_iter()
        .filter_map(|raw| raw.parse().ok())
        // Snowflakes are never zero; serenity id types reject it.
        .filter(|id| *id != 0)
        .collect()
}

fn lookup_u64(names: &HashMap<u64, String>, raw: &str) -> Option<String> {
    raw.parse().ok().and_then(|id| names.get(&id).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DiscordResolver {
        DiscordResolver::new()
    }

    #[test]
    fn test_user_mention_substitution() {
        let r = resolver();
        let names = HashMap::from([(123u64, "Addie".to_string())]);

        let out = substitute_tokens(&r.user_pattern, "hello <@123>", |raw| {
            lookup_u64(&names, raw).map(|n| format!("@{}", n))
        });
        assert_eq!(out, "hello @Addie");

        // Nickname form matches too.
        let out = substitute_tokens(&r.user_pattern, "hello <@!123>", |raw| {
            lookup_u64(&names, raw).map(|n| format!("@{}", n))
        });
        assert_eq!(out, "hello @Addie");
    }

    #[test]
    fn test_unknown_references_stay_verbatim() {
        let r = resolver();
        let empty: HashMap<u64, String> = HashMap::new();

        for text in ["hi <@999>", "see <#42>", "ping <@&7>"] {
            let out = substitute_tokens(&r.user_pattern, text, |raw| {
                lookup_u64(&empty, raw).map(|n| format!("@{}", n))
            });
            assert_eq!(out, text);
        }
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let r = resolver();
        let input = "just words, an email a@b.com, and a < bracket";

        assert_eq!(r.strip_custom_emoji(input), input);
        let out = substitute_tokens(&r.user_pattern, input, |_| Some("X".to_string()));
        assert_eq!(out, input);
    }

    #[test]
    fn test_malformed_tokens_are_ignored() {
        let r = resolver();
        for input in ["<@12a3>", "<@>", "<#>", "<@123", "<:half:12"] {
            assert_eq!(r.strip_custom_emoji(input), input);
            let out = substitute_tokens(&r.user_pattern, input, |_| Some("X".to_string()));
            assert_eq!(out, input);
        }
    }

    #[test]
    fn test_custom_emoji_to_shortcode() {
        let r = resolver();
        let out = r.strip_custom_emoji("Hello <:pepega:123456789> world <a:dance:987654321>");
        assert_eq!(out, "Hello :pepega: world :dance:");
    }

    #[test]
    fn test_role_and_channel_patterns_do_not_overlap_users() {
        let r = resolver();
        let roles = HashMap::from([(7u64, "mods".to_string())]);

        // A role mention must not be consumed by the user pattern.
        let text = "ping <@&7>";
        let after_users = substitute_tokens(&r.user_pattern, text, |_| {
            Some("@WRONG".to_string())
        });
        assert_eq!(after_users, text);

        let out = substitute_tokens(&r.role_pattern, &after_users, |raw| {
            lookup_u64(&roles, raw).map(|n| format!("@{}", n))
        });
        assert_eq!(out, "ping @mods");
    }
}
