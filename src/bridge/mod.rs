//! The bridge engine.
//!
//! Owns every piece of shared relay state - the channel pair table, the
//! reply identity cache, the loop guard, the webhook registry, and the
//! emoji cache - plus the clients the dispatchers send through. One
//! instance is shared by both directions for the process lifetime.

pub mod attachments;
pub mod dispatcher;
pub mod guard;
pub mod pairs;
pub mod reply_cache;

use std::sync::Arc;

use serenity::http::Http;

use crate::discord::{DiscordResolver, WebhookRegistry};
use crate::stoat::{EmojiCache, StoatClient, StoatResolver};

pub use dispatcher::{run_discord_dispatch, run_stoat_dispatch};
pub use guard::LoopGuard;
pub use pairs::ChannelPairRegistry;
pub use reply_cache::{MessageLink, ReplyCache};

/// Tunable relay limits, read from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RelayLimits {
    /// Inclusive ceiling for attachment re-upload, in bytes.
    pub max_file_bytes: u64,
    /// Excerpt length for reply quote lines, in characters.
    pub quote_snippet_chars: usize,
}

/// Shared state and clients for both relay directions.
pub struct Engine {
    pub pairs: ChannelPairRegistry,
    pub reply_cache: ReplyCache,
    pub guard: LoopGuard,
    pub webhooks: WebhookRegistry,
    pub emoji_cache: EmojiCache,
    pub discord_resolver: DiscordResolver,
    pub stoat_resolver: StoatResolver,
    pub stoat: StoatClient,
    pub discord_http: Arc<Http>,
    /// Plain HTTP client for attachment downloads.
    pub http: reqwest::Client,
    pub limits: RelayLimits,
}
