//! Webhook registry.
//!
//! Discord has no per-message identity override on regular bot sends, so
//! the bridge posts through one webhook per bridged channel. Webhooks are
//! created-or-reused idempotently: an existing webhook owned by the bot
//! is picked up again after a restart instead of piling up duplicates.

use std::collections::HashMap;

use serenity::builder::CreateWebhook;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use serenity::model::webhook::Webhook;
use tokio::sync::Mutex;
use tracing::info;

use crate::bridge::guard::LoopGuard;

/// Name given to webhooks the bridge creates.
const WEBHOOK_NAME: &str = "Stoat Bridge";

/// Process-lifetime cache of one outbound webhook per Discord channel.
#[derive(Debug, Default)]
pub struct WebhookRegistry {
    // A single async lock serializes create-or-reuse races; the slow
    // path only runs once per channel.
    hooks: Mutex<HashMap<u64, Webhook>>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the channel's webhook, creating or reusing one on first use.
    /// Newly seen webhook ids are registered with the loop guard so the
    /// webhook's own messages are dropped on the way back in.
    pub async fn ensure(
        &self,
        http: &Http,
        guard: &LoopGuard,
        channel_id: u64,
    ) -> serenity::Result<Webhook> {
        let mut hooks = self.hooks.lock().await;

        if let Some(hook) = hooks.get(&channel_id) {
            return Ok(hook.clone());
        }

        let channel = ChannelId::new(channel_id);
        let bot_id = guard.discord_bot();

        let existing = channel
            .webhooks(http)
            .await?
            .into_iter()
            .find(|hook| {
                bot_id.is_some()
                    && hook.user.as_ref().map(|u| u.id.get()) == bot_id
            });

        let hook = match existing {
            Some(hook) => {
                info!(
                    "Discord: reusing webhook '{}' for channel {}",
                    hook.name.as_deref().unwrap_or("?"),
                    channel_id
                );
                hook
            }
            None => {
                let hook = channel
                    .create_webhook(http, CreateWebhook::new(WEBHOOK_NAME))
                    .await?;
                info!("Discord: created webhook for channel {}", channel_id);
                hook
            }
        };

        guard.register_webhook(hook.id.get());
        hooks.insert(channel_id, hook.clone());
        Ok(hook)
    }

    /// The cached webhook for a channel, if one was provisioned.
    pub async fn get(&self, channel_id: u64) -> Option<Webhook> {
        self.hooks.lock().await.get(&channel_id).cloned()
    }
}
