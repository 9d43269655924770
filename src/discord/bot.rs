//! Discord bot client.
//!
//! Serenity handles the gateway session; the event handler here only
//! forwards the events the bridge cares about into an mpsc channel so
//! the dispatch loop owns all bridge logic. Also translates serenity's
//! message shape into the bridge's canonical inbound form.

use std::time::Duration;

use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::mpsc;
use tracing::warn;

use crate::common::{AuthorProfile, InboundAttachment, InboundMessage, PlatformRef};

/// Discord events forwarded to the dispatch loop.
#[derive(Debug)]
pub enum DiscordEvent {
    /// Bot connected and ready.
    Ready(Ready),
    /// Message received.
    Message { context: Context, message: Message },
    /// Message deleted.
    MessageDelete {
        channel_id: ChannelId,
        message_id: MessageId,
    },
}

struct ForwardingHandler {
    events_tx: mpsc::UnboundedSender<DiscordEvent>,
}

#[async_trait]
impl EventHandler for ForwardingHandler {
    async fn ready(&self, _context: Context, ready: Ready) {
        if let Err(error) = self.events_tx.send(DiscordEvent::Ready(ready)) {
            warn!("Failed to forward discord event: {}", error);
        }
    }

    async fn message(&self, context: Context, message: Message) {
        if let Err(error) = self.events_tx.send(DiscordEvent::Message { context, message }) {
            warn!("Failed to forward discord event: {}", error);
        }
    }

    async fn message_delete(
        &self,
        _context: Context,
        channel_id: ChannelId,
        message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        let event = DiscordEvent::MessageDelete {
            channel_id,
            message_id,
        };
        if let Err(error) = self.events_tx.send(event) {
            warn!("Failed to forward discord event: {}", error);
        }
    }
}

/// Build the serenity client with bounded HTTP timeouts.
pub async fn build_client(
    token: &str,
    events_tx: mpsc::UnboundedSender<DiscordEvent>,
) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_WEBHOOKS;

    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let handler = ForwardingHandler { events_tx };
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(handler)
        .await?;
    Ok(client)
}

/// Translate a serenity message into the bridge's canonical shape.
pub fn inbound_message(message: &Message) -> InboundMessage {
    let name = message
        .member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .or_else(|| message.author.global_name.clone())
        .unwrap_or_else(|| message.author.name.clone());

    let avatar_url = message
        .author
        .avatar_url()
        .unwrap_or_else(|| message.author.default_avatar_url());

    InboundMessage {
        channel: PlatformRef::Discord(message.channel_id.get()),
        id: PlatformRef::Discord(message.id.get()),
        author: AuthorProfile {
            name,
            avatar_url: Some(avatar_url),
        },
        content: message.content.clone(),
        reply_to: message
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| PlatformRef::Discord(id.get())),
        attachments: message
            .attachments
            .iter()
            .map(|att| InboundAttachment {
                url: att.url.clone(),
                filename: att.filename.clone(),
                size: Some(att.size as u64),
            })
            .collect(),
    }
}
