//! Per-direction dispatch.
//!
//! Each direction runs one dispatch loop that drains its platform's
//! event channel and walks every message through the same steps:
//! loop filter, pair resolution, reply resolution, mention resolution,
//! attachment planning, identity application, send, record. Failures
//! are contained to the event that caused them; the loops only exit on
//! shutdown.

use std::sync::Arc;

use serenity::builder::{CreateAttachment, ExecuteWebhook};
use serenity::model::id::{ChannelId, MessageId};
use serenity::prelude::Context;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::attachments::{self, AttachmentPlan};
use crate::bridge::Engine;
use crate::common::text::{excerpt, truncate_chars};
use crate::common::InboundMessage;
use crate::discord::bot::{self, DiscordEvent};
use crate::stoat::models::{
    GatewayEvent, Masquerade, OutboundStoatMessage, ReplyIntent, StoatMessage, StoatUser,
};

/// Hard cap on outbound message text, shared by both platforms.
const MAX_MESSAGE_CHARS: usize = 2000;
/// Stoat rejects masquerade names longer than this.
const MASQUERADE_NAME_CHARS: usize = 32;
/// Discord rejects webhook usernames longer than this.
const WEBHOOK_NAME_CHARS: usize = 80;
/// Author name cap inside a reply quote line.
const QUOTE_AUTHOR_CHARS: usize = 50;

/// Drain Discord events until shutdown.
///
/// `init_complete_tx` fires after the first Ready once webhooks are
/// provisioned, so startup can sequence the rest of the bridge.
pub async fn run_discord_dispatch(
    engine: Arc<Engine>,
    mut events_rx: mpsc::UnboundedReceiver<DiscordEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    init_complete_tx: oneshot::Sender<()>,
) {
    let mut init_complete = Some(init_complete_tx);

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(DiscordEvent::Ready(ready)) => {
                        info!("Discord: connected as {}", ready.user.name);
                        engine.guard.set_discord_bot(ready.user.id.get());

                        for (discord_channel, _) in engine.pairs.iter() {
                            if let Err(e) = engine
                                .webhooks
                                .ensure(&engine.discord_http, &engine.guard, discord_channel)
                                .await
                            {
                                error!(
                                    "Discord: could not set up webhook for channel {}: {}",
                                    discord_channel, e
                                );
                            }
                        }
                        info!("Discord: bridging {} channel pair(s)", engine.pairs.len());

                        if let Some(tx) = init_complete.take() {
                            let _ = tx.send(());
                        }
                    }
                    Some(DiscordEvent::Message { context, message }) => {
                        let webhook_id = message.webhook_id.map(|id| id.get());
                        if engine.guard.is_own_discord(message.author.id.get(), webhook_id) {
                            continue;
                        }
                        let inbound = bot::inbound_message(&message);
                        forward_discord_message(&engine, &context, inbound).await;
                    }
                    Some(DiscordEvent::MessageDelete { channel_id, message_id }) => {
                        mirror_discord_deletion(&engine, channel_id.get(), message_id.get()).await;
                    }
                    None => {
                        debug!("Discord events channel closed");
                        break;
                    }
                }
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Discord dispatch stopping");
                    break;
                }
            }
        }
    }
}

/// Drain Stoat gateway events until shutdown.
pub async fn run_stoat_dispatch(
    engine: Arc<Engine>,
    mut events_rx: mpsc::UnboundedReceiver<GatewayEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(GatewayEvent::Message(message)) => {
                        handle_stoat_message(&engine, message).await;
                    }
                    Some(GatewayEvent::MessageDelete { id, channel }) => {
                        mirror_stoat_deletion(&engine, &channel, &id).await;
                    }
                    Some(_) => {}
                    None => {
                        debug!("Stoat events channel closed");
                        break;
                    }
                }
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Stoat dispatch stopping");
                    break;
                }
            }
        }
    }
}

/// Forward one Discord message to its paired Stoat channel.
async fn forward_discord_message(engine: &Engine, ctx: &Context, msg: InboundMessage) {
    let (Some(discord_channel), Some(discord_msg_id)) = (msg.channel.discord(), msg.id.discord())
    else {
        return;
    };
    let Some(stoat_channel) = engine.pairs.stoat_for(discord_channel) else {
        debug!(channel = discord_channel, "Discord message in unbridged channel");
        return;
    };

    // Native reply when the referenced message is still in the cache;
    // without a cache hit the message goes out with no reply marker.
    let replies = msg
        .reply_to
        .as_ref()
        .and_then(|r| r.discord())
        .and_then(|id| engine.reply_cache.by_discord(id))
        .map(|link| {
            debug!(
                "Discord -> Stoat: native reply to {} (forwarded {})",
                link.stoat_id, link.created_at
            );
            vec![ReplyIntent {
                id: link.stoat_id,
                mention: false,
            }]
        });

    let mut content = engine
        .discord_resolver
        .resolve_for_stoat(ctx, ChannelId::new(discord_channel), &msg.content)
        .await;

    // Stoat renders remote URLs, so attachments travel as links.
    for attachment in &msg.attachments {
        if let AttachmentPlan::AppendLink(url) = attachments::link_plan(attachment) {
            if !content.is_empty() {
                content.push(' ');
            }
            content.push_str(&url);
        }
    }

    if content.trim().is_empty() {
        return;
    }

    let payload = OutboundStoatMessage {
        content: truncate_chars(&content, MAX_MESSAGE_CHARS),
        masquerade: Some(Masquerade {
            name: Some(truncate_chars(&msg.author.name, MASQUERADE_NAME_CHARS)),
            avatar: msg.author.avatar_url.clone(),
        }),
        replies,
    };

    match engine.stoat.send_message(stoat_channel, &payload).await {
        Ok(sent) => {
            info!("Discord -> Stoat [{}]: {}", stoat_channel, payload.content);
            debug!(
                "Discord -> Stoat: cached discord={} <-> stoat={}",
                discord_msg_id, sent.id
            );
            engine.reply_cache.record(discord_msg_id, sent.id, false);
        }
        Err(e) => error!("Discord -> Stoat (channel {}): {}", stoat_channel, e),
    }
}

/// Loop-filter and adapt a raw Stoat message, then forward it.
async fn handle_stoat_message(engine: &Engine, message: StoatMessage) {
    if engine.guard.is_own_stoat(&message.author) {
        return;
    }
    if engine.pairs.discord_for(&message.channel).is_none() {
        debug!(channel = %message.channel, "Stoat message in unbridged channel");
        return;
    }

    let author = match engine.stoat.fetch_user(&message.author).await {
        Ok(user) => user,
        Err(e) => {
            debug!("Could not fetch Stoat author {}: {}", message.author, e);
            StoatUser {
                id: message.author.clone(),
                username: "unknown".to_string(),
                display_name: None,
                avatar: None,
            }
        }
    };

    let inbound = engine.stoat.inbound_message(&message, &author);
    forward_stoat_message(engine, inbound).await;
}

/// Forward one Stoat message to its paired Discord channel.
async fn forward_stoat_message(engine: &Engine, msg: InboundMessage) {
    let Some(stoat_channel) = msg.channel.stoat().map(str::to_string) else {
        return;
    };
    let Some(stoat_msg_id) = msg.id.stoat().map(str::to_string) else {
        return;
    };
    let Some(discord_channel) = engine.pairs.discord_for(&stoat_channel) else {
        return;
    };

    let mut content = engine
        .stoat_resolver
        .resolve_for_discord(&engine.stoat, &engine.emoji_cache, &msg.content)
        .await;

    // Webhooks cannot bind a native reply, so a reply becomes a quote
    // line above the body - when the original can still be fetched.
    if let Some(reply_id) = msg.reply_to.as_ref().and_then(|r| r.stoat()) {
        match engine.stoat.fetch_message(&stoat_channel, reply_id).await {
            Ok(original) => {
                let author_name = match original
                    .masquerade
                    .as_ref()
                    .and_then(|m| m.name.clone())
                {
                    Some(name) => name,
                    None => match engine.stoat.fetch_user(&original.author).await {
                        Ok(user) => user.display().to_string(),
                        Err(_) => "unknown".to_string(),
                    },
                };
                let quote = quote_line(
                    &author_name,
                    original.content.as_deref().unwrap_or(""),
                    engine.limits.quote_snippet_chars,
                );
                content = format!("{}\n{}", quote, content);
            }
            Err(e) => warn!(
                "Stoat -> Discord: could not fetch reply target '{}': {}",
                reply_id, e
            ),
        }
    }

    // Download-and-reupload what fits, link what does not.
    let mut files: Vec<CreateAttachment> = Vec::new();
    let mut uploaded_urls: Vec<String> = Vec::new();
    for attachment in &msg.attachments {
        match attachments::upload_plan(&engine.http, attachment, engine.limits.max_file_bytes).await
        {
            AttachmentPlan::Upload { filename, data } => {
                files.push(CreateAttachment::bytes(data.to_vec(), filename));
                uploaded_urls.push(attachment.url.clone());
            }
            AttachmentPlan::AppendLink(url) => {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&url);
            }
        }
    }

    if content.trim().is_empty() && files.is_empty() {
        return;
    }

    let webhook = match engine
        .webhooks
        .ensure(&engine.discord_http, &engine.guard, discord_channel)
        .await
    {
        Ok(hook) => hook,
        Err(e) => {
            error!(
                "Stoat -> Discord: webhook for channel {} unavailable: {}",
                discord_channel, e
            );
            return;
        }
    };

    let text = truncate_chars(&content, MAX_MESSAGE_CHARS);
    let mut execute = ExecuteWebhook::new().username(truncate_chars(&msg.author.name, WEBHOOK_NAME_CHARS));
    if let Some(avatar) = &msg.author.avatar_url {
        execute = execute.avatar_url(avatar);
    }
    if !text.trim().is_empty() {
        execute = execute.content(text.clone());
    }
    let had_files = !files.is_empty();
    execute = execute.add_files(files);

    match webhook.execute(&engine.discord_http, true, execute).await {
        Ok(Some(sent)) => {
            info!("Stoat -> Discord [{}]: {}", discord_channel, text);
            debug!(
                "Stoat -> Discord: cached discord={} <-> stoat={}",
                sent.id.get(),
                stoat_msg_id
            );
            engine.reply_cache.record(sent.id.get(), stoat_msg_id, true);
        }
        Ok(None) => warn!("Stoat -> Discord: send returned no message, reply linking skipped"),
        Err(e) => {
            error!("Stoat -> Discord (channel {}): {}", discord_channel, e);
            if had_files {
                // Upload failure degrades to links; the text must still
                // be delivered.
                let mut fallback = text;
                for url in &uploaded_urls {
                    if !fallback.is_empty() {
                        fallback.push('\n');
                    }
                    fallback.push_str(url);
                }
                let mut retry = ExecuteWebhook::new()
                    .username(truncate_chars(&msg.author.name, WEBHOOK_NAME_CHARS))
                    .content(truncate_chars(&fallback, MAX_MESSAGE_CHARS));
                if let Some(avatar) = &msg.author.avatar_url {
                    retry = retry.avatar_url(avatar);
                }
                match webhook.execute(&engine.discord_http, true, retry).await {
                    Ok(Some(sent)) => {
                        engine.reply_cache.record(sent.id.get(), stoat_msg_id, true);
                    }
                    Ok(None) => {}
                    Err(e) => error!(
                        "Stoat -> Discord (channel {}): link fallback failed too: {}",
                        discord_channel, e
                    ),
                }
            }
        }
    }
}

/// Mirror a Discord-side deletion onto Stoat.
async fn mirror_discord_deletion(engine: &Engine, channel_id: u64, message_id: u64) {
    // Deletion the bridge triggered itself - swallow the echo.
    if engine.guard.take_discord_deletion(message_id) {
        return;
    }
    let Some(stoat_channel) = engine.pairs.stoat_for(channel_id) else {
        return;
    };
    let Some(link) = engine.reply_cache.by_discord(message_id) else {
        return;
    };

    engine.guard.mark_stoat_deletion(link.stoat_id.clone());
    match engine.stoat.delete_message(stoat_channel, &link.stoat_id).await {
        Ok(()) => debug!("Discord -> Stoat: mirrored deletion of {}", link.stoat_id),
        Err(e) => {
            engine.guard.unmark_stoat_deletion(&link.stoat_id);
            warn!(
                "Discord -> Stoat: could not delete {}: {}",
                link.stoat_id, e
            );
        }
    }
}

/// Mirror a Stoat-side deletion onto Discord.
async fn mirror_stoat_deletion(engine: &Engine, channel_id: &str, message_id: &str) {
    if engine.guard.take_stoat_deletion(message_id) {
        return;
    }
    let Some(discord_channel) = engine.pairs.discord_for(channel_id) else {
        return;
    };
    let Some(link) = engine.reply_cache.by_stoat(message_id) else {
        return;
    };

    engine.guard.mark_discord_deletion(link.discord_id);

    let result = if link.via_webhook {
        match engine.webhooks.get(discord_channel).await {
            Some(hook) => {
                hook.delete_message(
                    &engine.discord_http,
                    None,
                    MessageId::new(link.discord_id),
                )
                .await
            }
            None => {
                engine.guard.unmark_discord_deletion(link.discord_id);
                warn!(
                    "Stoat -> Discord: no webhook for channel {}, cannot delete {}",
                    discord_channel, link.discord_id
                );
                return;
            }
        }
    } else {
        engine
            .discord_http
            .delete_message(
                ChannelId::new(discord_channel),
                MessageId::new(link.discord_id),
                None,
            )
            .await
    };

    match result {
        Ok(()) => debug!("Stoat -> Discord: mirrored deletion of {}", link.discord_id),
        Err(e) => {
            engine.guard.unmark_discord_deletion(link.discord_id);
            warn!(
                "Stoat -> Discord: could not delete {}: {}",
                link.discord_id, e
            );
        }
    }
}

/// Quote line prefixed to a forwarded reply when no native reply
/// reference is possible.
fn quote_line(author: &str, text: &str, snippet_chars: usize) -> String {
    format!(
        "-# ↩ **{}**: *{}*",
        truncate_chars(author, QUOTE_AUTHOR_CHARS),
        excerpt(text, snippet_chars)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_line_format() {
        assert_eq!(
            quote_line("Kay", "see you tomorrow", 80),
            "-# ↩ **Kay**: *see you tomorrow*"
        );
    }

    #[test]
    fn test_quote_line_flattens_and_truncates_snippet() {
        let quoted = quote_line("Kay", "line one\nline two", 80);
        assert_eq!(quoted, "-# ↩ **Kay**: *line one line two*");

        let quoted = quote_line("Kay", "0123456789", 4);
        assert_eq!(quoted, "-# ↩ **Kay**: *0123…*");
    }

    #[test]
    fn test_quote_line_caps_author() {
        let long_author = "A".repeat(80);
        let quoted = quote_line(&long_author, "hi", 80);
        assert!(quoted.contains(&"A".repeat(50)));
        assert!(!quoted.contains(&"A".repeat(51)));
    }
}
