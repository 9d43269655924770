//! Stoatbridge - bidirectional Discord-Stoat chat bridge.
//!
//! Relays messages between paired Discord and Stoat channels, making
//! each side's traffic appear native on the other: author name and
//! avatar, resolved mentions and emoji, reply context, and attachments.

mod bridge;
mod common;
mod config;
mod discord;
mod stoat;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use backon::BackoffBuilder;
use tokio::signal;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use bridge::{ChannelPairRegistry, Engine, LoopGuard, RelayLimits, ReplyCache};
use config::env::get_config_path;
use discord::{DiscordEvent, DiscordResolver, WebhookRegistry};
use stoat::models::GatewayEvent;
use stoat::{EmojiCache, StoatClient, StoatResolver};

/// Create an exponential backoff iterator for connection retries.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn connect_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Stoatbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = config::load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure {} exists and is properly formatted.",
            config_path
        );
        e
    })?;

    info!("Configuration loaded successfully");

    let discord_ids = config.discord.channel_ids();
    let pairs = ChannelPairRegistry::from_lists(&discord_ids, &config.stoat.channels)?;
    info!("Bridging {} channel pair(s):", pairs.len());
    for (i, (d, s)) in pairs.iter().enumerate() {
        info!("  Pair {}: Discord {} <-> Stoat {}", i + 1, d, s);
    }

    // Shared HTTP client with bounded timeouts; every network-bound
    // relay step inherits these.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let mut stoat_client = StoatClient::new(
        http.clone(),
        config.stoat.api_url.clone(),
        config.stoat.token.clone(),
    );
    let ws_url = stoat_client.discover_gateway().await;
    info!("Stoat gateway: {}", ws_url);

    // The loop guard needs our own Stoat identity before any event can
    // be processed, so retry until the profile is available.
    let guard = LoopGuard::new();
    let stoat_me = {
        let mut backoff = connect_backoff();
        loop {
            match stoat_client.fetch_self().await {
                Ok(me) => break me,
                Err(e) => {
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    error!("Could not fetch Stoat bot profile: {}", e);
                    warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    };
    info!("Stoat: connected as {}", stoat_me.display());
    guard.set_stoat_bot(stoat_me.id.clone());

    // ============================================================
    // Create channels for communication
    // ============================================================

    let (discord_tx, discord_rx) = mpsc::unbounded_channel::<DiscordEvent>();
    let (stoat_tx, stoat_rx) = mpsc::unbounded_channel::<GatewayEvent>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut discord_client = discord::build_client(&config.discord.token, discord_tx).await?;
    let discord_http = discord_client.http.clone();
    let shard_manager = discord_client.shard_manager.clone();

    let engine = Arc::new(Engine {
        pairs,
        reply_cache: ReplyCache::new(config.bridge.reply_cache_size),
        guard,
        webhooks: WebhookRegistry::new(),
        emoji_cache: EmojiCache::new(),
        discord_resolver: DiscordResolver::new(),
        stoat_resolver: StoatResolver::new(),
        stoat: stoat_client,
        discord_http,
        http,
        limits: RelayLimits {
            max_file_bytes: config.bridge.max_file_bytes,
            quote_snippet_chars: config.bridge.quote_snippet_chars,
        },
    });

    // ============================================================
    // Spawn dispatch loops, one per direction
    // ============================================================

    let (init_complete_tx, init_complete_rx) = oneshot::channel::<()>();

    let discord_dispatch = tokio::spawn(bridge::run_discord_dispatch(
        engine.clone(),
        discord_rx,
        shutdown_rx.clone(),
        init_complete_tx,
    ));
    let stoat_dispatch = tokio::spawn(bridge::run_stoat_dispatch(
        engine.clone(),
        stoat_rx,
        shutdown_rx.clone(),
    ));

    // ============================================================
    // Start Discord client
    // ============================================================

    info!("Starting Discord client...");

    let mut discord_shutdown_rx = shutdown_rx.clone();
    let discord_task = tokio::spawn(async move {
        let mut backoff = connect_backoff();
        loop {
            info!("Connecting to Discord...");
            match discord_client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected");
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    warn!("Reconnecting to Discord in {:.1}s...", delay.as_secs_f64());
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = discord_shutdown_rx.changed() => {}
                    }
                }
            }
            if *discord_shutdown_rx.borrow() {
                break;
            }
        }
    });

    // Gracefully close the gateway shards on shutdown.
    {
        let mut rx = shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                if rx.changed().await.is_err() {
                    return;
                }
                if *rx.borrow() {
                    break;
                }
            }
            info!("Initiating graceful Discord shutdown...");
            shard_manager.shutdown_all().await;
        });
    }

    info!("Waiting for Discord to connect and provision webhooks...");
    match tokio::time::timeout(Duration::from_secs(15), init_complete_rx).await {
        Ok(Ok(())) => info!("Discord initialization complete"),
        Ok(Err(_)) => warn!("Discord init signal dropped before firing"),
        Err(_) => warn!(
            "Timed out waiting for Discord initialization (15s); continuing - \
             webhooks are provisioned on demand"
        ),
    }

    // ============================================================
    // Start Stoat gateway
    // ============================================================

    let gateway_task = tokio::spawn(stoat::gateway::run(
        ws_url,
        config.stoat.token.clone(),
        stoat_tx,
        shutdown_rx.clone(),
    ));

    // ============================================================
    // Run until a side dies or we are told to stop
    // ============================================================

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping bridge...");
            true
        }
        _ = discord_task => false,
        _ = gateway_task => false,
    };

    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (tasks already exited): {}", e);
        }
        let timeout = Duration::from_secs(5);
        for (name, task) in [
            ("Discord dispatch", discord_dispatch),
            ("Stoat dispatch", stoat_dispatch),
        ] {
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => debug!("{} task ended", name),
                Ok(Err(e)) => warn!("{} task panicked: {}", name, e),
                Err(_) => warn!("{} task shutdown timed out", name),
            }
        }
    }

    debug!(
        "Reply cache held {} link(s) at shutdown",
        engine.reply_cache.len()
    );
    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
