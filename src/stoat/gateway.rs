//! Stoat gateway connection.
//!
//! Maintains the WebSocket session: authenticate on connect, keep the
//! connection alive with periodic pings, forward parsed events into the
//! dispatch channel, and reconnect with exponential backoff whenever the
//! link drops. The loop only exits on shutdown.

use std::time::Duration;

use backon::BackoffBuilder;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::common::error::StoatError;
use crate::stoat::models::GatewayEvent;

/// Interval between keepalive pings.
const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Create an exponential backoff iterator for gateway reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn gateway_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Run the gateway until shutdown, forwarding events into `events_tx`.
pub async fn run(
    ws_url: String,
    token: String,
    events_tx: mpsc::UnboundedSender<GatewayEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut backoff = gateway_backoff();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        info!("Connecting to Stoat gateway...");
        match run_session(&ws_url, &token, &events_tx, &mut shutdown_rx).await {
            Ok(()) => {
                // Clean close resets the backoff; an authenticated
                // session counts as progress.
                backoff = gateway_backoff();
                info!("Stoat gateway disconnected");
            }
            Err(e) => error!("Stoat gateway error: {}", e),
        }

        if *shutdown_rx.borrow() {
            break;
        }

        let delay = backoff.next().unwrap_or(Duration::from_secs(300));
        warn!("Reconnecting to Stoat in {:.1}s...", delay.as_secs_f64());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => {}
        }
    }

    info!("Stoat gateway task ended");
}

/// One connected session: authenticate, then pump frames until the
/// connection drops or shutdown is signalled.
async fn run_session(
    ws_url: &str,
    token: &str,
    events_tx: &mpsc::UnboundedSender<GatewayEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<(), StoatError> {
    let (stream, _) = connect_async(ws_url).await.map_err(|e| StoatError::Gateway {
        message: e.to_string(),
    })?;
    let (mut writer, mut reader) = stream.split();

    let auth = json!({ "type": "Authenticate", "token": token });
    writer
        .send(WsMessage::Text(auth.to_string()))
        .await
        .map_err(|e| StoatError::Gateway {
            message: e.to_string(),
        })?;

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = reader.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        return Err(StoatError::Gateway { message: e.to_string() });
                    }
                    None => return Ok(()),
                };

                match frame {
                    WsMessage::Text(text) => handle_frame(&text, events_tx),
                    WsMessage::Close(_) => return Ok(()),
                    // Tungstenite answers protocol pings itself.
                    _ => {}
                }
            }

            _ = ping.tick() => {
                let frame = json!({ "type": "Ping", "data": 0 });
                if let Err(e) = writer.send(WsMessage::Text(frame.to_string())).await {
                    return Err(StoatError::Gateway { message: e.to_string() });
                }
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = writer.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }
}

fn handle_frame(text: &str, events_tx: &mpsc::UnboundedSender<GatewayEvent>) {
    let event = match serde_json::from_str::<GatewayEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            debug!("Unparseable gateway frame ({}): {:.120}", e, text);
            return;
        }
    };

    match event {
        GatewayEvent::Authenticated => info!("Stoat: authenticated"),
        GatewayEvent::Ready => info!("Stoat: session ready"),
        GatewayEvent::Error { error } => warn!("Stoat gateway reported error: {}", error),
        GatewayEvent::Pong | GatewayEvent::Other => {}
        event @ (GatewayEvent::Message(_) | GatewayEvent::MessageDelete { .. }) => {
            if events_tx.send(event).is_err() {
                debug!("Dispatch channel closed, dropping gateway event");
            }
        }
    }
}
