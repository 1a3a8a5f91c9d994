//! Background WebSocket task. Connects once; no reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_common::ServerMessage;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::client::OutboundRx;
use super::listeners::Listeners;
use super::types::ChannelConfig;

pub(crate) async fn connection_task(
    config: ChannelConfig,
    mut outbound_rx: OutboundRx,
    listeners: Listeners,
    connected: Arc<AtomicBool>,
) {
    info!(url = %config.url, "Connecting to relay");

    let ws = match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        tokio_tungstenite::connect_async(config.url.as_str()),
    )
    .await
    {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => {
            error!(error = %e, "Failed to connect to relay");
            listeners.close();
            return;
        }
        Err(_elapsed) => {
            error!(
                "Relay connection timed out after {}s",
                config.connect_timeout_secs
            );
            listeners.close();
            return;
        }
    };

    connected.store(true, Ordering::SeqCst);
    info!("Connected to relay");

    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => {
                let Some(msg) = outgoing else {
                    // Every channel handle is gone.
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(event = msg.event(), error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(json.into())).await {
                    warn!(error = %e, "WebSocket send failed");
                    break;
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => match ServerMessage::parse(text.as_str()) {
                        Ok(msg) => listeners.dispatch(msg),
                        Err(e) => debug!(error = %e, "Dropping malformed message from relay"),
                    },
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sink.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Relay closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    listeners.close();
}
