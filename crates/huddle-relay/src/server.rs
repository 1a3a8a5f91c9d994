//! Accept loop.

use huddle_config::RelayConfig;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::handle_connection;
use crate::rooms::RoomStore;

/// Bind to the configured address and serve until the process exits.
pub async fn serve(config: &RelayConfig) -> std::io::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("huddle-relay listening on {}", addr);
    run(listener, RoomStore::new(), config.outbound_queue).await;
    Ok(())
}

/// Accept connections on an already-bound listener.
pub async fn run(listener: TcpListener, store: RoomStore, queue_len: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let store = store.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, store, queue_len).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
