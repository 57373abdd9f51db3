//! Publish-only live feed — simpler than `gateway/websocket.rs`'s
//! bidirectional OC-protocol relay: no handshake, no inbound dispatch,
//! just a broadcast subscription forwarded verbatim as JSON text frames.

use axum::extract::ws::{Message, WebSocket};
use tracing::debug;

use super::AdminState;

pub async fn handle_socket(mut socket: WebSocket, state: AdminState) {
    let mut rx = state.engine.events().subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                let value = match event {
                    Ok(value) => value,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "live feed subscriber lagged, dropping oldest events");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                let text = match serde_json::to_string(&value) {
                    Ok(text) => text,
                    Err(_) => continue,
                };

                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                // Publish-only: a closed or erroring inbound stream means
                // the client disconnected. Any inbound frame is ignored.
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
