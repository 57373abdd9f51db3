//! Ingress Dispatcher — one accept loop, one worker task per connection,
//! same shape as the gateway's `TcpListener` + per-connection spawn in
//! `gateway/server.rs`, minus the HTTP/WebSocket upgrade: this is a bare
//! line-oriented TCP protocol.

mod protocol;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::engine::Engine;

pub use protocol::{parse_frame, Frame};

const MAX_FRAME_BYTES: usize = 1024;

pub async fn run(
    addr: SocketAddr,
    engine: Arc<Engine>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "ingress dispatcher listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "failed to accept ingress connection");
                        continue;
                    }
                };
                let engine = engine.clone();
                tokio::spawn(async move {
                    handle_connection(socket, peer, engine).await;
                });
            }
            _ = shutdown_rx.recv() => {
                info!("ingress dispatcher shutting down");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(socket: TcpStream, peer: SocketAddr, engine: Arc<Engine>) {
    let device_ip = peer.ip().to_string();
    let mut lines = BufReader::new(socket).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(ip = %device_ip, error = %e, "ingress read error");
                break;
            }
        };

        if line.len() > MAX_FRAME_BYTES {
            warn!(ip = %device_ip, len = line.len(), "oversized frame dropped");
            continue;
        }

        match parse_frame(&line) {
            Frame::Heartbeat => {
                debug!(ip = %device_ip, "heartbeat");
                engine.handle_heartbeat(&device_ip).await;
            }
            Frame::Scan { kind, value } => {
                let _ = engine.handle_scan(&device_ip, kind, &value).await;
            }
            Frame::Invalid => {
                debug!(ip = %device_ip, raw = %line, "unrecognized frame dropped");
            }
        }
    }
}
