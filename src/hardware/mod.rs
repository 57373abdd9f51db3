//! Outbound hardware command client — issues the `CMD:OPEN\n` line to a
//! gate controller's ip:port. Mirrors this codebase's general async-client
//! shape (bounded timeout, warn-and-continue on failure) without any of the
//! gateway's request/response framing, since the device expects no reply
//! beyond whatever bytes it happens to send back.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::warn;

const OPEN_COMMAND: &[u8] = b"CMD:OPEN\n";

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("connect/send to {0} timed out")]
    Timeout(String),
    #[error("io error talking to {0}: {1}")]
    Io(String, #[source] std::io::Error),
}

/// Sends the open command and waits (briefly) for any reply, purely for
/// logging — a missing or garbled reply does not change the outcome.
pub async fn send_open_command(
    ip: &str,
    port: u16,
    command_timeout: Duration,
) -> Result<(), HardwareError> {
    let addr = format!("{ip}:{port}");
    let result = timeout(command_timeout, open_and_send(&addr)).await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(device = %addr, error = %e, "hardware open command failed");
            Err(HardwareError::Io(addr, e))
        }
        Err(_) => {
            warn!(device = %addr, "hardware open command timed out");
            Err(HardwareError::Timeout(addr))
        }
    }
}

/// Best-effort connectivity probe for the admin dashboard's gate listing —
/// a bare TCP connect within a short timeout, no command sent.
pub async fn check_online(ip: &str, port: u16, probe_timeout: Duration) -> bool {
    let addr = format!("{ip}:{port}");
    matches!(timeout(probe_timeout, TcpStream::connect(&addr)).await, Ok(Ok(_)))
}

async fn open_and_send(addr: &str) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(OPEN_COMMAND).await?;
    stream.flush().await?;

    let mut buf = [0u8; 64];
    // Best-effort read; the device's reply (if any) is logged, never parsed.
    let _ = stream.read(&mut buf).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn sends_open_command_to_listening_device() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16];
            let n = socket.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        send_open_command(&addr.ip().to_string(), addr.port(), Duration::from_secs(2))
            .await
            .unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, OPEN_COMMAND);
    }

    #[tokio::test]
    async fn times_out_against_an_unreachable_host() {
        // TEST-NET-1, guaranteed non-routable: no connection will complete.
        let result = send_open_command("192.0.2.1", 5005, Duration::from_millis(50)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn check_online_true_for_listening_device() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _keep_alive = tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        assert!(check_online(&addr.ip().to_string(), addr.port(), Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn check_online_false_for_unreachable_host() {
        assert!(!check_online("192.0.2.1", 5005, Duration::from_millis(50)).await);
    }
}
