//! Acquirer simulator — entry point.
//!
//! A tiny stand-in for the upstream acquirer, used for local gateway
//! runs and demos.  It accepts framed connections, unpacks each inbound
//! message with the shared codec, and answers `0800` echo requests with
//! `0810` responses that echo DE11 and DE70 under a fresh DE7.
//!
//! Anything that is not an echo request is logged and ignored; a frame
//! that fails to decode is logged and the connection kept, mirroring how
//! the gateway itself treats codec errors.
//!
//! # Usage
//!
//! ```text
//! isogw-simnet --listen 127.0.0.1:5001
//! ```

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use isogw_core::{pack, unpack, Message};

/// A silent client is dropped after this long without a frame.
const READ_IDLE: Duration = Duration::from_secs(120);

/// Acquirer simulator for the ISO 8583 gateway.
#[derive(Debug, Parser)]
#[command(name = "isogw-simnet", version)]
struct Cli {
    /// Listen address for framed gateway connections.
    #[arg(long, default_value = "127.0.0.1:5001", env = "ISOGW_SIMNET_LISTEN")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let listener = TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("failed to bind on {}", cli.listen))?;
    info!("simnet listening on {}", cli.listen);

    loop {
        match listener.accept().await {
            Ok((sock, peer)) => {
                info!("client {peer} connected");
                tokio::spawn(async move {
                    if let Err(e) = handle(sock).await {
                        warn!("client {peer} dropped: {e}");
                    } else {
                        info!("client {peer} disconnected");
                    }
                });
            }
            Err(e) => warn!("accept error: {e}"),
        }
    }
}

/// Serves one gateway connection until EOF, error, or idle timeout.
async fn handle(mut sock: TcpStream) -> std::io::Result<()> {
    loop {
        let frame = tokio::time::timeout(READ_IDLE, read_frame(&mut sock))
            .await
            .map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::TimedOut, "idle too long")
            })??;

        let request = match unpack(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("unpack error: {e}");
                continue;
            }
        };
        info!("RX {} fields={:?}", request.mti, request.fields.keys());

        if request.mti != "0800" {
            continue;
        }
        let response = echo_response(&request);
        match pack(&response) {
            Ok(wire) => {
                sock.write_all(&wire).await?;
                info!("TX 0810 echo resp STAN={}", response.get(11).unwrap_or("-"));
            }
            Err(e) => warn!("pack response error: {e}"),
        }
    }
}

/// Reads one `[2B MLI][body]` frame, MLI prefix included.
async fn read_frame(sock: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut mli = [0u8; 2];
    sock.read_exact(&mut mli).await?;
    let len = u16::from_be_bytes(mli) as usize;
    let mut frame = vec![0u8; 2 + len];
    frame[..2].copy_from_slice(&mli);
    sock.read_exact(&mut frame[2..]).await?;
    Ok(frame)
}

/// Builds the `0810` reply to an echo request: DE11 and DE70 echoed,
/// DE7 freshly stamped.
fn echo_response(request: &Message) -> Message {
    let mut response = Message::new("0810");
    response.set(7, Utc::now().format("%m%d%H%M%S").to_string());
    if let Some(stan) = request.get(11) {
        response.set(11, stan);
    }
    if let Some(code) = request.get(70) {
        response.set(70, code);
    }
    response
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use isogw_core::{is_echo_response, new_echo_request};

    #[test]
    fn test_echo_response_mirrors_stan_and_code() {
        let request = new_echo_request(123_456);
        let response = echo_response(&request);
        assert_eq!(response.mti, "0810");
        assert_eq!(response.get(11), Some("123456"));
        assert_eq!(response.get(70), Some("301"));
        assert!(is_echo_response(&response));
    }

    #[test]
    fn test_echo_response_packs() {
        let response = echo_response(&new_echo_request(7));
        assert!(pack(&response).is_ok());
    }

    #[test]
    fn test_echo_response_without_stan_is_not_valid_echo() {
        let mut request = Message::new("0800");
        request.set(70, "301");
        let response = echo_response(&request);
        assert!(!is_echo_response(&response), "no DE11 to echo back");
    }
}
