//! Remote output pump.
//!
//! Owns the read half of the connection and the read deadline. The deadline
//! is armed at `pong_wait` and only re-armed when a pong arrives, so a peer
//! that stops answering pings is detected within one deadline even while it
//! keeps sending output.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::completion::StopReason;
use crate::constants::CLOSE_NORMAL;
use crate::error::TunnelError;
use crate::ws::{WsMessage, WsReader};

/// Copies every binary message verbatim to `output`.
pub async fn pump_output<W>(
    mut reader: WsReader,
    mut output: W,
    pong_wait: Duration,
) -> Result<StopReason, TunnelError>
where
    W: AsyncWrite + Unpin,
{
    let mut deadline = Instant::now() + pong_wait;
    loop {
        let message = match tokio::time::timeout_at(deadline, reader.recv()).await {
            Err(_elapsed) => return Err(TunnelError::ReadTimeout),
            Ok(None) => return Err(TunnelError::ConnectionLost),
            Ok(Some(Err(e))) => return Err(TunnelError::Transport(e)),
            Ok(Some(Ok(message))) => message,
        };

        match message {
            WsMessage::Binary(data) => {
                output.write_all(&data).await?;
                output.flush().await?;
            }
            WsMessage::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                log::trace!("[Session] Pong received, read deadline extended");
            }
            // tungstenite queues the pong reply itself
            WsMessage::Ping(_) => {}
            WsMessage::Text(_) => return Err(TunnelError::UnexpectedMessage("text")),
            WsMessage::Close { code, .. } if code == CLOSE_NORMAL => {
                log::info!("[Session] Remote closed the session");
                return Ok(StopReason::RemoteClosed);
            }
            WsMessage::Close { code, reason } => {
                return Err(TunnelError::Closed { code, reason });
            }
        }
    }
}
