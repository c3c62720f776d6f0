//! Local input pumps.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::completion::StopReason;
use super::FrameSender;
use crate::constants::INPUT_READ_SIZE;
use crate::error::TunnelError;
use crate::frame::Frame;

/// Forwards local input to the remote side, one input frame per read.
///
/// In raw mode every read returns as soon as any bytes are available, so
/// keystrokes and control characters go out immediately rather than per line.
pub async fn pump_input<R>(mut input: R, sender: FrameSender) -> Result<StopReason, TunnelError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; INPUT_READ_SIZE];
    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            log::info!("[Session] Local input closed");
            return Ok(StopReason::InputClosed);
        }
        sender.send_frame(&Frame::Input(buf[..n].to_vec())).await?;
    }
}

/// Waits for a single keypress and ends the session. Nothing is forwarded.
///
/// Closed input has no keys to press, so EOF leaves the session running.
pub async fn detach_on_keypress<R>(mut input: R) -> Result<StopReason, TunnelError>
where
    R: AsyncRead + Unpin,
{
    let mut byte = [0u8; 1];
    if input.read(&mut byte).await? == 0 {
        log::debug!("[Session] Local input closed, detach disabled");
        return std::future::pending().await;
    }
    Ok(StopReason::Detached)
}
