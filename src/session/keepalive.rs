//! Keepalive pump.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::completion::StopReason;
use super::FrameSender;
use crate::error::TunnelError;

/// Sends a ping every `ping_period`, first one a full period after start.
///
/// Returns only when a ping cannot be written.
pub async fn pump_keepalive(
    sender: FrameSender,
    ping_period: Duration,
) -> Result<StopReason, TunnelError> {
    let mut ticker = tokio::time::interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        sender.send_ping().await?;
        log::trace!("[Session] Ping sent");
    }
}
