//! Resize notifier.
//!
//! Resize detection is platform specific: unix delivers `SIGWINCH`, other
//! platforms have to poll. Both sit behind [`ResizeEvents`] so the pump only
//! ever sees "the terminal may have a new size".

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};

use super::completion::StopReason;
use super::FrameSender;
use crate::config::ResizeMode;
use crate::error::TunnelError;
use crate::frame::{Frame, TerminalSize};
use crate::terminal;

/// Size lookup used by the detectors.
pub type SizeQuery = Box<dyn FnMut() -> Result<TerminalSize> + Send>;

/// Source of terminal size changes.
#[async_trait]
pub trait ResizeEvents: Send {
    /// Size right now, used for the initial resize frame.
    fn current(&mut self) -> Result<TerminalSize>;

    /// Waits for the next trigger and returns the size at that moment.
    ///
    /// `None` means no further events will ever arrive.
    async fn changed(&mut self) -> Option<Result<TerminalSize>>;
}

/// Signal-driven detector (`SIGWINCH`).
#[cfg(unix)]
pub struct SignalResize {
    signal: tokio::signal::unix::Signal,
    query: SizeQuery,
}

#[cfg(unix)]
impl SignalResize {
    /// Registers for `SIGWINCH`.
    ///
    /// # Errors
    ///
    /// Fails if the signal handler cannot be installed.
    pub fn new(query: SizeQuery) -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let signal = signal(SignalKind::from_raw(signal_hook::consts::SIGWINCH))?;
        Ok(Self { signal, query })
    }
}

#[cfg(unix)]
impl fmt::Debug for SignalResize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalResize").finish_non_exhaustive()
    }
}

#[cfg(unix)]
#[async_trait]
impl ResizeEvents for SignalResize {
    fn current(&mut self) -> Result<TerminalSize> {
        (self.query)()
    }

    async fn changed(&mut self) -> Option<Result<TerminalSize>> {
        self.signal.recv().await?;
        Some((self.query)())
    }
}

/// Interval-driven detector; reports only sizes that differ from the last.
pub struct PollResize {
    ticker: Interval,
    last: Option<TerminalSize>,
    failing: bool,
    query: SizeQuery,
}

impl PollResize {
    /// Polls `query` every `interval`. Must be called inside a runtime.
    pub fn new(interval: Duration, query: SizeQuery) -> Self {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            ticker,
            last: None,
            failing: false,
            query,
        }
    }
}

impl fmt::Debug for PollResize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollResize")
            .field("last", &self.last)
            .field("failing", &self.failing)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ResizeEvents for PollResize {
    fn current(&mut self) -> Result<TerminalSize> {
        let size = (self.query)()?;
        self.last = Some(size);
        Ok(size)
    }

    async fn changed(&mut self) -> Option<Result<TerminalSize>> {
        loop {
            self.ticker.tick().await;
            match (self.query)() {
                Ok(size) => {
                    self.failing = false;
                    if self.last != Some(size) {
                        self.last = Some(size);
                        return Some(Ok(size));
                    }
                }
                // Report a failure once, not on every tick.
                Err(e) if !self.failing => {
                    self.failing = true;
                    return Some(Err(e));
                }
                Err(_) => {}
            }
        }
    }
}

/// Picks the detector for `mode` on this platform, querying the real terminal.
///
/// # Errors
///
/// Fails if signal mode is requested where it is unavailable or cannot be
/// registered.
pub fn detect(mode: ResizeMode, poll_interval: Duration) -> Result<Box<dyn ResizeEvents>> {
    let query: SizeQuery = Box::new(terminal::query_size);
    match mode {
        ResizeMode::Poll => Ok(Box::new(PollResize::new(poll_interval, query))),
        #[cfg(unix)]
        ResizeMode::Auto | ResizeMode::Signal => Ok(Box::new(SignalResize::new(query)?)),
        #[cfg(not(unix))]
        ResizeMode::Auto => Ok(Box::new(PollResize::new(poll_interval, query))),
        #[cfg(not(unix))]
        ResizeMode::Signal => anyhow::bail!("signal-based resize detection needs a unix platform"),
    }
}

/// Emits a resize frame for every size change.
///
/// Size query failures are logged and skipped. Once the source runs dry the
/// pump idles until the session ends; only a failed write stops it.
pub async fn pump_resize(
    mut events: Box<dyn ResizeEvents>,
    sender: FrameSender,
) -> Result<StopReason, TunnelError> {
    while let Some(event) = events.changed().await {
        match event {
            Ok(size) => {
                log::debug!("[Session] Terminal resized to {}x{}", size.width, size.height);
                sender.send_frame(&Frame::Resize(size)).await?;
            }
            Err(e) => log::warn!("[Session] Could not get terminal size: {:#}", e),
        }
    }
    log::debug!("[Session] Resize source ended");
    std::future::pending().await
}
