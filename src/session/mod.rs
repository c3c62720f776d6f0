//! Interactive session over one WebSocket connection.
//!
//! # Architecture
//!
//! ```text
//!              ┌─────────── FrameSender (one mutex) ───────────┐
//!   stdin ──► input pump ──┐                                   │
//!   SIGWINCH/poll ──► resize pump ──┼──► WsWriter ──► remote   │
//!   ticker ──► keepalive pump ──┘                              │
//!              └───────────────────────────────────────────────┘
//!   remote ──► WsReader ──► output pump ──► stdout
//!
//!   every pump ──► Completion ──► first exit ──► cancel, close, restore
//! ```
//!
//! The writer is the only shared state. Each pump reports exactly once; the
//! first report ends the session.

pub mod completion;
pub mod input;
pub mod keepalive;
pub mod output;
pub mod resize;
pub mod signals;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use crate::constants::{
    PING_PERIOD_TENTHS, PONG_WAIT, SESSION_PUMP_COUNT, STREAM_PING_PERIOD, STREAM_PONG_WAIT,
    STREAM_WRITE_WAIT, WRITE_WAIT,
};
use crate::error::TunnelError;
use crate::frame::Frame;
use crate::handshake::Connection;
use crate::terminal::{RawModeGuard, TerminalMode};
use crate::ws::{WsReader, WsWriter};

pub use completion::{Pump, StopReason};
pub use resize::{PollResize, ResizeEvents, SizeQuery};

/// Write, ping and read deadlines for a session.
///
/// Always satisfies `write_wait < ping_period < pong_wait`: a stalled write
/// is noticed before the next ping is due, and a lost ping/pong round trip
/// is noticed before the reader gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Deadline for a single write.
    pub write_wait: Duration,
    /// Read deadline, re-armed on every pong.
    pub pong_wait: Duration,
    /// Keepalive period.
    pub ping_period: Duration,
}

impl Timings {
    /// Builds timings, rejecting any that break the ordering.
    pub fn new(write_wait: Duration, pong_wait: Duration, ping_period: Duration) -> Result<Self> {
        if write_wait.is_zero() || write_wait >= ping_period || ping_period >= pong_wait {
            anyhow::bail!(
                "invalid timings: need 0 < write_wait ({:?}) < ping_period ({:?}) < pong_wait ({:?})",
                write_wait,
                ping_period,
                pong_wait
            );
        }
        Ok(Self {
            write_wait,
            pong_wait,
            ping_period,
        })
    }

    /// Timings with the ping period at 90% of the pong deadline.
    pub fn from_deadlines(write_wait: Duration, pong_wait: Duration) -> Result<Self> {
        Self::new(write_wait, pong_wait, pong_wait * PING_PERIOD_TENTHS / 10)
    }

    /// Defaults for interactive shells.
    pub fn interactive() -> Self {
        Self {
            write_wait: WRITE_WAIT,
            pong_wait: PONG_WAIT,
            ping_period: PONG_WAIT * PING_PERIOD_TENTHS / 10,
        }
    }

    /// Defaults for watch-only streams.
    pub fn stream() -> Self {
        Self {
            write_wait: STREAM_WRITE_WAIT,
            pong_wait: STREAM_PONG_WAIT,
            ping_period: STREAM_PING_PERIOD,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Serialized write path shared by every writing pump.
///
/// The lock is held across the whole write, deadline included, so frames
/// from different pumps never interleave.
#[derive(Debug, Clone)]
pub struct FrameSender {
    writer: Arc<Mutex<WsWriter>>,
    write_wait: Duration,
}

impl FrameSender {
    fn new(writer: WsWriter, write_wait: Duration) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            write_wait,
        }
    }

    /// Encodes and writes one frame as a binary message.
    pub async fn send_frame(&self, frame: &Frame) -> Result<(), TunnelError> {
        let payload = frame.encode()?;
        let mut writer = self.writer.lock().await;
        tokio::time::timeout(self.write_wait, writer.send_binary(payload))
            .await
            .map_err(|_elapsed| TunnelError::WriteTimeout)??;
        log::trace!("[Session] Sent {} frame", frame.kind());
        Ok(())
    }

    /// Writes a ping control frame.
    pub async fn send_ping(&self) -> Result<(), TunnelError> {
        let mut writer = self.writer.lock().await;
        tokio::time::timeout(self.write_wait, writer.send_ping())
            .await
            .map_err(|_elapsed| TunnelError::WriteTimeout)??;
        Ok(())
    }

    /// Sends a close frame and shuts the sink, bounded by the write deadline.
    async fn close(&self) {
        let result = tokio::time::timeout(self.write_wait, async {
            self.writer.lock().await.close().await
        })
        .await;
        match result {
            Ok(Ok(())) => log::debug!("[Session] Connection closed"),
            Ok(Err(e)) => log::debug!("[Session] Close failed: {:#}", e),
            Err(_elapsed) => log::debug!("[Session] Close timed out"),
        }
    }
}

/// Identity of an established session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Remote execution target.
    pub target: String,
    /// Token the session was authorized with.
    pub token: String,
    /// WebSocket URL the session runs on.
    pub endpoint: String,
}

/// What local input means for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Forward every keystroke.
    Interactive,
    /// Forward nothing; the first keystroke ends the session.
    DetachOnKeypress,
}

/// Local endpoints a session runs against.
pub struct SessionIo<R, W> {
    /// Local keyboard input.
    pub input: R,
    /// Local display.
    pub output: W,
    /// Terminal size source.
    pub resize: Box<dyn ResizeEvents>,
    /// How input is treated.
    pub input_mode: InputMode,
    /// Whether to end the session on `SIGTERM`/`SIGHUP`.
    pub watch_signals: bool,
}

impl<R, W> std::fmt::Debug for SessionIo<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIo")
            .field("input_mode", &self.input_mode)
            .field("watch_signals", &self.watch_signals)
            .finish_non_exhaustive()
    }
}

/// How a session ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// Pump whose exit ended the session.
    pub pump: Pump,
    /// Why it exited.
    pub reason: StopReason,
}

/// An established connection to one remote execution target.
#[derive(Debug)]
pub struct Session {
    info: SessionInfo,
    sender: FrameSender,
    reader: WsReader,
    timings: Timings,
}

impl Session {
    /// Wraps a handshake result.
    pub fn new(target: impl Into<String>, connection: Connection, timings: Timings) -> Self {
        let Connection {
            writer,
            reader,
            token,
            endpoint,
        } = connection;
        Self {
            info: SessionInfo {
                target: target.into(),
                token,
                endpoint,
            },
            sender: FrameSender::new(writer, timings.write_wait),
            reader,
            timings,
        }
    }

    /// Session identity.
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Runs the session with `terminal` held in raw mode throughout.
    ///
    /// Raw mode is released on every exit path, including pump failures.
    pub async fn attach<T, R, W>(
        self,
        terminal: T,
        io: SessionIo<R, W>,
    ) -> Result<SessionEnd, TunnelError>
    where
        T: TerminalMode,
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let _raw = RawModeGuard::engage(terminal).map_err(TunnelError::Terminal)?;
        self.run(io).await
    }

    /// Runs every pump until the first one finishes, then tears down.
    pub async fn run<R, W>(self, io: SessionIo<R, W>) -> Result<SessionEnd, TunnelError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            info,
            sender,
            reader,
            timings,
        } = self;
        let SessionIo {
            input,
            output,
            mut resize,
            input_mode,
            watch_signals,
        } = io;

        log::info!("[Session] Attached to {} at {}", info.target, info.endpoint);

        // The remote pty must be sized before any output is drawn.
        match resize.current() {
            Ok(size) => sender.send_frame(&Frame::Resize(size)).await?,
            Err(e) => log::warn!("[Session] Could not get terminal size: {:#}", e),
        }

        let (completion, waiter) = completion::channel(SESSION_PUMP_COUNT);

        match input_mode {
            InputMode::Interactive => {
                completion.spawn(Pump::Input, input::pump_input(input, sender.clone()));
            }
            InputMode::DetachOnKeypress => {
                completion.spawn(Pump::Detach, input::detach_on_keypress(input));
            }
        }
        completion.spawn(
            Pump::Output,
            output::pump_output(reader, output, timings.pong_wait),
        );
        completion.spawn(Pump::Resize, resize::pump_resize(resize, sender.clone()));
        completion.spawn(
            Pump::Keepalive,
            keepalive::pump_keepalive(sender.clone(), timings.ping_period),
        );
        if watch_signals {
            completion.spawn(Pump::Signals, signals::pump_shutdown_signals());
        }
        drop(completion);

        let first = waiter.first().await;
        sender.close().await;

        match first {
            Some(completion::PumpExit {
                pump,
                result: Ok(reason),
            }) => {
                log::info!("[Session] Ended by {} pump: {:?}", pump.name(), reason);
                Ok(SessionEnd { pump, reason })
            }
            Some(completion::PumpExit {
                pump,
                result: Err(e),
            }) => {
                log::error!("[Session] Ended by {} pump failure: {:#}", pump.name(), e);
                Err(e)
            }
            None => Err(TunnelError::ConnectionLost),
        }
    }
}
