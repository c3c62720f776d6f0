//! Application-wide constants for wsterm.
//!
//! Centralizes the timing defaults and wire constants so the session,
//! handshake and configuration layers agree on them.
//!
//! # Categories
//!
//! - **Timeouts**: write deadline, read (pong) deadline, HTTP timeout
//! - **Polling**: keepalive and resize polling intervals
//! - **Protocol**: close codes and API paths

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// HTTP client request timeout for the session-initiation call.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed to write a single frame to the peer.
pub const WRITE_WAIT: Duration = Duration::from_secs(2);

/// Time allowed to read the next pong from the peer.
///
/// The output pump fails its read once this elapses without a pong.
pub const PONG_WAIT: Duration = Duration::from_secs(10);

/// Write deadline for stream watchers, which only ever write pings.
pub const STREAM_WRITE_WAIT: Duration = Duration::from_secs(5);

/// Pong deadline for stream watchers.
pub const STREAM_PONG_WAIT: Duration = Duration::from_secs(20);

/// Ping period for stream watchers. Must stay below [`STREAM_PONG_WAIT`].
pub const STREAM_PING_PERIOD: Duration = Duration::from_secs(9);

// ============================================================================
// Polling
// ============================================================================

/// Keepalive period as a fraction of the pong deadline (numerator / 10).
pub const PING_PERIOD_TENTHS: u32 = 9;

/// Interval for the polling resize detector.
///
/// Used where no resize signal exists (Windows), or when configured.
pub const RESIZE_POLL_INTERVAL: Duration = Duration::from_millis(1000);

// ============================================================================
// Protocol
// ============================================================================

/// WebSocket close code for orderly termination.
pub const CLOSE_NORMAL: u16 = 1000;

/// Number of pumps an interactive session runs (input, output, resize,
/// keepalive, shutdown signals).
pub const SESSION_PUMP_COUNT: usize = 5;

/// Default API resource whose `actions/ssh` endpoint starts sessions.
pub const DEFAULT_RESOURCE: &str = "machines";

/// Default server when none is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Size of the buffer used for one read of local input.
pub const INPUT_READ_SIZE: usize = 1024;
