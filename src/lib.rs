//! wsterm - interactive remote terminal tunnel.
//!
//! Turns the local terminal into a byte stream multiplexed over a single
//! WebSocket connection to a remote command execution endpoint, with
//! resize notifications and keepalive pings on the same channel.
//!
//! # Architecture
//!
//! - **Handshake** - HTTP request, redirect to a WebSocket endpoint, dial
//! - **Session** - input, output, resize and keepalive pumps over one
//!   connection, torn down when the first one finishes
//! - **Terminal** - raw mode held by a guard for the session lifetime
//!
//! # Modules
//!
//! - [`frame`] - client-to-server wire frames
//! - [`handshake`] - session initiation and WebSocket dial
//! - [`session`] - pumps and completion coordination
//! - [`config`] - configuration loading

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod session;
pub mod terminal;
pub mod ws;

// Re-export commonly used types
pub use config::{Config, ResizeMode};
pub use error::{FrameError, HandshakeError, TunnelError};
pub use frame::{Frame, TerminalSize};
pub use handshake::{Connection, SessionContext, SessionCredentials};
pub use session::{InputMode, Session, SessionEnd, SessionIo, Timings};
