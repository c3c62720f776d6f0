//! Typed errors for the tunnel.
//!
//! Handshake failures are fatal before a session exists; tunnel errors end a
//! running session through the pump that hit them.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while encoding or decoding client frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A frame must carry at least its tag byte.
    #[error("empty frame")]
    Empty,
    /// First byte is not a known frame tag.
    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),
    /// Resize payload is not a `{height, width}` JSON object.
    #[error("malformed resize payload")]
    Resize(#[from] serde_json::Error),
}

/// Errors that prevent a session from being established.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The session context could not supply a server or token.
    #[error("could not resolve session context")]
    Context(#[source] anyhow::Error),
    /// A URL in the handshake could not be parsed.
    #[error("invalid URL {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },
    /// The HTTP request could not be sent or its body read.
    #[error("request to {url} failed")]
    Request {
        /// Request URL.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a status that cannot start a session.
    #[error("server refused {target}: {status}")]
    Status {
        /// Target identifier.
        target: String,
        /// HTTP status returned by the server.
        status: reqwest::StatusCode,
    },
    /// A redirect answer carried no usable `Location` header.
    #[error("response from {url} has no usable Location header")]
    MissingLocation {
        /// URL that answered.
        url: String,
    },
    /// The job lookup answer did not contain a stream endpoint.
    #[error("no stream_uri in response for job {job}")]
    MissingStreamUri {
        /// Job identifier.
        job: String,
    },
    /// The WebSocket dial failed.
    #[error("WebSocket dial to {url} failed")]
    Dial {
        /// URL that was dialed.
        url: String,
        /// Underlying transport error.
        #[source]
        source: Box<tungstenite::Error>,
    },
    /// The WebSocket endpoint redirected again after the one allowed hop.
    #[error("WebSocket endpoint {url} redirected more than once")]
    TooManyRedirects {
        /// URL of the second hop.
        url: String,
    },
}

/// Errors that end a running session.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// A write did not complete within the write deadline.
    #[error("write deadline exceeded")]
    WriteTimeout,
    /// No pong arrived within the read deadline.
    #[error("read deadline exceeded, no pong from peer")]
    ReadTimeout,
    /// The transport rejected a write or a read.
    #[error("transport error")]
    Transport(#[from] anyhow::Error),
    /// The peer sent a message kind the protocol does not use.
    #[error("unexpected {0} message from peer")]
    UnexpectedMessage(&'static str),
    /// The peer closed with a code other than normal closure.
    #[error("connection closed by peer (code {code}: {reason})")]
    Closed {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
    /// The inbound stream ended without a close frame.
    #[error("connection lost")]
    ConnectionLost,
    /// Local terminal I/O failed.
    #[error("local terminal I/O failed")]
    Io(#[from] std::io::Error),
    /// A frame could not be encoded.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The local terminal could not be prepared.
    #[error("could not set up local terminal")]
    Terminal(#[source] anyhow::Error),
    /// A pump stopped without reporting how (panic).
    #[error("{0} pump aborted")]
    Aborted(&'static str),
}
