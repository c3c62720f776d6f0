//! Shared WebSocket transport.
//!
//! Thin wrapper around `tokio-tungstenite` providing type-isolated
//! reader/writer halves. The session layer never touches `tokio-tungstenite`
//! directly; it only sees [`WsWriter`], [`WsReader`] and [`WsMessage`].
//!
//! # Architecture
//!
//! A single [`dial`] function handles URL→request building, header
//! insertion, and TLS negotiation. It either returns a ([`WsWriter`],
//! [`WsReader`]) pair or surfaces a redirect answer so the handshake can
//! decide whether to follow it.

// Rust guideline compliant 2026-02

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use crate::error::HandshakeError;

/// Concrete WebSocket stream type (avoids repeating the 6-line generic everywhere).
type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Received WebSocket message.
#[derive(Debug)]
pub enum WsMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping frame with payload.
    Ping(Vec<u8>),
    /// Pong frame with payload.
    Pong(Vec<u8>),
    /// Close frame with status code and reason.
    Close {
        /// WebSocket close code (1000 = normal, 1005 = no code).
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Send a binary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails (connection closed, I/O error).
    pub async fn send_binary(&mut self, data: Vec<u8>) -> anyhow::Result<()> {
        self.sink
            .send(tungstenite::Message::Binary(data))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send_binary failed: {e}"))
    }

    /// Send a ping control frame with an empty payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails.
    pub async fn send_ping(&mut self) -> anyhow::Result<()> {
        self.sink
            .send(tungstenite::Message::Ping(Vec::new()))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send_ping failed: {e}"))
    }

    /// Flush pending writes and close the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if closing fails.
    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.sink
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket close failed: {e}"))
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message, returning `None` when the stream ends.
    ///
    /// Raw `Frame` variants are skipped internally.
    pub async fn recv(&mut self) -> Option<anyhow::Result<WsMessage>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(WsMessage::Text(text)));
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Some(Ok(WsMessage::Binary(data)));
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    return Some(Ok(WsMessage::Ping(data)));
                }
                Some(Ok(tungstenite::Message::Pong(data))) => {
                    return Some(Ok(WsMessage::Pong(data)));
                }
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WsMessage::Close { code, reason }));
                }
                Some(Ok(tungstenite::Message::Frame(_))) => {
                    // Raw frames, skip
                    continue;
                }
                Some(Err(e)) => {
                    return Some(Err(anyhow::anyhow!("WebSocket read error: {e}")));
                }
                None => return None,
            }
        }
    }
}

/// Outcome of a single WebSocket dial.
#[derive(Debug)]
pub enum Dialed {
    /// Upgrade succeeded.
    Connected {
        /// Write half.
        writer: WsWriter,
        /// Read half.
        reader: WsReader,
    },
    /// The endpoint answered with a redirect instead of upgrading.
    Redirect {
        /// Raw `Location` header value (may be relative).
        location: String,
    },
}

/// Dial a WebSocket URL with optional headers.
///
/// Builds an HTTP request from `url`, inserts each `(name, value)` header,
/// then performs the WebSocket handshake. A 3xx answer is returned as
/// [`Dialed::Redirect`] rather than an error; following it is the caller's
/// decision.
///
/// # Errors
///
/// Returns [`HandshakeError::Dial`] if the URL or a header is malformed or
/// the handshake fails, and [`HandshakeError::MissingLocation`] for a
/// redirect without a readable `Location`.
pub async fn dial(url: &str, headers: &[(&str, &str)]) -> Result<Dialed, HandshakeError> {
    use tungstenite::client::IntoClientRequest;

    let dial_error = |source: tungstenite::Error| HandshakeError::Dial {
        url: url.to_string(),
        source: Box::new(source),
    };

    let mut request = url.into_client_request().map_err(dial_error)?;

    for &(name, value) in headers {
        let header_name = tungstenite::http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| dial_error(tungstenite::Error::HttpFormat(e.into())))?;
        let header_value = tungstenite::http::HeaderValue::from_str(value)
            .map_err(|e| dial_error(tungstenite::Error::HttpFormat(e.into())))?;
        request.headers_mut().insert(header_name, header_value);
    }

    match tokio_tungstenite::connect_async(request).await {
        Ok((ws_stream, _response)) => {
            let (sink, stream) = ws_stream.split();
            Ok(Dialed::Connected {
                writer: WsWriter { sink },
                reader: WsReader { stream },
            })
        }
        Err(tungstenite::Error::Http(response)) if response.status().is_redirection() => {
            let location = response
                .headers()
                .get(tungstenite::http::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| HandshakeError::MissingLocation {
                    url: url.to_string(),
                })?;
            Ok(Dialed::Redirect {
                location: location.to_string(),
            })
        }
        Err(e) => Err(dial_error(e)),
    }
}

/// Convert an HTTP(S) URL to WS(S) scheme.
///
/// Passes `ws://` and `wss://` through unchanged.
#[must_use]
pub fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}
