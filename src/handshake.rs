//! Session handshake.
//!
//! Turns a session intent into a live WebSocket connection:
//!
//! ```text
//!   POST {server}api/v2/{resource}/{id}/actions/ssh   (Authorization: token)
//!        │
//!        ▼  2xx/3xx + Location
//!   WebSocket dial Location                           (Authorization: token)
//!        │
//!        ├─ 101 ──────────────► Connection
//!        └─ 302 + Location ──► dial once more ──► Connection | error
//! ```
//!
//! The indirection lets the server route the session to the right backend
//! worker; the client needs no routing logic. Nothing here retries.

use reqwest::{header::LOCATION, redirect::Policy, Url};
use serde::Deserialize;

use crate::constants::HTTP_REQUEST_TIMEOUT;
use crate::error::HandshakeError;
use crate::ws::{self, Dialed, WsReader, WsWriter};

/// Server and token for the current session context.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    /// Base URL of the API server, possibly without scheme or trailing slash.
    pub server_url: String,
    /// Raw token sent as the `Authorization` header value.
    pub token: String,
}

/// Source of credentials for a session.
///
/// Credential lookup and caching live outside the tunnel; this is the only
/// thing the handshake asks of them.
pub trait SessionContext {
    /// Resolve the server URL and token to use.
    fn credentials(&self) -> anyhow::Result<SessionCredentials>;
}

impl SessionContext for SessionCredentials {
    fn credentials(&self) -> anyhow::Result<SessionCredentials> {
        Ok(self.clone())
    }
}

/// A freshly established connection, not yet wrapped in a session.
#[derive(Debug)]
pub struct Connection {
    /// Write half of the socket.
    pub writer: WsWriter,
    /// Read half of the socket.
    pub reader: WsReader,
    /// Token the connection was authorized with.
    pub token: String,
    /// WebSocket URL the connection was finally established on.
    pub endpoint: String,
}

/// Adds a scheme and trailing slash to a server URL when missing.
pub fn normalize_server_url(server: &str) -> String {
    let mut url = server.trim().to_string();
    if !url.starts_with("http") {
        url = format!("http://{url}");
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// URL of the action that starts a shell session on `target`.
pub fn session_action_url(server: &str, resource: &str, target: &str) -> String {
    format!(
        "{}api/v2/{}/{}/actions/ssh",
        normalize_server_url(server),
        resource,
        target
    )
}

/// URL of a job's description.
pub fn job_url(server: &str, job_id: &str) -> String {
    format!("{}api/v2/jobs/{}", normalize_server_url(server), job_id)
}

/// HTTP client that never follows redirects, so `Location` can be inspected.
fn http_client() -> Result<reqwest::Client, HandshakeError> {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|source| HandshakeError::Request {
            url: String::new(),
            source,
        })
}

/// Resolves a possibly relative `Location` against the URL that returned it.
fn resolve_location(base: &str, location: &str) -> Result<String, HandshakeError> {
    let base = Url::parse(base).map_err(|_parse_error| HandshakeError::InvalidUrl {
        url: base.to_string(),
    })?;
    base.join(location)
        .map(String::from)
        .map_err(|_parse_error| HandshakeError::InvalidUrl {
            url: location.to_string(),
        })
}

/// Starts a remote shell on `target` and connects to it.
///
/// # Errors
///
/// Any failure is terminal: context resolution, the HTTP call, a status
/// other than 2xx/3xx, a missing `Location`, or a failed WebSocket dial.
pub async fn open_session<C: SessionContext + ?Sized>(
    context: &C,
    resource: &str,
    target: &str,
) -> Result<Connection, HandshakeError> {
    let creds = context.credentials().map_err(HandshakeError::Context)?;
    let url = session_action_url(&creds.server_url, resource, target);
    let client = http_client()?;

    log::info!("[Handshake] Requesting session for {} via {}", target, url);
    let response = client
        .post(&url)
        .header(reqwest::header::AUTHORIZATION, &creds.token)
        .send()
        .await
        .map_err(|source| HandshakeError::Request {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        log::warn!("[Handshake] Server refused session for {}: {}", target, status);
        return Err(HandshakeError::Status {
            target: target.to_string(),
            status,
        });
    }

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HandshakeError::MissingLocation { url: url.clone() })?;

    // Drain the body so the connection is reusable and read errors surface.
    response
        .bytes()
        .await
        .map_err(|source| HandshakeError::Request {
            url: url.clone(),
            source,
        })?;

    let endpoint = resolve_location(&url, &location)?;
    dial_with_redirect(&endpoint, &creds.token).await
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    data: Option<JobData>,
}

#[derive(Debug, Deserialize)]
struct JobData {
    stream_uri: Option<String>,
}

/// Looks up the live output endpoint of `job_id` and connects to it.
///
/// # Errors
///
/// Terminal on context, HTTP or status failures, on a response without
/// `data.stream_uri`, and on a failed WebSocket dial.
pub async fn open_stream<C: SessionContext + ?Sized>(
    context: &C,
    job_id: &str,
) -> Result<Connection, HandshakeError> {
    let creds = context.credentials().map_err(HandshakeError::Context)?;
    let url = job_url(&creds.server_url, job_id);
    let client = http_client()?;

    log::info!("[Handshake] Looking up stream for job {}", job_id);
    let response = client
        .get(&url)
        .header(reqwest::header::AUTHORIZATION, &creds.token)
        .send()
        .await
        .map_err(|source| HandshakeError::Request {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HandshakeError::Status {
            target: job_id.to_string(),
            status,
        });
    }

    let job: JobResponse = response
        .json()
        .await
        .map_err(|source| HandshakeError::Request {
            url: url.clone(),
            source,
        })?;

    let stream_uri = job
        .data
        .and_then(|data| data.stream_uri)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| HandshakeError::MissingStreamUri {
            job: job_id.to_string(),
        })?;

    let endpoint = resolve_location(&url, &stream_uri)?;
    dial_with_redirect(&endpoint, &creds.token).await
}

/// Dials `url`, following at most one redirect answer.
///
/// # Errors
///
/// Fails when either dial fails or the second hop redirects again.
pub async fn dial_with_redirect(url: &str, token: &str) -> Result<Connection, HandshakeError> {
    let headers = [("Authorization", token)];
    let first = ws::http_to_ws_scheme(url);

    log::info!("[Handshake] Dialing {}", first);
    let location = match ws::dial(&first, &headers).await? {
        Dialed::Connected { writer, reader } => {
            return Ok(Connection {
                writer,
                reader,
                token: token.to_string(),
                endpoint: first,
            });
        }
        Dialed::Redirect { location } => location,
    };

    let second = ws::http_to_ws_scheme(&resolve_location(&first, &location)?);
    log::info!("[Handshake] Redirected, dialing {}", second);
    match ws::dial(&second, &headers).await? {
        Dialed::Connected { writer, reader } => Ok(Connection {
            writer,
            reader,
            token: token.to_string(),
            endpoint: second,
        }),
        Dialed::Redirect { .. } => Err(HandshakeError::TooManyRedirects { url: second }),
    }
}
