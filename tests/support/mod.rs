//! In-process servers shared by the integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::WebSocketStream;

/// Server side of an accepted WebSocket.
pub type ServerWs = WebSocketStream<TcpStream>;

/// A WebSocket server bound to an ephemeral local port.
pub struct TestServer {
    /// `ws://` URL of the server.
    pub url: String,
    /// TCP connections accepted so far.
    pub connections: Arc<AtomicUsize>,
    /// `Authorization` header of every upgrade request.
    pub auth_headers: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.auth_headers.lock().unwrap().clone()
    }
}

/// Starts a WebSocket server that runs `handler` for every connection.
pub async fn ws_server<F, Fut>(handler: F) -> TestServer
where
    F: Fn(ServerWs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/session", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));
    let auth_headers = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let accepted = Arc::clone(&connections);
    let headers = Arc::clone(&auth_headers);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let headers = Arc::clone(&headers);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let callback =
                    move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        if let Some(value) = req.headers().get("Authorization") {
                            headers
                                .lock()
                                .unwrap()
                                .push(value.to_str().unwrap_or_default().to_string());
                        }
                        Ok(resp)
                    };
                if let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    handler(ws).await;
                }
            });
        }
    });

    TestServer {
        url,
        connections,
        auth_headers,
    }
}

/// Starts a plain HTTP server answering every request with a 302 to `location`.
///
/// Returns its `ws://` URL and a hit counter.
pub async fn redirect_server(location: String) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/first-hop", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let location = location.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    location
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (url, hits)
}

/// A `ws://` URL on which nothing is listening.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/gone", addr)
}
