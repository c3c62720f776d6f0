//! Integration tests for session initiation and the WebSocket dial.
//!
//! HTTP legs are served by wiremock; WebSocket endpoints are in-process
//! tokio-tungstenite servers.

mod support;

use futures_util::StreamExt;
use support::{dead_url, redirect_server, ws_server, ServerWs};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wsterm::handshake::{self, SessionCredentials};
use wsterm::HandshakeError;

/// Handler that keeps the socket open until the client goes away.
async fn hold_open(mut ws: ServerWs) {
    while let Some(Ok(_)) = ws.next().await {}
}

fn creds(server: &MockServer) -> SessionCredentials {
    SessionCredentials {
        server_url: server.uri(),
        token: "tok-123".to_string(),
    }
}

async fn mock_session_action(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/v2/machines/web-1/actions/ssh"))
        .and(header("Authorization", "tok-123"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

mod open_session_tests {
    use super::*;

    #[tokio::test]
    async fn dials_location_from_redirect() {
        let api = MockServer::start().await;
        let ws = ws_server(hold_open).await;
        mock_session_action(
            &api,
            ResponseTemplate::new(302).insert_header("Location", ws.url.as_str()),
        )
        .await;

        let connection = handshake::open_session(&creds(&api), "machines", "web-1")
            .await
            .unwrap();

        assert_eq!(connection.endpoint, ws.url);
        assert_eq!(connection.token, "tok-123");
        assert_eq!(ws.connection_count(), 1);
        assert_eq!(ws.auth_headers(), vec!["tok-123".to_string()]);
    }

    #[tokio::test]
    async fn success_status_with_location_dials_exactly_once() {
        let api = MockServer::start().await;
        let ws = ws_server(hold_open).await;
        mock_session_action(
            &api,
            ResponseTemplate::new(200).insert_header("Location", ws.url.as_str()),
        )
        .await;

        let connection = handshake::open_session(&creds(&api), "machines", "web-1")
            .await
            .unwrap();

        assert_eq!(connection.endpoint, ws.url);
        assert_eq!(ws.connection_count(), 1);
    }

    #[tokio::test]
    async fn http_location_is_dialed_as_websocket() {
        let api = MockServer::start().await;
        let ws = ws_server(hold_open).await;
        let http_location = ws.url.replacen("ws://", "http://", 1);
        mock_session_action(
            &api,
            ResponseTemplate::new(302).insert_header("Location", http_location.as_str()),
        )
        .await;

        let connection = handshake::open_session(&creds(&api), "machines", "web-1")
            .await
            .unwrap();
        assert_eq!(connection.endpoint, ws.url);
    }

    #[tokio::test]
    async fn error_status_is_fatal() {
        let api = MockServer::start().await;
        mock_session_action(&api, ResponseTemplate::new(403)).await;

        let result = handshake::open_session(&creds(&api), "machines", "web-1").await;
        match result {
            Err(HandshakeError::Status { status, target }) => {
                assert_eq!(status.as_u16(), 403);
                assert_eq!(target, "web-1");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_location_is_fatal() {
        let api = MockServer::start().await;
        mock_session_action(&api, ResponseTemplate::new(302)).await;

        let result = handshake::open_session(&creds(&api), "machines", "web-1").await;
        assert!(matches!(result, Err(HandshakeError::MissingLocation { .. })));
    }

    #[tokio::test]
    async fn unreachable_api_is_fatal() {
        let creds = SessionCredentials {
            server_url: "http://127.0.0.1:1".to_string(),
            token: "tok-123".to_string(),
        };
        let result = handshake::open_session(&creds, "machines", "web-1").await;
        assert!(matches!(result, Err(HandshakeError::Request { .. })));
    }

    #[tokio::test]
    async fn failed_dial_is_fatal() {
        let api = MockServer::start().await;
        let dead = dead_url().await;
        mock_session_action(
            &api,
            ResponseTemplate::new(302).insert_header("Location", dead.as_str()),
        )
        .await;

        let result = handshake::open_session(&creds(&api), "machines", "web-1").await;
        assert!(matches!(result, Err(HandshakeError::Dial { .. })));
    }
}

mod redirect_tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn follows_one_websocket_redirect() {
        let ws = ws_server(hold_open).await;
        let (first_hop, hits) = redirect_server(ws.url.clone()).await;

        let connection = handshake::dial_with_redirect(&first_hop, "tok-123")
            .await
            .unwrap();

        assert_eq!(connection.endpoint, ws.url);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ws.connection_count(), 1);
        assert_eq!(ws.auth_headers(), vec!["tok-123".to_string()]);
    }

    #[tokio::test]
    async fn fails_when_second_dial_fails() {
        let dead = dead_url().await;
        let (first_hop, hits) = redirect_server(dead).await;

        let result = handshake::dial_with_redirect(&first_hop, "tok-123").await;

        assert!(matches!(result, Err(HandshakeError::Dial { .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_follow_a_second_redirect() {
        let ws = ws_server(hold_open).await;
        let (second_hop, second_hits) = redirect_server(ws.url.clone()).await;
        let (first_hop, first_hits) = redirect_server(second_hop).await;

        let result = handshake::dial_with_redirect(&first_hop, "tok-123").await;

        assert!(matches!(result, Err(HandshakeError::TooManyRedirects { .. })));
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(ws.connection_count(), 0);
    }

    #[tokio::test]
    async fn session_action_then_websocket_redirect() {
        let api = MockServer::start().await;
        let ws = ws_server(hold_open).await;
        let (first_hop, hits) = redirect_server(ws.url.clone()).await;
        mock_session_action(
            &api,
            ResponseTemplate::new(302).insert_header("Location", first_hop.as_str()),
        )
        .await;

        let connection = handshake::open_session(&creds(&api), "machines", "web-1")
            .await
            .unwrap();

        assert_eq!(connection.endpoint, ws.url);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ws.connection_count(), 1);
    }
}

mod open_stream_tests {
    use super::*;

    async fn mock_job(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v2/jobs/job-7"))
            .and(header("Authorization", "tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn dials_stream_uri() {
        let api = MockServer::start().await;
        let ws = ws_server(hold_open).await;
        mock_job(&api, serde_json::json!({ "data": { "stream_uri": ws.url } })).await;

        let connection = handshake::open_stream(&creds(&api), "job-7").await.unwrap();

        assert_eq!(connection.endpoint, ws.url);
        assert_eq!(ws.auth_headers(), vec!["tok-123".to_string()]);
    }

    #[tokio::test]
    async fn missing_data_is_fatal() {
        let api = MockServer::start().await;
        mock_job(&api, serde_json::json!({ "error": "nope" })).await;

        let result = handshake::open_stream(&creds(&api), "job-7").await;
        assert!(matches!(result, Err(HandshakeError::MissingStreamUri { .. })));
    }

    #[tokio::test]
    async fn missing_stream_uri_is_fatal() {
        let api = MockServer::start().await;
        mock_job(&api, serde_json::json!({ "data": { "status": "running" } })).await;

        let result = handshake::open_stream(&creds(&api), "job-7").await;
        assert!(matches!(result, Err(HandshakeError::MissingStreamUri { .. })));
    }
}
