//! Client SDK for the GAMBA casino platform.
//!
//! Wraps the platform's REST API and realtime channel behind one [`Client`]:
//! persistent credentials with transparent refresh ([`SessionStore`]), a
//! confirmed-only money flow ([`Wallet`]), a WebSocket event stream
//! ([`Channel`]), and client-side chat reconciliation ([`ChatBoard`]).

pub mod channel;
pub mod client;
pub mod debounce;
pub mod events;
pub mod games;
pub mod session;
pub mod social;
pub mod support;
pub mod sync;
pub mod tournaments;
pub mod wallet;

pub use channel::Channel;
pub use client::Client;
pub use debounce::Debouncer;
pub use session::{Credentials, Identity, SessionStore};
pub use sync::{ChatBoard, Entry, EntryStatus};
pub use wallet::Wallet;

use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("{status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("session expired")]
    SessionExpired,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: f64, available: f64 },
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{
            ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
            Query as AxumQuery, State as AxumState,
        },
        http::{HeaderMap, StatusCode as AxumStatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use chrono::Utc;
    use gamba_types::{ClientCommand, Message, ServerEvent};
    use serde_json::{json, Value};
    use std::{
        collections::HashMap,
        net::SocketAddr,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc, Mutex, Once,
        },
        time::Instant,
    };
    use tokio::time::{sleep, Duration};

    fn init_tracing() {
        static TRACING: Once = Once::new();
        TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });
    }

    struct ServerState {
        access_token: Mutex<String>,
        refresh_ok: AtomicBool,
        refresh_calls: AtomicUsize,
        me_calls: AtomicUsize,
        withdraw_calls: AtomicUsize,
        balance: Mutex<f64>,
        chat_conflict: AtomicBool,
    }

    impl Default for ServerState {
        fn default() -> Self {
            Self {
                access_token: Mutex::new("access-0".to_string()),
                refresh_ok: AtomicBool::new(true),
                refresh_calls: AtomicUsize::new(0),
                me_calls: AtomicUsize::new(0),
                withdraw_calls: AtomicUsize::new(0),
                balance: Mutex::new(100.0),
                chat_conflict: AtomicBool::new(false),
            }
        }
    }

    fn authorized(state: &ServerState, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", state.access_token.lock().unwrap());
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some(expected.as_str())
    }

    fn unauthorized() -> Response {
        (
            AxumStatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response()
    }

    fn user_json(balance: f64) -> Value {
        json!({ "id": "me", "username": "alice", "balance": balance, "role": null })
    }

    fn chat_json() -> Value {
        json!({
            "id": "chat-1",
            "user1_id": "me",
            "user2_id": "peer",
            "user1": user_json(0.0),
            "user2": { "id": "peer", "username": "bob", "balance": 0.0, "role": null },
            "messages": []
        })
    }

    async fn login(
        AxumState(state): AxumState<Arc<ServerState>>,
        Json(_body): Json<Value>,
    ) -> Json<Value> {
        let access = state.access_token.lock().unwrap().clone();
        let balance = *state.balance.lock().unwrap();
        Json(json!({
            "user": user_json(balance),
            "tokens": { "access_token": access, "refresh_token": "refresh-1" }
        }))
    }

    async fn refresh(
        AxumState(state): AxumState<Arc<ServerState>>,
        Json(body): Json<Value>,
    ) -> Response {
        state.refresh_calls.fetch_add(1, Ordering::SeqCst);
        // Hold the exchange open long enough for concurrent 401s to pile up.
        sleep(Duration::from_millis(50)).await;
        if !state.refresh_ok.load(Ordering::SeqCst) || body["refresh_token"] != "refresh-1" {
            return (
                AxumStatusCode::UNAUTHORIZED,
                Json(json!({ "error": "refresh token revoked" })),
            )
                .into_response();
        }
        let rotated = format!("access-{}", state.refresh_calls.load(Ordering::SeqCst));
        *state.access_token.lock().unwrap() = rotated.clone();
        Json(json!({ "access_token": rotated, "refresh_token": "refresh-1" })).into_response()
    }

    async fn me(AxumState(state): AxumState<Arc<ServerState>>, headers: HeaderMap) -> Response {
        state.me_calls.fetch_add(1, Ordering::SeqCst);
        if !authorized(&state, &headers) {
            return unauthorized();
        }
        let balance = *state.balance.lock().unwrap();
        Json(user_json(balance)).into_response()
    }

    async fn deposit(
        AxumState(state): AxumState<Arc<ServerState>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if !authorized(&state, &headers) {
            return unauthorized();
        }
        *state.balance.lock().unwrap() += body["amount"].as_f64().unwrap_or_default();
        AxumStatusCode::OK.into_response()
    }

    async fn withdraw(
        AxumState(state): AxumState<Arc<ServerState>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        state.withdraw_calls.fetch_add(1, Ordering::SeqCst);
        if !authorized(&state, &headers) {
            return unauthorized();
        }
        *state.balance.lock().unwrap() -= body["amount"].as_f64().unwrap_or_default();
        AxumStatusCode::OK.into_response()
    }

    async fn create_chat(
        AxumState(state): AxumState<Arc<ServerState>>,
        headers: HeaderMap,
        Json(_body): Json<Value>,
    ) -> Response {
        if !authorized(&state, &headers) {
            return unauthorized();
        }
        if state.chat_conflict.load(Ordering::SeqCst) {
            return (
                AxumStatusCode::CONFLICT,
                Json(json!({ "error": "Chat already exists" })),
            )
                .into_response();
        }
        Json(chat_json()).into_response()
    }

    async fn list_chats(
        AxumState(state): AxumState<Arc<ServerState>>,
        headers: HeaderMap,
    ) -> Response {
        if !authorized(&state, &headers) {
            return unauthorized();
        }
        Json(json!([chat_json()])).into_response()
    }

    async fn channel_upgrade(
        AxumState(state): AxumState<Arc<ServerState>>,
        AxumQuery(params): AxumQuery<HashMap<String, String>>,
        upgrade: WebSocketUpgrade,
    ) -> Response {
        let valid = state.access_token.lock().unwrap().clone();
        if params.get("token") != Some(&valid) {
            return AxumStatusCode::FORBIDDEN.into_response();
        }
        upgrade.on_upgrade(serve_channel).into_response()
    }

    async fn serve_channel(mut socket: WebSocket) {
        let frame = |event: &ServerEvent| WsMessage::Text(serde_json::to_string(event).unwrap());
        let incoming = Message {
            id: "m1".to_string(),
            chat_id: "c1".to_string(),
            sender_id: "peer".to_string(),
            content: "hi there".to_string(),
            created_at: Utc::now(),
            read_at: None,
            sender: None,
        };
        // Deliver the same message twice, then a kind this client does not
        // know, then a typing notice.
        socket
            .send(frame(&ServerEvent::NewMessage(incoming.clone())))
            .await
            .unwrap();
        socket
            .send(frame(&ServerEvent::NewMessage(incoming)))
            .await
            .unwrap();
        socket
            .send(WsMessage::Text(
                r#"{"type":"jackpot_update","payload":{}}"#.to_string(),
            ))
            .await
            .unwrap();
        socket
            .send(frame(&ServerEvent::Typing {
                chat_id: "c1".to_string(),
            }))
            .await
            .unwrap();

        // Echo every sent message back under its client-chosen id.
        while let Some(Ok(WsMessage::Text(text))) = socket.recv().await {
            let Ok(command) = serde_json::from_str::<ClientCommand>(&text) else {
                continue;
            };
            if let ClientCommand::SendMessage {
                id,
                chat_id,
                content,
            } = command
            {
                let echo = Message {
                    id,
                    chat_id,
                    sender_id: "me".to_string(),
                    content,
                    created_at: Utc::now(),
                    read_at: None,
                    sender: None,
                };
                if socket
                    .send(frame(&ServerEvent::NewMessage(echo)))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }

    struct TestContext {
        state: Arc<ServerState>,
        base_url: String,
        server_handle: tokio::task::JoinHandle<()>,
    }

    impl TestContext {
        async fn new() -> Self {
            init_tracing();
            let state = Arc::new(ServerState::default());
            let router = Router::new()
                .route("/api/auth/login", post(login))
                .route("/api/auth/refresh", post(refresh))
                .route("/api/users/me", get(me))
                .route("/api/transactions/deposit", post(deposit))
                .route("/api/transactions/withdraw", post(withdraw))
                .route("/api/chats", get(list_chats).post(create_chat))
                .route("/ws", get(channel_upgrade))
                .with_state(state.clone());

            // Start server on random port
            let addr = SocketAddr::from(([127, 0, 0, 1], 0));
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            let actual_addr = listener.local_addr().unwrap();
            let base_url = format!("http://{actual_addr}/api");

            let server_handle = tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });

            // Give server time to start
            sleep(Duration::from_millis(50)).await;

            Self {
                state,
                base_url,
                server_handle,
            }
        }

        fn create_client(&self) -> Client {
            Client::new(&self.base_url, SessionStore::in_memory()).unwrap()
        }

        fn stale_client_token(&self) {
            // Rotate the server-side token so the client's copy stops working.
            *self.state.access_token.lock().unwrap() = "access-rotated".to_string();
        }
    }

    impl Drop for TestContext {
        fn drop(&mut self) {
            self.server_handle.abort();
        }
    }

    #[test]
    fn test_client_rejects_non_http_scheme() {
        let result = Client::new("ftp://example.com/api", SessionStore::in_memory());
        assert!(matches!(result, Err(Error::InvalidScheme(scheme)) if scheme == "ftp"));
    }

    #[tokio::test]
    async fn test_login_installs_credentials() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();

        let response = client.login("alice", "hunter2").await.unwrap();
        assert_eq!(response.user.unwrap().username, "alice");
        assert_eq!(
            client.session().access_token().as_deref(),
            Some("access-0")
        );
        assert_eq!(
            client.session().refresh_token().as_deref(),
            Some("refresh-1")
        );
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_replays_once() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();
        ctx.stale_client_token();

        let user = client.me().await.unwrap();
        assert_eq!(user.id, "me");
        assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 1);
        // First attempt 401s, the replay succeeds.
        assert_eq!(ctx.state.me_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            client.session().access_token().as_deref(),
            Some("access-1")
        );
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_refresh() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();
        ctx.stale_client_token();

        let (a, b) = tokio::join!(client.me(), client.me());
        a.unwrap();
        b.unwrap();
        assert_eq!(ctx.state.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_tears_session_down() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();
        ctx.stale_client_token();
        ctx.state.refresh_ok.store(false, Ordering::SeqCst);

        let result = client.me().await;
        assert!(matches!(result, Err(Error::SessionExpired)));
        assert!(client.session().credentials().is_none());
    }

    #[tokio::test]
    async fn test_deposit_adopts_confirmed_balance() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();

        let mut wallet = Wallet::new(client);
        wallet.refresh().await.unwrap();
        assert_eq!(wallet.balance(), Some(100.0));

        let balance = wallet.deposit(50.0).await.unwrap();
        assert_eq!(balance, 150.0);
        assert_eq!(wallet.balance(), Some(150.0));
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_network() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();

        let mut wallet = Wallet::new(client);
        wallet.refresh().await.unwrap();

        let result = wallet.withdraw(500.0).await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds {
                requested,
                available,
            }) if requested == 500.0 && available == 100.0
        ));
        assert_eq!(ctx.state.withdraw_calls.load(Ordering::SeqCst), 0);
        // Failed mutations never move the snapshot.
        assert_eq!(wallet.balance(), Some(100.0));
    }

    #[tokio::test]
    async fn test_conflicting_chat_falls_back_to_existing() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();
        ctx.state.chat_conflict.store(true, Ordering::SeqCst);

        let chat = client.open_chat("peer").await.unwrap();
        assert_eq!(chat.id, "chat-1");
        assert_eq!(chat.other_participant("me").username, "bob");
    }

    #[tokio::test]
    async fn test_channel_requires_session() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();

        let result = client.connect_channel().await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_channel_events_reconcile_into_board() {
        let ctx = TestContext::new().await;
        let client = ctx.create_client();
        client.login("alice", "hunter2").await.unwrap();

        let mut channel = client.connect_channel().await.unwrap();
        let mut board = ChatBoard::new("me");

        // The server pushes the same message twice, an unknown kind (which
        // the channel drops), and a typing notice.
        for _ in 0..3 {
            let event = channel.next().await.unwrap().unwrap();
            board.apply(event);
        }
        assert_eq!(board.messages("c1").len(), 1);
        assert!(board.peer_typing("c1", Instant::now()));

        // An outbound message comes back as an echo under the same id and
        // confirms the pending entry instead of duplicating it.
        let draft = board.compose("c1", "hello back");
        channel.send_message(&draft.id, &draft.chat_id, &draft.content);
        // Drive the Stream impl directly for the echo.
        let echo = futures::StreamExt::next(&mut channel).await.unwrap().unwrap();
        board.apply(echo);

        let entries = board.messages("c1");
        assert_eq!(entries.len(), 2);
        let entry = entries
            .iter()
            .find(|entry| entry.message.id == draft.id)
            .unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);
    }
}
