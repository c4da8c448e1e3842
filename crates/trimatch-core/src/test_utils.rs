//! Test utilities for trimatch-core
//!
//! Provides an in-process mock chat-completions server so integration tests
//! can exercise the classifier's retry, rate-limit, and validation paths
//! over real HTTP.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::oneshot;

/// One scripted server reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with the given string as the assistant message content.
    Content(String),
    /// A bare status code with an empty body.
    Status(u16),
    /// 200 whose body is not valid chat-completions JSON.
    Garbage,
}

#[derive(Clone)]
struct ServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<AtomicUsize>,
}

/// Mock chat-completions server. Replies are served in scripted order; once
/// the script is exhausted every request gets a 500.
pub struct MockChatServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    /// Start on an available port with an initial script.
    pub async fn start(script: Vec<MockReply>) -> Self {
        let replies = Arc::new(Mutex::new(script.into_iter().collect::<VecDeque<_>>()));
        let requests = Arc::new(AtomicUsize::new(0));
        let state = ServerState {
            replies: replies.clone(),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/chat/completions", post(handle_completion))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            replies,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Endpoint URL to hand to a `ChatBackend`.
    pub fn url(&self) -> String {
        format!("http://{}/chat/completions", self.addr)
    }

    /// Total requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Append further replies to the script.
    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_completion(State(state): State<ServerState>) -> impl IntoResponse {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let reply = state.replies.lock().unwrap().pop_front();

    match reply {
        Some(MockReply::Content(content)) => (
            StatusCode::OK,
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })),
        )
            .into_response(),
        Some(MockReply::Status(code)) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({}))).into_response()
        }
        Some(MockReply::Garbage) => {
            (StatusCode::OK, "this is not the json you wanted").into_response()
        }
        None => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response(),
    }
}
