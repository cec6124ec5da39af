//! Scripted in-memory gateway for exercising control flow without a backend.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use reqwest::{Method, StatusCode};

use super::{status_error, AuthLevel, HttpClient, HttpRequest};
use crate::error::{ClientError, ResponseError};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(String),
    Status(StatusCode, String),
    NetworkFailure,
    Pending,
}

impl Reply {
    pub(crate) fn json(value: serde_json::Value) -> Self {
        Self::Body(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub auth_level: AuthLevel,
}

/// Replies are queued per `(method, path)`; the last reply of a queue repeats.
#[derive(Default)]
pub(crate) struct MockGateway {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, method: Method, path: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn calls_to(&self, method: &Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| &c.method == method && c.path == path)
            .count()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock();
        let queue = replies.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for MockGateway {
    async fn request_text(&self, req: HttpRequest) -> Result<String, ClientError> {
        self.calls.lock().push(RecordedCall {
            method: req.method.clone(),
            path: req.path.clone(),
            query: req.query_params.clone(),
            body: req.body.clone(),
            auth_level: req.auth_level,
        });

        match self.next_reply(&req.method, &req.path) {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Status(status, body)) => Err(status_error(status, body)),
            Some(Reply::NetworkFailure) => Err(ClientError::network("connection refused")),
            Some(Reply::Pending) => std::future::pending().await,
            None => Err(ResponseError::http_status(StatusCode::NOT_FOUND, "no scripted reply").into()),
        }
    }
}

/// Serve `router` on an ephemeral port and return the matching API base URL.
pub(crate) async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}/api/")
}
