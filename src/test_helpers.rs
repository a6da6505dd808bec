//! In-memory stand-ins for the EditorialHub API used across unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::config::RefreshPolicy;
use crate::error::ApiError;
use crate::net::client::SessionClient;
use crate::net::transport::{ApiRequest, ApiResponse, HttpTransport};
use crate::state::session::SessionManager;
use crate::state::tokens::{MemoryTokenStore, TokenPair};

pub const EMAIL: &str = "a@x.com";
pub const PASSWORD: &str = "hunter2";

pub fn respond(status: u16, body: &Value) -> ApiResponse {
    ApiResponse { status, body: body.to_string() }
}

pub fn alice() -> Value {
    json!({ "id": 1, "username": "alice", "email": EMAIL })
}

// =============================================================================
// FAKE API
// =============================================================================

/// Minimal stateful server: issues, rotates, and validates token pairs.
#[derive(Default)]
pub struct FakeApi {
    access: Mutex<HashSet<String>>,
    refresh: Mutex<HashSet<String>>,
    issued: AtomicU32,
    /// Upcoming `users/me` calls that fail with 503 before validation.
    me_outages: AtomicU32,
    /// Artificial latency per path.
    latency: Mutex<HashMap<String, Duration>>,
    /// Status returned by `users/logout` (200 when unset).
    logout_status: Mutex<Option<u16>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Issue a pair the fake will accept.
    pub fn issue(&self) -> TokenPair {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let pair = TokenPair::new(format!("access-{n}"), format!("refresh-{n}"));
        self.access.lock().unwrap().insert(pair.access_token.clone());
        self.refresh.lock().unwrap().insert(pair.refresh_token.clone());
        pair
    }

    /// Invalidate every issued access token, as if they all timed out.
    pub fn expire_access_tokens(&self) {
        self.access.lock().unwrap().clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.refresh.lock().unwrap().clear();
    }

    pub fn fail_next_me(&self, times: u32) {
        self.me_outages.store(times, Ordering::SeqCst);
    }

    pub fn set_latency(&self, path: &str, latency: Duration) {
        self.latency.lock().unwrap().insert(path.to_owned(), latency);
    }

    pub fn set_logout_status(&self, status: u16) {
        *self.logout_status.lock().unwrap() = Some(status);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|r| r.path == path).count()
    }

    fn authorized(&self, request: &ApiRequest) -> bool {
        request
            .bearer
            .as_ref()
            .is_some_and(|token| self.access.lock().unwrap().contains(token))
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let body = request.body.clone().unwrap_or(Value::Null);
        match (request.method.as_str(), request.path.as_str()) {
            ("POST", "users/signin") => {
                if body["email"] == EMAIL && body["password"] == PASSWORD {
                    let pair = self.issue();
                    respond(200, &json!({ "access_token": pair.access_token, "refresh_token": pair.refresh_token }))
                } else {
                    respond(401, &json!({ "detail": "Incorrect email or password" }))
                }
            }
            ("POST", "users/signup") => {
                if body["email"] == EMAIL {
                    respond(400, &json!({ "detail": "Email already registered" }))
                } else {
                    respond(201, &json!({ "id": 2, "username": body["username"], "email": body["email"] }))
                }
            }
            ("POST", "users/refresh") => {
                let token = body["refresh_token"].as_str().unwrap_or_default().to_owned();
                if self.refresh.lock().unwrap().remove(&token) {
                    let pair = self.issue();
                    respond(200, &json!({ "access_token": pair.access_token, "refresh_token": pair.refresh_token }))
                } else {
                    respond(401, &json!({ "detail": "Invalid refresh token" }))
                }
            }
            ("POST", "users/logout") => {
                if let Some(token) = body["refresh_token"].as_str() {
                    self.refresh.lock().unwrap().remove(token);
                }
                let status = self.logout_status.lock().unwrap().unwrap_or(200);
                respond(status, &json!({ "message": "Logged out" }))
            }
            ("GET", "users/me") => {
                if self
                    .me_outages
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return respond(503, &json!({}));
                }
                if self.authorized(request) {
                    respond(200, &alice())
                } else {
                    respond(401, &json!({ "detail": "Could not validate credentials" }))
                }
            }
            (_, path) => {
                if !self.authorized(request) {
                    return respond(401, &json!({ "detail": "Not authenticated" }));
                }
                match path {
                    "blogs/" => respond(200, &json!([{ "id": 3, "blog_name": "Notes" }])),
                    "empty" => ApiResponse { status: 204, body: String::new() },
                    "broken" => respond(500, &json!({})),
                    _ => respond(404, &json!({ "detail": "Not Found" })),
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for FakeApi {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.log.lock().unwrap().push(request.clone());
        let latency = self.latency.lock().unwrap().get(&request.path).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.handle(request))
    }
}

// =============================================================================
// SCRIPTED TRANSPORT
// =============================================================================

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync;

/// Transport answering every request through a closure, recording each one.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self { handler: Box::new(handler), log: Mutex::new(Vec::new()) })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn last(&self) -> ApiRequest {
        self.log.lock().unwrap().last().cloned().expect("no request recorded")
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.log.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

// =============================================================================
// WIRING
// =============================================================================

pub fn client_over(
    transport: Arc<dyn HttpTransport>,
    tokens: Option<TokenPair>,
    policy: RefreshPolicy,
) -> Arc<SessionClient> {
    let store = match tokens {
        Some(tokens) => MemoryTokenStore::with_tokens(tokens),
        None => MemoryTokenStore::new(),
    };
    let session = Arc::new(SessionManager::new(Arc::new(store)));
    Arc::new(SessionClient::new(transport, session, policy))
}
