//! Session-aware request wrapper.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every authenticated API call goes through [`SessionClient::send`]. It
//! attaches the bearer token and recovers from an expired access token by
//! refreshing the pair once and replaying the call once.
//!
//! ERROR HANDLING
//! ==============
//! An unrecoverable 401 always clears both stored tokens before returning
//! [`ApiError::SessionExpired`], so callers fall back to a logged-out state.
//! Other failures are normalized by [`ApiError::from_response`].

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::transport::{ApiRequest, ApiResponse, FileUpload, HttpTransport, ReqwestTransport};
use super::types::RefreshRequest;
use crate::config::{ClientConfig, RefreshPolicy};
use crate::error::ApiError;
use crate::state::session::SessionManager;
use crate::state::tokens::{FileTokenStore, TokenPair};

pub const REFRESH_PATH: &str = "users/refresh";

// =============================================================================
// CALL DESCRIPTION
// =============================================================================

/// One logical API call before token resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    upload: Option<FileUpload>,
    bearer: Option<String>,
    retry: bool,
    anonymous: bool,
}

impl ApiCall {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            upload: None,
            bearer: None,
            retry: true,
            anonymous: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Encode`] if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?);
        Ok(self)
    }

    /// Send `upload` as a multipart form instead of a JSON body.
    #[must_use]
    pub fn file(mut self, upload: FileUpload) -> Self {
        self.upload = Some(upload);
        self
    }

    #[must_use]
    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    /// Use this token instead of the stored access token.
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Treat a 401 as terminal instead of refreshing.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    /// Send without credentials and without 401 recovery (sign-in, sign-up).
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn to_wire(&self, bearer: Option<String>) -> ApiRequest {
        ApiRequest {
            method: self.method.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
            upload: self.upload.clone(),
            bearer,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct SessionClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
    refresh_policy: RefreshPolicy,
}

impl SessionClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionManager>,
        refresh_policy: RefreshPolicy,
    ) -> Self {
        Self { transport, session, refresh_policy }
    }

    /// Client over HTTP with tokens persisted in the configured token file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        let store = FileTokenStore::new(config.token_file.clone());
        let session = SessionManager::new(Arc::new(store));
        Ok(Self::new(Arc::new(transport), Arc::new(session), config.refresh_policy))
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Perform `call` and decode the body. An empty body decodes from `null`,
    /// so `T = ()` or `Option<_>` accept no-content responses.
    ///
    /// # Errors
    ///
    /// See [`SessionClient::execute`]; additionally [`ApiError::Decode`] when
    /// the body does not match `T`.
    pub async fn send<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        let value = self.execute(call).await?;
        decode(value)
    }

    /// Perform `call` and return the raw JSON body (`null` when empty).
    ///
    /// # Errors
    ///
    /// - [`ApiError::SessionExpired`] on an unrecoverable 401 (tokens cleared)
    /// - [`ApiError::Server`] / [`ApiError::Status`] on other non-success statuses
    /// - [`ApiError::Transport`] when no response arrived
    pub async fn execute(&self, call: ApiCall) -> Result<Value, ApiError> {
        if call.anonymous {
            let response = self.transport.send(&call.to_wire(call.bearer.clone())).await?;
            return into_value(response);
        }

        let bearer = match &call.bearer {
            Some(token) => Some(token.clone()),
            None => self.session.access_token()?,
        };
        let response = self.transport.send(&call.to_wire(bearer)).await?;
        if response.is_unauthorized() {
            return self.recover_unauthorized(&call).await;
        }
        into_value(response)
    }

    async fn recover_unauthorized(&self, call: &ApiCall) -> Result<Value, ApiError> {
        let refresh_token = self.session.refresh_token()?.filter(|_| call.retry);
        let Some(refresh_token) = refresh_token else {
            tracing::warn!(path = %call.path, retry = call.retry, "unauthorized and not refreshable; ending session");
            return Err(self.expire());
        };

        let Some(guard) = self.session.try_begin_refresh() else {
            return self.on_refresh_in_flight(call).await;
        };
        let tokens = match self.request_refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(path = %call.path, error = %e, "token refresh failed; ending session");
                let err = self.expire();
                drop(guard);
                return Err(err);
            }
        };
        if let Err(e) = self.session.replace_tokens(&tokens) {
            tracing::error!(error = %e, "could not persist refreshed tokens; ending session");
            let err = self.expire();
            drop(guard);
            return Err(err);
        }
        drop(guard);

        tracing::info!(path = %call.path, "access token refreshed; replaying request");
        self.replay(call, tokens.access_token).await
    }

    async fn on_refresh_in_flight(&self, call: &ApiCall) -> Result<Value, ApiError> {
        match self.refresh_policy {
            RefreshPolicy::Reject => {
                tracing::warn!(path = %call.path, "unauthorized while a refresh is in flight; ending session");
                Err(self.expire())
            }
            RefreshPolicy::Await => {
                tracing::debug!(path = %call.path, "waiting for in-flight refresh");
                self.session.wait_for_refresh().await;
                match self.session.access_token()? {
                    Some(access_token) => self.replay(call, access_token).await,
                    None => Err(ApiError::SessionExpired),
                }
            }
        }
    }

    /// Second and final attempt of a call, with retrying disabled.
    async fn replay(&self, call: &ApiCall, access_token: String) -> Result<Value, ApiError> {
        let response = self.transport.send(&call.to_wire(Some(access_token))).await?;
        if response.is_unauthorized() {
            tracing::warn!(path = %call.path, "replayed request still unauthorized; ending session");
            return Err(self.expire());
        }
        into_value(response)
    }

    fn expire(&self) -> ApiError {
        self.session.expire();
        ApiError::SessionExpired
    }

    /// Exchange a refresh token for a new pair. Touches neither the store nor
    /// the in-flight flag.
    ///
    /// # Errors
    ///
    /// Returns the normalized server error when the exchange is rejected.
    pub async fn request_refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let call = ApiCall::post(REFRESH_PATH)
            .json(&RefreshRequest { refresh_token: refresh_token.to_owned() })?
            .anonymous();
        let response = self.transport.send(&call.to_wire(None)).await?;
        decode(into_value(response)?)
    }

    /// Refresh the stored pair under the single-flight guard. When another
    /// refresh is already running, wait for it and return what it stored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionExpired`] (with tokens cleared) when there is
    /// no refresh token or the exchange fails.
    pub async fn refresh_session(&self) -> Result<TokenPair, ApiError> {
        let Some(guard) = self.session.try_begin_refresh() else {
            self.session.wait_for_refresh().await;
            return self.session.tokens()?.ok_or(ApiError::SessionExpired);
        };
        let Some(refresh_token) = self.session.refresh_token()? else {
            let err = self.expire();
            drop(guard);
            return Err(err);
        };

        let refreshed = match self.request_refresh(&refresh_token).await {
            Ok(tokens) => self.session.replace_tokens(&tokens).map(|()| tokens),
            Err(e) => Err(e),
        };
        match refreshed {
            Ok(tokens) => {
                drop(guard);
                tracing::info!("session refreshed");
                Ok(tokens)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed; ending session");
                let err = self.expire();
                drop(guard);
                Err(err)
            }
        }
    }

    /// `GET path` with the stored access token, without 401 recovery and
    /// without touching stored tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionExpired`] without a network call when no
    /// access token is stored; otherwise the normalized response error.
    pub async fn fetch_once<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let Some(access_token) = self.session.access_token()? else {
            return Err(ApiError::SessionExpired);
        };
        let call = ApiCall::get(path);
        let response = self.transport.send(&call.to_wire(Some(access_token))).await?;
        decode(into_value(response)?)
    }
}

fn into_value(response: ApiResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
        let err = ApiError::from_response(response.status, &response.body);
        tracing::debug!(status = response.status, error = %err, "api call failed");
        return Err(err);
    }
    if response.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
