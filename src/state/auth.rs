//! Session state holder: who is signed in, and whether that is known yet.
//!
//! SYSTEM CONTEXT
//! ==============
//! The holder publishes an [`AuthState`] on a watch channel. It starts out
//! loading, and [`SessionHolder::resolve`] settles it once at startup from
//! the stored tokens. Sign-in, logout, idle timeouts and session expiry
//! detected by the request client all move it afterwards.
//!
//! DESIGN
//! ======
//! Startup resolution tolerates a flaky network: the identity check is
//! retried a bounded number of times with a fixed delay before the holder
//! falls back to refreshing the session, and only gives up after that. The
//! retries use [`SessionClient::fetch_once`], which never refreshes or clears
//! tokens on its own, so the holder alone decides when the session is dead.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::session::SessionEvent;
use crate::error::ApiError;
use crate::net::api::{self, CURRENT_USER_PATH};
use crate::net::client::SessionClient;
use crate::net::types::{SignInRequest, User};
use crate::util::inactivity::{IdleTimeouts, InactivityMonitor};
use crate::util::retry::{RetryPolicy, retry};

/// Published identity. `loading` is true only until startup resolution ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub const fn starting() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub const fn signed_out() -> Self {
        Self { user: None, loading: false }
    }

    #[must_use]
    pub const fn signed_in(user: User) -> Self {
        Self { user: Some(user), loading: false }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

pub struct SessionHolder {
    client: Arc<SessionClient>,
    retry: RetryPolicy,
    state: watch::Sender<AuthState>,
}

impl SessionHolder {
    #[must_use]
    pub fn new(client: Arc<SessionClient>, retry: RetryPolicy) -> Self {
        let (state, _) = watch::channel(AuthState::starting());
        Self { client, retry, state }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    /// Settle the identity from stored tokens.
    ///
    /// Without a stored access token this ends unauthenticated without any
    /// network call. Otherwise `users/me` is retried per the retry policy,
    /// then the session is refreshed and `users/me` tried once more. If that
    /// also fails both tokens are cleared.
    pub async fn resolve(&self) -> AuthState {
        let user = self.resolve_user().await;
        let state = AuthState { user, loading: false };
        self.state.send_replace(state.clone());
        state
    }

    async fn resolve_user(&self) -> Option<User> {
        match self.client.session().access_token() {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!("no stored access token; starting signed out");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored tokens; starting signed out");
                return None;
            }
        }

        let client = &self.client;
        let checked = retry(&self.retry, move |_| client.fetch_once::<User>(CURRENT_USER_PATH)).await;
        match checked {
            Ok(user) => return Some(user),
            Err(e) => tracing::info!(error = %e, "identity check failed; refreshing session"),
        }

        // A failed refresh has already cleared the tokens.
        if let Err(e) = self.client.refresh_session().await {
            tracing::warn!(error = %e, "session refresh failed at startup");
            return None;
        }
        match self.client.fetch_once::<User>(CURRENT_USER_PATH).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "identity check failed after refresh; ending session");
                self.client.session().expire();
                None
            }
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Sign in, persist the issued pair and load the account.
    ///
    /// # Errors
    ///
    /// Returns the server's message for rejected credentials. If the account
    /// cannot be loaded after a successful sign-in, the issued pair is
    /// dropped again. Either way the state is left signed out.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let request = SignInRequest { email: email.to_owned(), password: password.to_owned() };
        if let Err(e) = api::sign_in(&self.client, &request).await {
            tracing::warn!(error = %e, "sign-in failed");
            self.set_user(None);
            return Err(e);
        }
        match api::current_user(&self.client).await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "account lookup failed after sign-in; dropping session");
                self.client.session().end_session();
                self.set_user(None);
                Err(e)
            }
        }
    }

    /// Revoke the session server-side when possible, then drop it locally.
    /// Local state is cleared whatever the server answers.
    pub async fn logout(&self) {
        if let Err(e) = api::log_out(&self.client).await {
            tracing::warn!(error = %e, "logout request failed; clearing session anyway");
        }
        self.client.session().end_session();
        self.set_user(None);
        tracing::info!("signed out");
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.send_replace(AuthState { user, loading: false });
    }

    fn mark_signed_out(&self) {
        self.state.send_if_modified(|state| {
            if *state == AuthState::signed_out() {
                return false;
            }
            *state = AuthState::signed_out();
            true
        });
    }

    // =========================================================================
    // BACKGROUND
    // =========================================================================

    /// Follow session events so an expiry detected by any request signs the
    /// holder out. The task ends once the holder or the session is dropped.
    pub fn follow_session(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.client.session().subscribe();
        let holder = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(holder) = holder.upgrade() else {
                    return;
                };
                match event {
                    Ok(SessionEvent::Expired | SessionEvent::LoggedOut) => holder.mark_signed_out(),
                    Ok(SessionEvent::Started | SessionEvent::Refreshed) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session events lagged; rechecking tokens");
                        if matches!(holder.client.session().tokens(), Ok(None)) {
                            holder.mark_signed_out();
                        }
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    /// Log out after `timeouts.logout_after` without activity. Feed activity
    /// through [`InactivityMonitor::touch`].
    pub fn spawn_idle_logout(self: &Arc<Self>, timeouts: IdleTimeouts) -> InactivityMonitor {
        let holder = Arc::downgrade(self);
        InactivityMonitor::spawn(timeouts, move || async move {
            if let Some(holder) = holder.upgrade() {
                holder.logout().await;
            }
        })
    }
}
