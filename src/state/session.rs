//! Session manager shared by the request client and the identity holder.
//!
//! DESIGN
//! ======
//! Owns the token store and the refresh-in-flight flag. The flag is flipped
//! under a mutex by [`SessionManager::try_begin_refresh`], so at most one
//! refresh runs at a time even on a multi-threaded runtime. The returned
//! [`RefreshGuard`] releases the flag on drop, which covers error returns and
//! cancelled futures alike.
//!
//! Every token mutation is announced on a broadcast channel so the identity
//! holder can follow logouts and expirations triggered elsewhere.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};

use super::tokens::{TokenPair, TokenStore};
use crate::error::ApiError;

const EVENT_CAPACITY: usize = 16;

/// Token lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A fresh pair was stored after sign-in.
    Started,
    /// The pair was replaced by a successful refresh.
    Refreshed,
    /// Both tokens were dropped after an unrecoverable authorization failure.
    Expired,
    /// Both tokens were dropped by an explicit logout.
    LoggedOut,
}

pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    refreshing: Mutex<bool>,
    /// Bumped every time an in-flight refresh ends.
    refresh_generation: watch::Sender<u64>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (refresh_generation, _) = watch::channel(0);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { store, refreshing: Mutex::new(false), refresh_generation, events }
    }

    /// Currently stored pair, if both tokens are present.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the store cannot be read.
    pub fn tokens(&self) -> Result<Option<TokenPair>, ApiError> {
        self.store.load()
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the store cannot be read.
    pub fn access_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.tokens()?.map(|tokens| tokens.access_token))
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the store cannot be read.
    pub fn refresh_token(&self) -> Result<Option<String>, ApiError> {
        Ok(self.tokens()?.map(|tokens| tokens.refresh_token))
    }

    /// Persist the pair issued at sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the store cannot be written.
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        self.store.save(tokens)?;
        self.announce(SessionEvent::Started);
        Ok(())
    }

    /// Persist the pair issued by a refresh.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the store cannot be written.
    pub fn replace_tokens(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        self.store.save(tokens)?;
        self.announce(SessionEvent::Refreshed);
        Ok(())
    }

    /// Drop both tokens after an unrecoverable authorization failure.
    pub fn expire(&self) {
        self.drop_tokens(SessionEvent::Expired);
    }

    /// Drop both tokens after a logout.
    pub fn end_session(&self) {
        self.drop_tokens(SessionEvent::LoggedOut);
    }

    fn drop_tokens(&self, event: SessionEvent) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear stored tokens");
        }
        self.announce(event);
    }

    fn announce(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Claim the refresh slot. `None` when another refresh is already running.
    pub fn try_begin_refresh(&self) -> Option<RefreshGuard<'_>> {
        let mut refreshing = self.refreshing.lock().unwrap_or_else(PoisonError::into_inner);
        if *refreshing {
            return None;
        }
        *refreshing = true;
        Some(RefreshGuard { manager: self })
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        *self.refreshing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn end_refresh(&self) {
        *self.refreshing.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.refresh_generation.send_modify(|generation| *generation += 1);
    }

    /// Wait until no refresh is in flight. Returns immediately when idle.
    pub async fn wait_for_refresh(&self) {
        // Subscribe before checking the flag so an end in between is not missed.
        let mut generation = self.refresh_generation.subscribe();
        while self.is_refreshing() {
            if generation.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Holds the refresh slot; releasing it is [`Drop`].
#[must_use = "dropping the guard immediately ends the refresh"]
pub struct RefreshGuard<'a> {
    manager: &'a SessionManager,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.manager.end_refresh();
    }
}
