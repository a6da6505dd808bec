//! Persisted access/refresh token pair.
//!
//! SYSTEM CONTEXT
//! ==============
//! The pair is the only client-side state that outlives a process. Both
//! tokens are written and removed together; a store never exposes one
//! without the other.

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tokens_test;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::ApiError;

/// Bearer credentials issued by `users/signin` and `users/refresh`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }

    fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Storage backend for the token pair.
pub trait TokenStore: Send + Sync {
    /// Read the stored pair. `None` when nothing (or only half a pair) is stored.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the backend cannot be read.
    fn load(&self) -> Result<Option<TokenPair>, ApiError>;

    /// Replace both tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the backend cannot be written.
    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError>;

    /// Remove both tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the backend cannot be written.
    fn clear(&self) -> Result<(), ApiError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self { tokens: Mutex::new(Some(tokens)) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, ApiError> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.clone().filter(TokenPair::is_complete))
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON file holding exactly the keys `access_token` and `refresh_token`.
///
/// Saves go through a uniquely named sibling temp file and a rename, so a
/// concurrent reader sees either the old pair or the new one.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

fn storage_error(path: &Path, e: &std::io::Error) -> ApiError {
    ApiError::Storage(format!("{}: {e}", path.display()))
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, ApiError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        match serde_json::from_str::<TokenPair>(&raw) {
            Ok(tokens) if tokens.is_complete() => Ok(Some(tokens)),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "token file holds an incomplete pair; ignoring");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "token file unreadable; ignoring");
                Ok(None)
            }
        }
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ApiError> {
        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| storage_error(dir, &e))?;
        let json = serde_json::to_vec_pretty(tokens).map_err(|e| ApiError::Encode(e.to_string()))?;

        // Each writer gets its own temp file, so concurrent saves never
        // rename a half-written file into place.
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| storage_error(dir, &e))?;
        temp.write_all(&json).map_err(|e| storage_error(temp.path(), &e))?;
        temp.as_file().sync_all().map_err(|e| storage_error(temp.path(), &e))?;
        temp.persist(&self.path).map_err(|e| storage_error(&self.path, &e.error))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, &e)),
        }
    }
}
