//! Session-aware client for the EditorialHub blog API.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`net::client::SessionClient`] performs every authenticated request and
//! transparently refreshes an expired access token once per call.
//! [`state::auth::SessionHolder`] resolves who is signed in at startup and
//! follows the session afterwards. Tokens persist through a
//! [`state::tokens::TokenStore`], so a session survives restarts.

pub mod config;
pub mod error;
pub mod net;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_helpers;

pub use config::{ClientConfig, RefreshPolicy};
pub use error::ApiError;
pub use net::client::{ApiCall, SessionClient};
pub use state::auth::{AuthState, SessionHolder};
pub use state::session::{SessionEvent, SessionManager};
pub use state::tokens::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
