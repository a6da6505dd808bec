//! Session state: persisted tokens, the shared session manager, and the
//! identity holder built on both.

pub mod auth;
pub mod session;
pub mod tokens;
