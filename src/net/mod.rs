//! Network layer for the EditorialHub API.
//!
//! DESIGN
//! ======
//! `transport` is the raw HTTP seam, `client` adds bearer tokens and the
//! refresh-and-replay path on top of it, and `api` exposes one typed function
//! per endpoint. `types` holds the wire DTOs shared by all three.

pub mod api;
pub mod client;
pub mod transport;
pub mod types;
