//! Session and access-control core for the matchbook matrimonial client.
//!
//! ARCHITECTURE
//! ============
//! `identity` owns the provider credential and token refresh. `transport`
//! attaches the bearer token to every backend call and retries once after a
//! forced refresh. `session` resolves the backend account for the current
//! identity and publishes snapshots that `guard` evaluates and
//! `notifications` gates its polling on. `client` wires them together.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod notifications;
pub mod poll;
pub mod route;
pub mod session;
pub mod transport;
pub mod types;
pub mod validate;

#[cfg(test)]
pub mod test_helpers;

pub use client::{Client, ClientError};
pub use error::{AuthError, TransportError};
