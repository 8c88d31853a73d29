//! # Tokenwarden
//!
//! **Key-bound token storage gated by Ed25519 request signatures.**
//!
//! A client creates a *domain* by presenting an Ed25519 public key. Every
//! later read or write of that domain, or of the small string tokens stored
//! in it, must carry a fresh timestamp and a signature over a canonical
//! encoding of the request, made with the matching private key. Domains
//! that go unused for the configured timeout expire and are reclaimed.
//!
//! ## Features
//!
//! - **Ed25519 request signatures**: every authenticated operation is signed by the domain owner
//! - **Freshness window**: signed timestamps older than the tolerance (or in the future) are refused
//! - **Sliding expiry**: each successful access pushes a domain's expiry forward
//! - **Fail-closed**: a missing signature field is a rejection, never a bypass
//! - **HTTP server and client**: an axum server and a blocking reqwest client share one wire format
//!
//! ## Quickstart
//!
//! ```no_run
//! use ed25519_dalek::SigningKey;
//! use tokenwarden::TokenClient;
//!
//! fn main() -> Result<(), tokenwarden::TokenServerError> {
//!     let key = SigningKey::from_bytes(&[7u8; 32]);
//!     let client = TokenClient::new("http://127.0.0.1:5555", key)?;
//!
//!     let created = client.create_domain()?;
//!     client.set_token(created.domain, "session", "s3cr3t")?;
//!     assert_eq!(client.get_token(created.domain, "session")?, "s3cr3t");
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Tokenwarden protects against:
//! - **Foreign keys**: requests signed with any key but the owner's are rejected
//! - **Stale captures**: a captured request stops working once its timestamp leaves the window
//! - **Oversized writes**: token values above [`MAX_TOKEN_VALUE_BYTES`] never reach the store
//!
//! Tokenwarden does **not** prove key possession at creation time: whoever
//! creates a domain first owns it (trust-on-first-use). Checks run in a
//! fixed order, so an unauthenticated caller can learn whether a domain
//! exists by sending a fresh timestamp and watching for `unknown domain`.
//!
//! Within the freshness window a captured request can be resubmitted, and
//! not only verbatim. The canonical message joins operands without
//! separators, so a `setToken` signature for token `t1` with value `v1`
//! also verifies for token `t` with value `1v1`. Anyone who observes a
//! signed `setToken` can, until its timestamp goes stale, write a
//! different token ID and value sharing the same concatenation. Use TLS,
//! and keep the tolerance short.
//!
//! ## Configuration
//!
//! - `inactive_domain_timeout`: how far each access pushes expiry forward
//! - `signature_timestamp_tolerance`: maximum age of a signed timestamp
//! - `sweep_interval`: how often expired domains are reclaimed
//!
//! See [`TokenServerConfig`] for full documentation.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Storage layer
pub mod store;

// Policy layer
pub mod policy;

// Protocol layer
pub mod protocol;

// Manager (main public API)
pub mod manager;

// Client layer
pub mod client;

// HTTP server
pub mod server;

// Re-exports for public API
pub use client::TokenClient;
pub use clock::{Clock, SystemClock};
pub use config::{TokenServerConfig, MAX_TOKEN_VALUE_BYTES};
pub use crypto::signing::SignableRequest;
pub use errors::{ErrorKind, TokenServerError};
pub use manager::DomainManager;
pub use policy::Credentials;
pub use store::DomainId;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
