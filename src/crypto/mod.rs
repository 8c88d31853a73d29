//! Cryptographic primitives for request authentication.

pub mod freshness;
pub mod signing;
pub mod verify;
