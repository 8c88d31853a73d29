//! HTTP client for talking to a token server.

pub mod http;

pub use http::TokenClient;
