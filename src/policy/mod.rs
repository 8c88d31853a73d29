//! Access policy for authenticated operations.

pub mod authorizer;

pub use authorizer::{authorize, Credentials};
