//! Wire protocol: request parameter decoding and response models.

pub mod models;
