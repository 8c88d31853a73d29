//! Wire models for the token service.
//!
//! Requests carry their parameters in the query string:
//! - `domain`: domain UUID
//! - `tokenID`: token identifier
//! - `pubKey`: base64 Ed25519 public key
//! - `timestamp`: milliseconds since the Unix epoch
//! - `signature`: base64 Ed25519 signature over the canonical message
//!
//! Fields are decoded in that order and the first missing or malformed
//! field decides the error, so every endpoint reports failures the same way.

use crate::config::MAX_TOKEN_VALUE_BYTES;
use crate::crypto::{
    freshness::parse_timestamp_millis,
    verify::{decode_public_key, decode_signature, encode_public_key, encode_signature},
};
use crate::policy::Credentials;
use crate::store::DomainId;
use crate::TokenServerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw query parameters as received.
pub type QueryParams = HashMap<String, String>;

/// Query key for the domain identifier.
pub const DOMAIN: &str = "domain";
/// Query key for the token identifier.
pub const TOKEN_ID: &str = "tokenID";
/// Query key for the public key.
pub const PUB_KEY: &str = "pubKey";
/// Query key for the signed timestamp.
pub const TIMESTAMP: &str = "timestamp";
/// Query key for the signature.
pub const SIGNATURE: &str = "signature";

/// Parameters of `createDomain`.
#[derive(Debug, Clone)]
pub struct CreateDomainParams {
    /// Key that will own the new domain.
    pub public_key: ed25519_dalek::VerifyingKey,
}

impl CreateDomainParams {
    /// Decode from query parameters.
    pub fn from_query(query: &QueryParams) -> Result<Self, TokenServerError> {
        let raw = query
            .get(PUB_KEY)
            .ok_or(TokenServerError::MissingParameter { field: PUB_KEY })?;
        Ok(Self {
            public_key: decode_public_key(raw)?,
        })
    }
}

/// Parameters of `revalidateDomain`. No signature fields are read.
#[derive(Debug, Clone)]
pub struct DomainParams {
    /// Target domain.
    pub domain: DomainId,
}

impl DomainParams {
    /// Decode from query parameters.
    pub fn from_query(query: &QueryParams) -> Result<Self, TokenServerError> {
        Ok(Self {
            domain: parse_domain(query)?,
        })
    }
}

/// Parameters of `getDomain` and `deleteDomain`.
#[derive(Debug, Clone)]
pub struct SignedDomainParams {
    /// Target domain.
    pub domain: DomainId,
    /// Signature material.
    pub credentials: Credentials,
}

impl SignedDomainParams {
    /// Decode from query parameters.
    pub fn from_query(query: &QueryParams) -> Result<Self, TokenServerError> {
        let domain = parse_domain(query)?;
        let credentials = parse_credentials(query)?;
        Ok(Self {
            domain,
            credentials,
        })
    }
}

/// Parameters of `getToken`, `setToken` and `deleteToken`.
#[derive(Debug, Clone)]
pub struct SignedTokenParams {
    /// Target domain.
    pub domain: DomainId,
    /// Token identifier.
    pub token_id: String,
    /// Signature material.
    pub credentials: Credentials,
}

impl SignedTokenParams {
    /// Decode from query parameters.
    pub fn from_query(query: &QueryParams) -> Result<Self, TokenServerError> {
        let domain = parse_domain(query)?;
        let token_id = query
            .get(TOKEN_ID)
            .ok_or(TokenServerError::MissingParameter { field: TOKEN_ID })?
            .clone();
        let credentials = parse_credentials(query)?;
        Ok(Self {
            domain,
            token_id,
            credentials,
        })
    }
}

fn parse_domain(query: &QueryParams) -> Result<DomainId, TokenServerError> {
    let raw = query
        .get(DOMAIN)
        .ok_or(TokenServerError::MissingParameter { field: DOMAIN })?;
    raw.parse()
        .map_err(|e| TokenServerError::InvalidQuery(format!("Invalid domain: {}", e)))
}

fn parse_credentials(query: &QueryParams) -> Result<Credentials, TokenServerError> {
    let public_key = query.get(PUB_KEY).ok_or(TokenServerError::SignatureMissing)?;
    let public_key = decode_public_key(public_key)?;

    let timestamp = query.get(TIMESTAMP).ok_or(TokenServerError::SignatureMissing)?;
    let timestamp = parse_timestamp_millis(timestamp)?;

    let signature = query.get(SIGNATURE).ok_or(TokenServerError::SignatureMissing)?;
    let signature = decode_signature(signature)?;

    Ok(Credentials {
        public_key,
        timestamp,
        signature,
    })
}

/// Encode credentials as query pairs.
pub fn credential_pairs(credentials: &Credentials) -> Vec<(&'static str, String)> {
    vec![
        (PUB_KEY, encode_public_key(&credentials.public_key)),
        (TIMESTAMP, credentials.timestamp.timestamp_millis().to_string()),
        (SIGNATURE, encode_signature(&credentials.signature)),
    ]
}

/// Decode a `setToken` request body.
///
/// Size is checked before anything else so oversized input is never
/// buffered into the store.
///
/// # Errors
/// * `PayloadTooLarge` - body exceeds [`MAX_TOKEN_VALUE_BYTES`]
/// * `InvalidTokenValue` - body is not UTF-8
pub fn decode_token_value(body: &[u8]) -> Result<String, TokenServerError> {
    if body.len() > MAX_TOKEN_VALUE_BYTES {
        return Err(TokenServerError::PayloadTooLarge {
            max: MAX_TOKEN_VALUE_BYTES,
        });
    }
    String::from_utf8(body.to_vec()).map_err(|_| TokenServerError::InvalidTokenValue)
}

/// Response of `createDomain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedDomain {
    /// Identifier of the new domain.
    pub domain: DomainId,
    /// When the domain expires unless accessed again.
    pub expires: DateTime<Utc>,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always `true`.
    pub error: bool,
    /// Short machine-readable reason.
    pub reason: String,
}

impl From<&TokenServerError> for ErrorBody {
    fn from(err: &TokenServerError) -> Self {
        Self {
            error: true,
            reason: err.reason().to_string(),
        }
    }
}
