//! Request authorization gate.
//!
//! Every authenticated operation passes through [`authorize`], which runs
//! the checks in a fixed order and stops at the first failure:
//! 1. Timestamp freshness
//! 2. Domain existence
//! 3. Claimed key matches the owning key
//! 4. Signature verifies against the owning key
//!
//! Reporting "unknown domain", "invalid key" and "invalid signature"
//! separately lets a caller tell these cases apart.

use crate::crypto::{freshness::check_freshness, signing::SignableRequest, verify::verify_request};
use crate::store::DomainRecord;
use crate::TokenServerError;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::VerifyingKey;

/// Signature material presented with an authenticated request.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Public key the caller claims owns the domain.
    pub public_key: VerifyingKey,
    /// Timestamp the caller signed.
    pub timestamp: DateTime<Utc>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// Authorize `request` against the current state of its domain.
///
/// `domain` is the live record for `request.domain()`, or `None` if there is
/// no such live domain. On success the same record is handed back.
///
/// # Errors
/// * `InvalidTimestamp` - timestamp outside `(now - tolerance, now)`
/// * `UnknownDomain` - no live domain
/// * `InvalidKey` - claimed key differs from the owning key
/// * `SignatureInvalid` - signature does not verify
pub fn authorize<'a>(
    request: &SignableRequest,
    credentials: &Credentials,
    domain: Option<&'a DomainRecord>,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<&'a DomainRecord, TokenServerError> {
    check_freshness(credentials.timestamp, now, tolerance)?;

    let record = domain.ok_or(TokenServerError::UnknownDomain)?;

    if !record.is_owned_by(&credentials.public_key) {
        return Err(TokenServerError::InvalidKey);
    }

    // Verify against the stored key, not the claimed one
    if !verify_request(
        &credentials.signature,
        request,
        credentials.timestamp,
        record.owner(),
    ) {
        return Err(TokenServerError::SignatureInvalid);
    }

    Ok(record)
}
