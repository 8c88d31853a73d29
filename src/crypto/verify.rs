//! Ed25519 signing and verification of canonical request messages.

use crate::crypto::signing::{canonical_message, SignableRequest};
use crate::TokenServerError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

/// Decode a base64-encoded Ed25519 public key.
pub fn decode_public_key(key_b64: &str) -> Result<VerifyingKey, TokenServerError> {
    let bytes = STANDARD
        .decode(key_b64)
        .map_err(|e| TokenServerError::InvalidQuery(format!("Invalid public key base64: {}", e)))?;

    let key_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| TokenServerError::InvalidQuery("Public key must be 32 bytes".to_string()))?;

    VerifyingKey::from_bytes(&key_array)
        .map_err(|e| TokenServerError::InvalidQuery(format!("Invalid Ed25519 public key: {}", e)))
}

/// Encode a public key the way it travels on the wire.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.as_bytes())
}

/// Decode a base64 signature into raw bytes.
///
/// Length is deliberately not checked here: a wrong-length signature is a
/// signature that fails verification, not a malformed query.
pub fn decode_signature(signature_b64: &str) -> Result<Vec<u8>, TokenServerError> {
    STANDARD
        .decode(signature_b64)
        .map_err(|e| TokenServerError::InvalidQuery(format!("Invalid signature base64: {}", e)))
}

/// Encode raw signature bytes the way they travel on the wire.
pub fn encode_signature(signature: &[u8]) -> String {
    STANDARD.encode(signature)
}

/// Short hex fingerprint of a public key, safe for logs.
pub fn key_fingerprint(key: &VerifyingKey) -> String {
    hex::encode(&key.as_bytes()[..8])
}

/// Sign `request` at `timestamp`.
pub fn sign_request(
    request: &SignableRequest,
    timestamp: DateTime<Utc>,
    key: &SigningKey,
) -> Signature {
    key.sign(&canonical_message(request, timestamp))
}

/// Verify raw signature bytes over `message`.
///
/// Uses strict verification, which also rejects small-order keys and
/// non-canonical signature encodings.
pub fn verify_signature(signature: &[u8], message: &[u8], key: &VerifyingKey) -> bool {
    let Ok(sig_array) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_array);
    key.verify_strict(message, &signature).is_ok()
}

/// Verify a signature over `request` at `timestamp`.
pub fn verify_request(
    signature: &[u8],
    request: &SignableRequest,
    timestamp: DateTime<Utc>,
    key: &VerifyingKey,
) -> bool {
    verify_signature(signature, &canonical_message(request, timestamp), key)
}
