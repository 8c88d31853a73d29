//! Canonical message construction for request signatures.
//!
//! The signed bytes for a request are the UTF-8 concatenation of the
//! operation tag and its operands, with no separators, followed by the
//! request timestamp:
//! ```text
//! setToken<DOMAIN-UUID><tokenID><token value><i64 millis, big-endian>
//! ```
//! The domain is rendered as an upper-case hyphenated UUID.
//!
//! Operand boundaries are not encoded. For `setToken` the split between
//! token ID and value is therefore not signed: `("t1", "v1")` and
//! `("t", "1v1")` produce the same message and share signatures. The
//! layout is fixed by the wire protocol and cannot change without breaking
//! existing clients.

use crate::store::DomainId;
use chrono::{DateTime, Utc};

/// The exact operation a signature authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignableRequest {
    /// Read the full token mapping of a domain.
    GetDomain {
        /// Target domain.
        domain: DomainId,
    },
    /// Delete a domain and all of its tokens.
    DeleteDomain {
        /// Target domain.
        domain: DomainId,
    },
    /// Read one token.
    GetToken {
        /// Target domain.
        domain: DomainId,
        /// Token identifier.
        token_id: String,
    },
    /// Insert or replace one token.
    SetToken {
        /// Target domain.
        domain: DomainId,
        /// Token identifier.
        token_id: String,
        /// Value to store.
        token: String,
    },
    /// Remove one token.
    DeleteToken {
        /// Target domain.
        domain: DomainId,
        /// Token identifier.
        token_id: String,
    },
}

impl SignableRequest {
    /// Operation tag as it appears in the canonical message.
    pub fn tag(&self) -> &'static str {
        match self {
            SignableRequest::GetDomain { .. } => "getDomain",
            SignableRequest::DeleteDomain { .. } => "deleteDomain",
            SignableRequest::GetToken { .. } => "getToken",
            SignableRequest::SetToken { .. } => "setToken",
            SignableRequest::DeleteToken { .. } => "deleteToken",
        }
    }

    /// Domain the request targets.
    pub fn domain(&self) -> DomainId {
        match self {
            SignableRequest::GetDomain { domain }
            | SignableRequest::DeleteDomain { domain }
            | SignableRequest::GetToken { domain, .. }
            | SignableRequest::SetToken { domain, .. }
            | SignableRequest::DeleteToken { domain, .. } => *domain,
        }
    }
}

/// Encode a timestamp as fixed-width big-endian milliseconds since the Unix epoch.
pub fn encode_timestamp(timestamp: DateTime<Utc>) -> [u8; 8] {
    timestamp.timestamp_millis().to_be_bytes()
}

/// Build the canonical message signed for `request` at `timestamp`.
///
/// Infallible: every operand is already UTF-8.
pub fn canonical_message(request: &SignableRequest, timestamp: DateTime<Utc>) -> Vec<u8> {
    let domain = request.domain().to_string();
    let operands: Vec<&str> = match request {
        SignableRequest::GetDomain { .. } | SignableRequest::DeleteDomain { .. } => {
            vec![domain.as_str()]
        }
        SignableRequest::GetToken { token_id, .. }
        | SignableRequest::DeleteToken { token_id, .. } => vec![domain.as_str(), token_id.as_str()],
        SignableRequest::SetToken {
            token_id, token, ..
        } => vec![domain.as_str(), token_id.as_str(), token.as_str()],
    };

    let mut message = Vec::with_capacity(
        request.tag().len() + operands.iter().map(|s| s.len()).sum::<usize>() + 8,
    );
    message.extend_from_slice(request.tag().as_bytes());
    for operand in operands {
        message.extend_from_slice(operand.as_bytes());
    }
    message.extend_from_slice(&encode_timestamp(timestamp));
    message
}
