//! Tokenwarden error types.

use thiserror::Error;

/// Errors that can occur while serving or calling the token service.
#[derive(Debug, Error)]
pub enum TokenServerError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A required non-signature parameter was absent.
    #[error("Missing parameter: {field}")]
    MissingParameter {
        /// Wire name of the absent parameter.
        field: &'static str,
    },

    /// A parameter was present but could not be decoded.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The token value in the request body was not valid UTF-8.
    #[error("Token value is not valid UTF-8")]
    InvalidTokenValue,

    /// One of `pubKey`, `timestamp` or `signature` was absent (fail-closed).
    #[error("Request signature, public key or timestamp missing")]
    SignatureMissing,

    /// Claimed timestamp lies outside the freshness window.
    #[error("Request timestamp outside freshness window")]
    InvalidTimestamp,

    /// Claimed public key does not match the domain's owning key.
    #[error("Public key does not own this domain")]
    InvalidKey,

    /// Signature verification against the owning key failed.
    #[error("Request signature verification failed")]
    SignatureInvalid,

    /// Domain does not exist (or has expired).
    #[error("Unknown domain")]
    UnknownDomain,

    /// Token does not exist within the domain.
    #[error("Unknown token")]
    UnknownToken,

    /// Token value exceeds the ingress cap.
    #[error("Token value larger than {max} bytes")]
    PayloadTooLarge {
        /// Maximum accepted size in bytes.
        max: usize,
    },

    /// Internal encoding or state failure. Treated as a bug, not a client fault.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// HTTP transport error talking to a token server.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response from a token server could not be understood.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A token server rejected the request.
    #[error("Request rejected ({status}): {reason}")]
    Rejected {
        /// HTTP status returned by the server.
        status: u16,
        /// Reason string returned by the server.
        reason: String,
    },
}

/// Coarse rejection category, one per HTTP status the service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or absent non-signature field.
    BadRequest,
    /// Signature-related field absent entirely.
    Unauthorized,
    /// Timestamp out of window, key mismatch or signature mismatch.
    Forbidden,
    /// Domain or token absent.
    NotFound,
    /// Token value over the size limit.
    PayloadTooLarge,
    /// Server-side bug or failure.
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this category.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::Internal => 500,
        }
    }
}

impl TokenServerError {
    /// Category of this error.
    ///
    /// Client-side failures (`Transport`, `ProtocolError`, `ConfigError`)
    /// never reach the wire and are reported as `Internal`. A `Rejected`
    /// error keeps the category of the status the server sent.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenServerError::MissingParameter { .. }
            | TokenServerError::InvalidQuery(_)
            | TokenServerError::InvalidTokenValue => ErrorKind::BadRequest,
            TokenServerError::SignatureMissing => ErrorKind::Unauthorized,
            TokenServerError::InvalidTimestamp
            | TokenServerError::InvalidKey
            | TokenServerError::SignatureInvalid => ErrorKind::Forbidden,
            TokenServerError::UnknownDomain | TokenServerError::UnknownToken => {
                ErrorKind::NotFound
            }
            TokenServerError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            TokenServerError::Rejected { status, .. } => match status {
                400 => ErrorKind::BadRequest,
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                413 => ErrorKind::PayloadTooLarge,
                _ => ErrorKind::Internal,
            },
            TokenServerError::ConfigError(_)
            | TokenServerError::EncodingError(_)
            | TokenServerError::Transport(_)
            | TokenServerError::ProtocolError(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Short machine-readable reason sent back to callers.
    ///
    /// Only the violated check's category is exposed, never internal state.
    pub fn reason(&self) -> &str {
        match self {
            TokenServerError::MissingParameter { field } => match *field {
                "domain" => "missing domain",
                "tokenID" => "missing token id",
                "pubKey" => "missing public key",
                _ => "missing parameter",
            },
            TokenServerError::InvalidQuery(_) => "invalid query",
            TokenServerError::InvalidTokenValue => "unable to decode token value",
            TokenServerError::SignatureMissing => "missing signature",
            TokenServerError::InvalidTimestamp => "invalid timestamp",
            TokenServerError::InvalidKey => "invalid key",
            TokenServerError::SignatureInvalid => "invalid signature",
            TokenServerError::UnknownDomain => "unknown domain",
            TokenServerError::UnknownToken => "unknown token",
            TokenServerError::PayloadTooLarge { .. } => "token content too large",
            TokenServerError::EncodingError(_) => "unable to encode data",
            TokenServerError::Rejected { reason, .. } => reason,
            TokenServerError::ConfigError(_)
            | TokenServerError::Transport(_)
            | TokenServerError::ProtocolError(_) => "internal error",
        }
    }
}
