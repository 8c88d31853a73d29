//! Tokenwarden configuration.

use std::time::Duration;

/// Maximum size of a stored token value, enforced at ingress.
pub const MAX_TOKEN_VALUE_BYTES: usize = 64;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5555;

/// Configuration for a token server.
///
/// All durations are adjustable at startup; nothing here changes while the
/// server runs.
#[derive(Debug, Clone)]
pub struct TokenServerConfig {
    /// Address to bind the HTTP listener to.
    pub host: String,

    /// Port to bind the HTTP listener to.
    pub port: u16,

    /// How far every successful access pushes a domain's expiry forward.
    /// Also the lifetime of a freshly created domain.
    pub inactive_domain_timeout: Duration,

    /// How old a signed request timestamp may be before it is rejected.
    pub signature_timestamp_tolerance: Duration,

    /// Period of the background sweep that reclaims expired domains.
    pub sweep_interval: Duration,
}

impl Default for TokenServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            inactive_domain_timeout: Duration::from_secs(60 * 60 * 24),
            signature_timestamp_tolerance: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl TokenServerConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), crate::TokenServerError> {
        if self.inactive_domain_timeout.is_zero() {
            return Err(crate::TokenServerError::ConfigError(
                "inactive_domain_timeout cannot be zero".to_string(),
            ));
        }
        if self.signature_timestamp_tolerance.is_zero() {
            return Err(crate::TokenServerError::ConfigError(
                "signature_timestamp_tolerance cannot be zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(crate::TokenServerError::ConfigError(
                "sweep_interval cannot be zero".to_string(),
            ));
        }
        // chrono durations are bounded well below Duration::MAX
        if chrono::Duration::from_std(self.inactive_domain_timeout).is_err()
            || chrono::Duration::from_std(self.signature_timestamp_tolerance).is_err()
        {
            return Err(crate::TokenServerError::ConfigError(
                "durations are out of range".to_string(),
            ));
        }
        Ok(())
    }

    /// Domain TTL as a chrono duration.
    pub(crate) fn ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.inactive_domain_timeout)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Timestamp tolerance as a chrono duration.
    pub(crate) fn tolerance(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.signature_timestamp_tolerance)
            .unwrap_or(chrono::Duration::MAX)
    }
}
