//! Reqwest-based HTTP client for a token server.
//!
//! The client holds the domain owner's signing key and signs every
//! authenticated request itself, so callers only deal in domains, token IDs
//! and values.

use crate::clock::{Clock, SystemClock};
use crate::crypto::{
    signing::SignableRequest,
    verify::{encode_public_key, sign_request},
};
use crate::policy::Credentials;
use crate::protocol::models::{
    credential_pairs, CreatedDomain, ErrorBody, DOMAIN, PUB_KEY, TOKEN_ID,
};
use crate::store::DomainId;
use crate::TokenServerError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ed25519_dalek::SigningKey;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// How far before "now" requests are stamped, so they arrive strictly in the past.
pub const SIGNING_BACKDATE_MS: i64 = 250;

/// HTTP response with status and raw body.
#[derive(Debug)]
pub struct TokenResponse {
    /// HTTP status code.
    pub status: u16,

    /// Raw response body.
    pub body: Vec<u8>,
}

impl TokenResponse {
    /// Capture status and body from a reqwest Response.
    fn from_response(response: Response) -> Result<Self, TokenServerError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| TokenServerError::Transport(format!("Failed to read body: {}", e)))?
            .to_vec();

        Ok(Self { status, body })
    }

    /// Get the body as a UTF-8 string.
    pub fn body_str(&self) -> Result<&str, TokenServerError> {
        std::str::from_utf8(&self.body)
            .map_err(|e| TokenServerError::ProtocolError(format!("Invalid UTF-8 in body: {}", e)))
    }

    /// Turn a non-200 response into `Rejected`, keeping the server's reason.
    fn ensure_ok(self) -> Result<Self, TokenServerError> {
        if self.status == 200 {
            return Ok(self);
        }
        let reason = serde_json::from_slice::<ErrorBody>(&self.body)
            .map(|body| body.reason)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.body).into_owned());
        Err(TokenServerError::Rejected {
            status: self.status,
            reason,
        })
    }

    fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, TokenServerError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| TokenServerError::ProtocolError(format!("Parse error: {}", e)))
    }
}

/// Token server HTTP client bound to one signing key.
pub struct TokenClient {
    client: Client,
    base_url: String,
    signing_key: SigningKey,
    clock: Arc<dyn Clock>,
    user_agent: String,
}

impl TokenClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:5555`).
    pub fn new(base_url: &str, signing_key: SigningKey) -> Result<Self, TokenServerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TokenServerError::Transport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signing_key,
            clock: Arc::new(SystemClock),
            user_agent: build_user_agent(),
        })
    }

    /// Replace the clock used to stamp requests (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set request timeout with fallible construction.
    pub fn try_with_timeout(mut self, timeout: Duration) -> Result<Self, TokenServerError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TokenServerError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign `request` with a timestamp just behind the clock.
    pub fn credentials_for(&self, request: &SignableRequest) -> Credentials {
        let timestamp: DateTime<Utc> =
            self.clock.now_utc() - ChronoDuration::milliseconds(SIGNING_BACKDATE_MS);
        Credentials {
            public_key: self.signing_key.verifying_key(),
            timestamp,
            signature: sign_request(request, timestamp, &self.signing_key)
                .to_bytes()
                .to_vec(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, builder: RequestBuilder) -> Result<TokenResponse, TokenServerError> {
        let response = builder
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|e| TokenServerError::Transport(format!("Request failed: {}", e)))?;
        TokenResponse::from_response(response)?.ensure_ok()
    }

    fn signed_query(
        &self,
        request: &SignableRequest,
        token_id: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![(DOMAIN, request.domain().to_string())];
        if let Some(token_id) = token_id {
            query.push((TOKEN_ID, token_id.to_string()));
        }
        query.extend(credential_pairs(&self.credentials_for(request)));
        query
    }

    /// Check the server's health endpoint.
    pub fn health(&self) -> Result<String, TokenServerError> {
        let response = self.send(self.client.get(self.url("/")))?;
        Ok(response.body_str()?.to_string())
    }

    /// Create a domain owned by this client's key.
    pub fn create_domain(&self) -> Result<CreatedDomain, TokenServerError> {
        let key = encode_public_key(&self.signing_key.verifying_key());
        let response = self.send(
            self.client
                .put(self.url("/domain"))
                .query(&[(PUB_KEY, key)]),
        )?;
        response.json()
    }

    /// Fetch every token in a domain.
    pub fn get_domain(&self, domain: DomainId) -> Result<BTreeMap<String, String>, TokenServerError> {
        let request = SignableRequest::GetDomain { domain };
        let query = self.signed_query(&request, None);
        let response = self.send(self.client.get(self.url("/domain")).query(&query))?;
        response.json()
    }

    /// Renew a domain's expiry. Returns the new expiry.
    pub fn revalidate_domain(&self, domain: DomainId) -> Result<DateTime<Utc>, TokenServerError> {
        let response = self.send(
            self.client
                .post(self.url("/domain"))
                .query(&[(DOMAIN, domain.to_string())]),
        )?;
        response.json()
    }

    /// Delete a domain.
    pub fn delete_domain(&self, domain: DomainId) -> Result<(), TokenServerError> {
        let request = SignableRequest::DeleteDomain { domain };
        let query = self.signed_query(&request, None);
        self.send(self.client.delete(self.url("/domain")).query(&query))?;
        Ok(())
    }

    /// Fetch one token.
    pub fn get_token(&self, domain: DomainId, token_id: &str) -> Result<String, TokenServerError> {
        let request = SignableRequest::GetToken {
            domain,
            token_id: token_id.to_string(),
        };
        let query = self.signed_query(&request, Some(token_id));
        let response = self.send(self.client.get(self.url("/token")).query(&query))?;
        response.json()
    }

    /// Store one token.
    pub fn set_token(
        &self,
        domain: DomainId,
        token_id: &str,
        value: &str,
    ) -> Result<(), TokenServerError> {
        let request = SignableRequest::SetToken {
            domain,
            token_id: token_id.to_string(),
            token: value.to_string(),
        };
        let query = self.signed_query(&request, Some(token_id));
        self.send(
            self.client
                .put(self.url("/token"))
                .query(&query)
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(value.to_string()),
        )?;
        Ok(())
    }

    /// Remove one token.
    pub fn delete_token(&self, domain: DomainId, token_id: &str) -> Result<(), TokenServerError> {
        let request = SignableRequest::DeleteToken {
            domain,
            token_id: token_id.to_string(),
        };
        let query = self.signed_query(&request, Some(token_id));
        self.send(self.client.delete(self.url("/token")).query(&query))?;
        Ok(())
    }
}

/// Build the client User-Agent string.
///
/// Format: `tokenwarden-client/<version>`
pub fn build_user_agent() -> String {
    format!("tokenwarden-client/{}", env!("CARGO_PKG_VERSION"))
}
