//! Domain Manager - the main public API for Tokenwarden.
//!
//! The `DomainManager` owns the domain table and exposes the service
//! operations:
//! - `create_domain` (unauthenticated, trust-on-first-use)
//! - `get_domain`, `delete_domain`
//! - `get_token`, `set_token`, `delete_token`
//! - `revalidate_domain` (unauthenticated, renews expiry only)
//!
//! Every authenticated operation runs authorization, the store change and
//! the expiry renewal under one lock, so no other request can interleave
//! with it. Concurrent writes to the same token resolve last-writer-wins in
//! lock order.

use crate::clock::{Clock, SystemClock};
use crate::config::{TokenServerConfig, MAX_TOKEN_VALUE_BYTES};
use crate::crypto::{signing::SignableRequest, verify::key_fingerprint};
use crate::policy::{authorize, Credentials};
use crate::protocol::models::CreatedDomain;
use crate::store::{DomainId, DomainTable};
use crate::TokenServerError;
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Main domain manager for Tokenwarden.
///
/// Create one instance per process and share it (e.g. behind an `Arc`)
/// between all request handlers.
pub struct DomainManager {
    config: TokenServerConfig,
    clock: Arc<dyn Clock>,
    table: Mutex<DomainTable>,
}

impl DomainManager {
    /// Create a new domain manager with the given configuration.
    ///
    /// Uses the system clock for time operations.
    ///
    /// # Errors
    /// Returns an error if configuration validation fails.
    pub fn new(config: TokenServerConfig) -> Result<Self, TokenServerError> {
        config.validate()?;
        Ok(Self::with_clock(config, Arc::new(SystemClock)))
    }

    /// Create a domain manager with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        config: TokenServerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenServerError> {
        config.validate()?;
        Ok(Self::with_clock(config, clock))
    }

    fn with_clock(config: TokenServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            table: Mutex::new(DomainTable::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DomainTable>, TokenServerError> {
        self.table
            .lock()
            .map_err(|_| TokenServerError::EncodingError("domain table lock poisoned".to_string()))
    }

    /// Run `op` on the table once `request` has passed authorization.
    ///
    /// The lock is held from the freshness check through `op`, which makes
    /// the whole operation atomic with respect to every other request.
    fn authorized<T>(
        &self,
        request: SignableRequest,
        credentials: &Credentials,
        op: impl FnOnce(&mut DomainTable, DateTime<Utc>) -> Result<T, TokenServerError>,
    ) -> Result<T, TokenServerError> {
        let mut table = self.lock()?;
        let now = self.clock.now_utc();
        let domain = request.domain();

        if let Err(err) = authorize(
            &request,
            credentials,
            table.get(domain, now),
            now,
            self.config.tolerance(),
        ) {
            debug!(
                domain = %domain,
                operation = request.tag(),
                reason = err.reason(),
                "request rejected"
            );
            return Err(err);
        }

        op(&mut *table, now)
    }

    /// Create a domain owned by `public_key`.
    ///
    /// No proof of possession of the matching private key is required: the
    /// first key presented for a domain becomes its owner (trust-on-first-use).
    pub fn create_domain(
        &self,
        public_key: VerifyingKey,
    ) -> Result<CreatedDomain, TokenServerError> {
        let mut table = self.lock()?;
        let now = self.clock.now_utc();
        let (domain, expires) = table.create(public_key, now, self.config.ttl());

        debug!(
            domain = %domain,
            key = %key_fingerprint(&public_key),
            expires = %expires,
            "domain created"
        );

        Ok(CreatedDomain { domain, expires })
    }

    /// Read a domain's full token mapping and renew its expiry.
    pub fn get_domain(
        &self,
        domain: DomainId,
        credentials: &Credentials,
    ) -> Result<BTreeMap<String, String>, TokenServerError> {
        let ttl = self.config.ttl();
        self.authorized(
            SignableRequest::GetDomain { domain },
            credentials,
            |table, now| {
                table
                    .revalidate(domain, now, ttl)
                    .ok_or(TokenServerError::UnknownDomain)?;
                table
                    .get(domain, now)
                    .map(|record| record.tokens().clone())
                    .ok_or(TokenServerError::UnknownDomain)
            },
        )
    }

    /// Renew a domain's expiry without authentication.
    ///
    /// Returns the new expiry.
    pub fn revalidate_domain(&self, domain: DomainId) -> Result<DateTime<Utc>, TokenServerError> {
        let mut table = self.lock()?;
        let now = self.clock.now_utc();
        table
            .revalidate(domain, now, self.config.ttl())
            .ok_or(TokenServerError::UnknownDomain)
    }

    /// Delete a domain and all of its tokens.
    pub fn delete_domain(
        &self,
        domain: DomainId,
        credentials: &Credentials,
    ) -> Result<(), TokenServerError> {
        self.authorized(
            SignableRequest::DeleteDomain { domain },
            credentials,
            |table, _| {
                table.delete(domain);
                debug!(domain = %domain, "domain deleted");
                Ok(())
            },
        )
    }

    /// Read one token and renew the domain's expiry.
    ///
    /// An unknown token does not renew the expiry.
    pub fn get_token(
        &self,
        domain: DomainId,
        token_id: &str,
        credentials: &Credentials,
    ) -> Result<String, TokenServerError> {
        let ttl = self.config.ttl();
        self.authorized(
            SignableRequest::GetToken {
                domain,
                token_id: token_id.to_string(),
            },
            credentials,
            |table, now| {
                let value = table
                    .get(domain, now)
                    .ok_or(TokenServerError::UnknownDomain)?
                    .token(token_id)
                    .map(str::to_string)
                    .ok_or(TokenServerError::UnknownToken)?;
                table.revalidate(domain, now, ttl);
                Ok(value)
            },
        )
    }

    /// Insert or replace one token and renew the domain's expiry.
    ///
    /// The size cap is checked first; an oversized value is rejected before
    /// any authorization work and never reaches the store.
    pub fn set_token(
        &self,
        domain: DomainId,
        token_id: &str,
        value: &str,
        credentials: &Credentials,
    ) -> Result<(), TokenServerError> {
        if value.len() > MAX_TOKEN_VALUE_BYTES {
            return Err(TokenServerError::PayloadTooLarge {
                max: MAX_TOKEN_VALUE_BYTES,
            });
        }

        let ttl = self.config.ttl();
        self.authorized(
            SignableRequest::SetToken {
                domain,
                token_id: token_id.to_string(),
                token: value.to_string(),
            },
            credentials,
            |table, now| {
                table
                    .set_token(domain, token_id.to_string(), value.to_string(), now, ttl)
                    .map(|_| ())
                    .ok_or(TokenServerError::UnknownDomain)
            },
        )
    }

    /// Remove one token and renew the domain's expiry.
    ///
    /// Removing a token that does not exist still succeeds.
    pub fn delete_token(
        &self,
        domain: DomainId,
        token_id: &str,
        credentials: &Credentials,
    ) -> Result<(), TokenServerError> {
        let ttl = self.config.ttl();
        self.authorized(
            SignableRequest::DeleteToken {
                domain,
                token_id: token_id.to_string(),
            },
            credentials,
            |table, now| {
                table
                    .delete_token(domain, token_id, now, ttl)
                    .map(|_| ())
                    .ok_or(TokenServerError::UnknownDomain)
            },
        )
    }

    /// Reclaim every expired domain. Returns how many were removed.
    ///
    /// Expired domains are already invisible to all operations; this only
    /// frees their memory.
    pub fn purge_expired(&self) -> Result<usize, TokenServerError> {
        let mut table = self.lock()?;
        let removed = table.purge_expired(self.clock.now_utc());
        if removed > 0 {
            debug!(removed, remaining = table.len(), "expired domains purged");
        }
        Ok(removed)
    }

    /// Number of stored domains, expired ones included until purged.
    pub fn domain_count(&self) -> Result<usize, TokenServerError> {
        Ok(self.lock()?.len())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &TokenServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::crypto::verify::sign_request;
    use chrono::{Duration, TimeZone};
    use ed25519_dalek::SigningKey;
    use std::thread;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn key_a() -> SigningKey {
        SigningKey::from_bytes(&[0xA1; 32])
    }

    fn key_b() -> SigningKey {
        SigningKey::from_bytes(&[0xB2; 32])
    }

    fn setup() -> (DomainManager, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(t0()));
        let manager =
            DomainManager::new_with_clock(TokenServerConfig::default(), clock.clone()).unwrap();
        (manager, clock)
    }

    /// Credentials signed one second before the clock's current time.
    fn creds(request: &SignableRequest, key: &SigningKey, clock: &MockClock) -> Credentials {
        let ts = clock.now_utc() - Duration::seconds(1);
        Credentials {
            public_key: key.verifying_key(),
            timestamp: ts,
            signature: sign_request(request, ts, key).to_bytes().to_vec(),
        }
    }

    fn set_creds(
        domain: DomainId,
        token_id: &str,
        value: &str,
        key: &SigningKey,
        clock: &MockClock,
    ) -> Credentials {
        let request = SignableRequest::SetToken {
            domain,
            token_id: token_id.to_string(),
            token: value.to_string(),
        };
        creds(&request, key, clock)
    }

    fn get_creds(domain: DomainId, token_id: &str, key: &SigningKey, clock: &MockClock) -> Credentials {
        let request = SignableRequest::GetToken {
            domain,
            token_id: token_id.to_string(),
        };
        creds(&request, key, clock)
    }

    #[test]
    fn test_manager_rejects_invalid_config() {
        let config = TokenServerConfig {
            signature_timestamp_tolerance: std::time::Duration::ZERO,
            ..TokenServerConfig::default()
        };
        assert!(matches!(
            DomainManager::new(config),
            Err(TokenServerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_create_domain_sets_expiry() {
        let (manager, _) = setup();
        let created = manager.create_domain(key_a().verifying_key()).unwrap();
        assert_eq!(created.expires, t0() + Duration::seconds(86400));
        assert_eq!(manager.domain_count().unwrap(), 1);
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;

        clock.advance(Duration::seconds(5));
        manager
            .set_token(domain, "t1", "v1", &set_creds(domain, "t1", "v1", &key_a(), &clock))
            .unwrap();

        clock.advance(Duration::seconds(5));
        let value = manager
            .get_token(domain, "t1", &get_creds(domain, "t1", &key_a(), &clock))
            .unwrap();
        assert_eq!(value, "v1");
    }

    #[test]
    fn test_example_scenario() {
        let (manager, clock) = setup();
        let created = manager.create_domain(key_a().verifying_key()).unwrap();
        let domain = created.domain;

        clock.advance(Duration::seconds(3));
        manager
            .set_token(domain, "t1", "v1", &set_creds(domain, "t1", "v1", &key_a(), &clock))
            .unwrap();

        clock.advance(Duration::seconds(2));
        let get = get_creds(domain, "t1", &key_a(), &clock);
        assert_eq!(manager.get_token(domain, "t1", &get).unwrap(), "v1");

        // Same request replayed 20 seconds later
        clock.advance(Duration::seconds(20));
        assert!(matches!(
            manager.get_token(domain, "t1", &get),
            Err(TokenServerError::InvalidTimestamp)
        ));

        // Correctly signed by B, but B does not own the domain
        let request = SignableRequest::DeleteDomain { domain };
        let err = manager
            .delete_domain(domain, &creds(&request, &key_b(), &clock))
            .unwrap_err();
        assert!(matches!(err, TokenServerError::InvalidKey));
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_authenticated_access_extends_expiry() {
        let (manager, clock) = setup();
        let created = manager.create_domain(key_a().verifying_key()).unwrap();
        let domain = created.domain;

        clock.advance(Duration::seconds(5));
        manager
            .set_token(domain, "t1", "v1", &set_creds(domain, "t1", "v1", &key_a(), &clock))
            .unwrap();

        let expires = manager.revalidate_domain(domain).unwrap();
        // One renewal from setToken, one from revalidate
        assert_eq!(expires, created.expires + Duration::seconds(2 * 86400));
    }

    #[test]
    fn test_revalidate_unknown_domain() {
        let (manager, _) = setup();
        assert!(matches!(
            manager.revalidate_domain(DomainId::new_random()),
            Err(TokenServerError::UnknownDomain)
        ));
    }

    #[test]
    fn test_revalidate_is_strictly_later_by_ttl() {
        let (manager, _) = setup();
        let created = manager.create_domain(key_a().verifying_key()).unwrap();
        let first = manager.revalidate_domain(created.domain).unwrap();
        let second = manager.revalidate_domain(created.domain).unwrap();
        assert_eq!(first, created.expires + Duration::seconds(86400));
        assert_eq!(second, first + Duration::seconds(86400));
    }

    #[test]
    fn test_oversized_value_rejected_without_mutation() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        let value = "x".repeat(100);

        clock.advance(Duration::seconds(2));
        let err = manager
            .set_token(domain, "t1", &value, &set_creds(domain, "t1", &value, &key_a(), &clock))
            .unwrap_err();
        assert!(matches!(err, TokenServerError::PayloadTooLarge { .. }));
        assert_eq!(err.status_code(), 413);

        let request = SignableRequest::GetDomain { domain };
        let tokens = manager
            .get_domain(domain, &creds(&request, &key_a(), &clock))
            .unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_get_domain_returns_all_tokens() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        for (id, value) in [("a", "1"), ("b", "2")] {
            manager
                .set_token(domain, id, value, &set_creds(domain, id, value, &key_a(), &clock))
                .unwrap();
        }

        let request = SignableRequest::GetDomain { domain };
        let tokens = manager
            .get_domain(domain, &creds(&request, &key_a(), &clock))
            .unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["a"], "1");
        assert_eq!(tokens["b"], "2");
    }

    #[test]
    fn test_unknown_token() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        let err = manager
            .get_token(domain, "nope", &get_creds(domain, "nope", &key_a(), &clock))
            .unwrap_err();
        assert!(matches!(err, TokenServerError::UnknownToken));
    }

    #[test]
    fn test_delete_token_removes_value() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        manager
            .set_token(domain, "t1", "v1", &set_creds(domain, "t1", "v1", &key_a(), &clock))
            .unwrap();
        let request = SignableRequest::DeleteToken {
            domain,
            token_id: "t1".to_string(),
        };
        manager
            .delete_token(domain, "t1", &creds(&request, &key_a(), &clock))
            .unwrap();

        let err = manager
            .get_token(domain, "t1", &get_creds(domain, "t1", &key_a(), &clock))
            .unwrap_err();
        assert!(matches!(err, TokenServerError::UnknownToken));
    }

    #[test]
    fn test_deleted_domain_is_unknown_everywhere() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        let request = SignableRequest::DeleteDomain { domain };
        manager
            .delete_domain(domain, &creds(&request, &key_a(), &clock))
            .unwrap();

        assert!(matches!(
            manager.revalidate_domain(domain),
            Err(TokenServerError::UnknownDomain)
        ));
        assert!(matches!(
            manager.get_token(domain, "t1", &get_creds(domain, "t1", &key_a(), &clock)),
            Err(TokenServerError::UnknownDomain)
        ));
        assert!(matches!(
            manager.set_token(domain, "t1", "v", &set_creds(domain, "t1", "v", &key_a(), &clock)),
            Err(TokenServerError::UnknownDomain)
        ));
        let request = SignableRequest::GetDomain { domain };
        assert!(matches!(
            manager.get_domain(domain, &creds(&request, &key_a(), &clock)),
            Err(TokenServerError::UnknownDomain)
        ));
        let request = SignableRequest::DeleteToken {
            domain,
            token_id: "t1".to_string(),
        };
        assert!(matches!(
            manager.delete_token(domain, "t1", &creds(&request, &key_a(), &clock)),
            Err(TokenServerError::UnknownDomain)
        ));
        let request = SignableRequest::DeleteDomain { domain };
        assert!(matches!(
            manager.delete_domain(domain, &creds(&request, &key_a(), &clock)),
            Err(TokenServerError::UnknownDomain)
        ));
    }

    #[test]
    fn test_expired_domain_is_unknown_and_purged() {
        let (manager, clock) = setup();
        let created = manager.create_domain(key_a().verifying_key()).unwrap();

        clock.set(created.expires);
        assert!(matches!(
            manager.revalidate_domain(created.domain),
            Err(TokenServerError::UnknownDomain)
        ));
        assert_eq!(manager.domain_count().unwrap(), 1);
        assert_eq!(manager.purge_expired().unwrap(), 1);
        assert_eq!(manager.domain_count().unwrap(), 0);
    }

    #[test]
    fn test_signature_over_other_value_rejected() {
        let (manager, clock) = setup();
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        // Signed for "v1" but submitted with "v2"
        let creds = set_creds(domain, "t1", "v1", &key_a(), &clock);
        let err = manager.set_token(domain, "t1", "v2", &creds).unwrap_err();
        assert!(matches!(err, TokenServerError::SignatureInvalid));
    }

    #[test]
    fn test_concurrent_writes_same_token_last_writer_wins() {
        let (manager, clock) = setup();
        let manager = Arc::new(manager);
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        let values: Vec<String> = (0..8).map(|i| format!("value-{}", i)).collect();
        let handles: Vec<_> = values
            .iter()
            .map(|value| {
                let manager = Arc::clone(&manager);
                let creds = set_creds(domain, "shared", value, &key_a(), &clock);
                let value = value.clone();
                thread::spawn(move || manager.set_token(domain, "shared", &value, &creds))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stored = manager
            .get_token(domain, "shared", &get_creds(domain, "shared", &key_a(), &clock))
            .unwrap();
        assert!(values.contains(&stored));

        // Every successful write renewed the expiry exactly once
        let expires = manager.revalidate_domain(domain).unwrap();
        assert_eq!(
            expires,
            t0() + Duration::seconds(86400) * (1 + 8 + 1 + 1)
        );
    }

    #[test]
    fn test_concurrent_writes_distinct_tokens_all_kept() {
        let (manager, clock) = setup();
        let manager = Arc::new(manager);
        let domain = manager.create_domain(key_a().verifying_key()).unwrap().domain;
        clock.advance(Duration::seconds(2));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let id = format!("t{}", i);
                let creds = set_creds(domain, &id, "v", &key_a(), &clock);
                thread::spawn(move || manager.set_token(domain, &id, "v", &creds))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let request = SignableRequest::GetDomain { domain };
        let tokens = manager
            .get_domain(domain, &creds(&request, &key_a(), &clock))
            .unwrap();
        assert_eq!(tokens.len(), 8);
    }
}
