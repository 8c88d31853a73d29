//! In-memory domain table.
//!
//! The table itself is single-threaded; callers serialize access to it
//! (see [`crate::manager::DomainManager`], which keeps it behind a mutex
//! so that authorization, mutation and expiry renewal form one unit).
//!
//! Expired domains are invisible: every lookup treats a record whose expiry
//! is at or before `now` as absent. [`DomainTable::purge_expired`] reclaims
//! their memory.

use crate::store::record::{DomainId, DomainRecord};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::VerifyingKey;
use std::collections::HashMap;

/// Mapping from domain identifier to domain record.
#[derive(Debug, Default)]
pub struct DomainTable {
    domains: HashMap<DomainId, DomainRecord>,
}

impl DomainTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Create a domain owned by `owner`, expiring at `now + ttl`.
    pub fn create(
        &mut self,
        owner: VerifyingKey,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> (DomainId, DateTime<Utc>) {
        // Ids are never reused
        let mut id = DomainId::new_random();
        while self.domains.contains_key(&id) {
            id = DomainId::new_random();
        }

        let record = DomainRecord::new(id, owner, now, ttl);
        let expires_at = record.expires_at();
        self.domains.insert(id, record);
        (id, expires_at)
    }

    /// Look up a live domain. No side effects.
    pub fn get(&self, id: DomainId, now: DateTime<Utc>) -> Option<&DomainRecord> {
        self.domains.get(&id).filter(|record| !record.is_expired(now))
    }

    fn get_mut(&mut self, id: DomainId, now: DateTime<Utc>) -> Option<&mut DomainRecord> {
        self.domains
            .get_mut(&id)
            .filter(|record| !record.is_expired(now))
    }

    /// Remove a domain. Idempotent; returns whether anything was removed.
    pub fn delete(&mut self, id: DomainId) -> bool {
        self.domains.remove(&id).is_some()
    }

    /// Insert or replace a token and renew the domain's expiry.
    ///
    /// Returns the new expiry, or `None` if the domain is not live.
    pub fn set_token(
        &mut self,
        id: DomainId,
        token_id: String,
        value: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<DateTime<Utc>> {
        let record = self.get_mut(id, now)?;
        record.insert_token(token_id, value);
        Some(record.revalidate(ttl))
    }

    /// Remove a token (absent tokens are fine) and renew the domain's expiry.
    ///
    /// Returns the new expiry, or `None` if the domain is not live.
    pub fn delete_token(
        &mut self,
        id: DomainId,
        token_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<DateTime<Utc>> {
        let record = self.get_mut(id, now)?;
        record.remove_token(token_id);
        Some(record.revalidate(ttl))
    }

    /// Push a live domain's expiry forward by `ttl`.
    pub fn revalidate(
        &mut self,
        id: DomainId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<DateTime<Utc>> {
        self.get_mut(id, now).map(|record| record.revalidate(ttl))
    }

    /// Drop every domain expired at `now`. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.domains.len();
        self.domains.retain(|_, record| !record.is_expired(now));
        before - self.domains.len()
    }
}
