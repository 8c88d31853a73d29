//! Domain identifiers and records.
//!
//! A domain record holds everything the server knows about one domain:
//! - The owning Ed25519 public key, fixed at creation
//! - The token mapping (token ID -> value)
//! - The sliding expiry, only ever pushed forward

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque 128-bit domain identifier.
///
/// Displays as an upper-case hyphenated UUID; parses any UUID spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(Uuid);

impl DomainId {
    /// Generate a fresh random identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for DomainId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        f.write_str(self.0.hyphenated().encode_upper(&mut buf))
    }
}

impl FromStr for DomainId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Serialize for DomainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DomainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Stored state for one domain.
#[derive(Debug, Clone)]
pub struct DomainRecord {
    id: DomainId,
    owner: VerifyingKey,
    tokens: BTreeMap<String, String>,
    expires_at: DateTime<Utc>,
}

impl DomainRecord {
    pub(crate) fn new(id: DomainId, owner: VerifyingKey, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id,
            owner,
            tokens: BTreeMap::new(),
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Domain identifier.
    pub fn id(&self) -> DomainId {
        self.id
    }

    /// Owning public key.
    pub fn owner(&self) -> &VerifyingKey {
        &self.owner
    }

    /// Token mapping.
    pub fn tokens(&self) -> &BTreeMap<String, String> {
        &self.tokens
    }

    /// Look up one token.
    pub fn token(&self, token_id: &str) -> Option<&str> {
        self.tokens.get(token_id).map(String::as_str)
    }

    /// Current expiry.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the domain has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether `key` is byte-equal to the owning key.
    pub fn is_owned_by(&self, key: &VerifyingKey) -> bool {
        self.owner.as_bytes() == key.as_bytes()
    }

    pub(crate) fn insert_token(&mut self, token_id: String, value: String) {
        self.tokens.insert(token_id, value);
    }

    pub(crate) fn remove_token(&mut self, token_id: &str) -> Option<String> {
        self.tokens.remove(token_id)
    }

    /// Push the expiry forward by `ttl`. Saturates instead of overflowing.
    pub(crate) fn revalidate(&mut self, ttl: Duration) -> DateTime<Utc> {
        self.expires_at = self
            .expires_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.expires_at
    }
}
