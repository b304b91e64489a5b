//! Anchoring interface
//!
//! A ledger stores `(fingerprint key, scaled score, timestamp, author)` once
//! per fingerprint. This module prepares certificates for that boundary and
//! provides an in-memory ledger with the same acceptance rules:
//!
//! - the key is the fingerprint as 32 bytes (hex left-padded with zeros, then
//!   the last 64 digits kept)
//! - the score is `human_effort_score * 1000` as an integer in [0, 1000]
//! - a key can only be anchored once

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnchorError, PokError};
use crate::types::Certificate;

/// Highest score the ledger accepts (a certificate score of 1.0)
pub const MAX_ANCHOR_SCORE: u16 = 1000;

/// Fixed-width ledger key
pub type AnchorKey = [u8; 32];

/// Convert a hex fingerprint (optionally `0x`-prefixed) to a 32-byte key
pub fn hash_to_key(hash: &str) -> Result<AnchorKey, AnchorError> {
    let digits = hash
        .strip_prefix("0x")
        .or_else(|| hash.strip_prefix("0X"))
        .unwrap_or(hash);
    if !digits.is_ascii() {
        return Err(AnchorError::InvalidHash(hash.to_string()));
    }

    let padded = format!("{:0>64}", digits);
    let last_64 = &padded[padded.len() - 64..];

    let mut key = [0u8; 32];
    hex::decode_to_slice(last_64, &mut key)
        .map_err(|e| AnchorError::InvalidHash(format!("{}: {}", hash, e)))?;
    Ok(key)
}

/// Scale a [0, 1] score to the ledger's integer range
pub fn scale_score(score: f64) -> Result<u16, AnchorError> {
    let scaled = (score * 1000.0).round();
    if !(0.0..=MAX_ANCHOR_SCORE as f64).contains(&scaled) {
        return Err(AnchorError::ScoreOutOfRange(score.to_string()));
    }
    Ok(scaled as u16)
}

/// What gets submitted to a ledger for one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRequest {
    pub key: AnchorKey,
    pub score: u16,
}

impl AnchorRequest {
    pub fn from_certificate(certificate: &Certificate) -> Result<Self, AnchorError> {
        Ok(Self {
            key: hash_to_key(&certificate.fingerprint_hash)?,
            score: scale_score(certificate.human_effort_score)?,
        })
    }

    /// Key as `0x`-prefixed hex, the form ledgers display
    pub fn key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key))
    }
}

/// A stored anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub score: u16,
    /// Unix seconds when the anchor was recorded
    pub timestamp: i64,
    pub author: String,
}

/// Ledger that records each fingerprint at most once
pub trait AnchorLedger {
    /// Record an anchor; rejects duplicate keys and out-of-range scores
    fn anchor(
        &mut self,
        request: &AnchorRequest,
        author: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AnchorError>;

    /// Read-only lookup by key
    fn lookup(&self, key: &AnchorKey) -> Option<AnchorEntry>;
}

/// Ledger kept in memory, serializable to JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    /// Entries keyed by lowercase hex of the anchor key
    entries: BTreeMap<String, AnchorEntry>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the ledger for persistence
    pub fn to_json(&self) -> Result<String, PokError> {
        serde_json::to_string_pretty(self).map_err(|e| PokError::EncodingError(e.to_string()))
    }

    /// Load a ledger saved with [`InMemoryLedger::to_json`]
    pub fn from_json(json: &str) -> Result<Self, PokError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AnchorLedger for InMemoryLedger {
    fn anchor(
        &mut self,
        request: &AnchorRequest,
        author: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AnchorError> {
        if request.score > MAX_ANCHOR_SCORE {
            return Err(AnchorError::ScoreOutOfRange(request.score.to_string()));
        }

        let key = hex::encode(request.key);
        if self.entries.contains_key(&key) {
            return Err(AnchorError::AlreadyAnchored);
        }

        tracing::debug!(key = %key, score = request.score, author, "anchored fingerprint");
        self.entries.insert(
            key,
            AnchorEntry {
                score: request.score,
                timestamp: at.timestamp(),
                author: author.to_string(),
            },
        );
        Ok(())
    }

    fn lookup(&self, key: &AnchorKey) -> Option<AnchorEntry> {
        self.entries.get(&hex::encode(key)).cloned()
    }
}
