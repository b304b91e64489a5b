//! Certificate pipeline orchestration
//!
//! This module provides the public API for turning session telemetry into a
//! proof-of-keystrokes certificate:
//!
//! 1. Validator - gate the untyped JSON (only for the JSON entry points)
//! 2. Normalizer - reduce telemetry to the feature vector
//! 3. Fingerprint - digest the feature vector
//! 4. Scorer - effort score, breakdown and confidence
//! 5. Assemble - stamp the generation time and build the certificate

use chrono::{SecondsFormat, Utc};

use crate::config::ScoringConfig;
use crate::error::PokError;
use crate::fingerprint::{fingerprint_hash_with, Digest256, Sha256Digest};
use crate::normalizer::Normalizer;
use crate::score::Scorer;
use crate::types::{Certificate, SessionTelemetry};
use crate::validate::parse_session;

/// Build a certificate from validated telemetry with the built-in scoring.
///
/// Everything except `timestamp` is a pure function of `session`.
pub fn session_to_certificate(session: &SessionTelemetry) -> Certificate {
    CertificateProcessor::new().certify(session)
}

/// Validate session JSON and build its certificate (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let cert = session_json_to_certificate(&std::fs::read_to_string("efforia-session.json")?)?;
/// println!("{}", cert.fingerprint_hash);
/// ```
pub fn session_json_to_certificate(session_json: &str) -> Result<Certificate, PokError> {
    let session = parse_session(session_json)?;
    Ok(session_to_certificate(&session))
}

/// Reusable certificate assembler with configurable scoring and digest.
pub struct CertificateProcessor {
    scorer: Scorer,
    digest: Box<dyn Digest256>,
    author_address: Option<String>,
    include_breakdown: bool,
}

impl Default for CertificateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateProcessor {
    /// Built-in scoring, SHA-256, breakdown included, no author
    pub fn new() -> Self {
        Self {
            scorer: Scorer::default(),
            digest: Box::new(Sha256Digest),
            author_address: None,
            include_breakdown: true,
        }
    }

    /// Create a processor with custom scoring constants
    pub fn with_config(config: ScoringConfig) -> Result<Self, PokError> {
        config.validate()?;
        Ok(Self {
            scorer: Scorer::new(config),
            ..Self::new()
        })
    }

    /// Replace the digest used for fingerprints
    pub fn digest(mut self, digest: Box<dyn Digest256>) -> Self {
        self.digest = digest;
        self
    }

    /// Record an author address on every certificate
    pub fn author(mut self, address: impl Into<String>) -> Self {
        self.author_address = Some(address.into());
        self
    }

    /// Toggle the per-heuristic breakdown
    pub fn breakdown(mut self, include: bool) -> Self {
        self.include_breakdown = include;
        self
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        self.scorer.config()
    }

    /// Build a certificate from validated telemetry
    pub fn certify(&self, session: &SessionTelemetry) -> Certificate {
        let features = Normalizer::normalize(session);
        let fingerprint_hash = fingerprint_hash_with(self.digest.as_ref(), &features);
        let effort = self.scorer.score(&features);
        let confidence_level = self.scorer.confidence(&features, effort.score);

        tracing::debug!(
            fingerprint = %fingerprint_hash,
            score = effort.score,
            confidence = %confidence_level,
            duration_sec = features.session_duration_seconds,
            "certificate assembled"
        );

        Certificate {
            fingerprint_hash,
            human_effort_score: effort.score,
            confidence_level,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            author_address: self.author_address.clone(),
            session_duration_seconds: Some(features.session_duration_seconds),
            score_breakdown: self.include_breakdown.then_some(effort.breakdown),
            score_version: Some(self.scorer.config().version.clone()),
        }
    }

    /// Validate session JSON and return the certificate as pretty JSON
    pub fn certify_json(&self, session_json: &str) -> Result<String, PokError> {
        let session = parse_session(session_json)?;
        let certificate = self.certify(&session);
        serde_json::to_string_pretty(&certificate)
            .map_err(|e| PokError::EncodingError(e.to_string()))
    }
}
