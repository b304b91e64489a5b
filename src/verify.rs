//! Certificate verification
//!
//! A verifier needs nothing but the certificate: its shape can be checked on
//! its own, and when the session is available the fingerprint is recomputed
//! and compared. A ledger, if given, is consulted for the anchored record.

use serde::Serialize;

use crate::anchor::{hash_to_key, scale_score, AnchorLedger};
use crate::error::CertificateError;
use crate::fingerprint::fingerprint_hash;
use crate::normalizer::Normalizer;
use crate::types::{Certificate, SessionTelemetry};

const FINGERPRINT_HEX_LEN: usize = 64;

/// Check the certificate fields a ledger submission depends on
pub fn validate_certificate(certificate: &Certificate) -> Result<(), CertificateError> {
    let hash = &certificate.fingerprint_hash;
    if hash.len() != FINGERPRINT_HEX_LEN {
        return Err(CertificateError::HashLength);
    }
    if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CertificateError::HashNotHex);
    }

    let score = certificate.human_effort_score;
    if !(0.0..=1.0).contains(&score) {
        return Err(CertificateError::ScoreOutOfRange);
    }

    if certificate.timestamp.is_empty() {
        return Err(CertificateError::EmptyTimestamp);
    }
    Ok(())
}

/// Fingerprint a session the same way the certificate pipeline does
pub fn recompute_hash_from_session(session: &SessionTelemetry) -> String {
    fingerprint_hash(&Normalizer::normalize(session))
}

/// True when the certificate's fingerprint belongs to `session`
pub fn certificate_matches_session(certificate: &Certificate, session: &SessionTelemetry) -> bool {
    recompute_hash_from_session(session).eq_ignore_ascii_case(&certificate.fingerprint_hash)
}

/// Ledger record found for a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u16>,
    /// Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl AnchorLookup {
    fn missing() -> Self {
        Self {
            found: false,
            score: None,
            timestamp: None,
            author: None,
        }
    }
}

/// Outcome of [`verify`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
    pub certificate: Certificate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchored: Option<AnchorLookup>,
}

impl VerificationResult {
    fn new(certificate: &Certificate, valid: bool, message: impl Into<String>) -> Self {
        Self {
            valid,
            message: message.into(),
            certificate: certificate.clone(),
            anchored: None,
        }
    }
}

/// Verify a certificate against an optional session and ledger.
///
/// Checks run in order and stop at the first failure: certificate shape,
/// fingerprint re-derivation, then the ledger record. An anchored score that
/// disagrees with the certificate makes the result invalid; a certificate that
/// was never anchored does not.
pub fn verify(
    certificate: &Certificate,
    session: Option<&SessionTelemetry>,
    ledger: Option<&dyn AnchorLedger>,
) -> VerificationResult {
    if let Err(e) = validate_certificate(certificate) {
        return VerificationResult::new(certificate, false, e.to_string());
    }

    let mut message = "Certificate is well-formed".to_string();

    if let Some(session) = session {
        let computed = recompute_hash_from_session(session);
        if !computed.eq_ignore_ascii_case(&certificate.fingerprint_hash) {
            tracing::debug!(
                expected = %certificate.fingerprint_hash,
                computed = %computed,
                "fingerprint mismatch"
            );
            return VerificationResult::new(
                certificate,
                false,
                "Fingerprint does not match session",
            );
        }
        message = "Certificate matches session".to_string();
    }

    let Some(ledger) = ledger else {
        return VerificationResult::new(certificate, true, message);
    };

    // validate_certificate guarantees both conversions succeed
    let (key, expected_score) = match (
        hash_to_key(&certificate.fingerprint_hash),
        scale_score(certificate.human_effort_score),
    ) {
        (Ok(key), Ok(score)) => (key, score),
        (Err(e), _) | (_, Err(e)) => {
            return VerificationResult::new(certificate, false, e.to_string());
        }
    };

    let Some(entry) = ledger.lookup(&key) else {
        let mut result =
            VerificationResult::new(certificate, true, format!("{}; not anchored", message));
        result.anchored = Some(AnchorLookup::missing());
        return result;
    };

    let mut result = if entry.score == expected_score {
        VerificationResult::new(
            certificate,
            true,
            format!("{}; anchored by {}", message, entry.author),
        )
    } else {
        VerificationResult::new(
            certificate,
            false,
            format!(
                "Anchored score {} does not match certificate score {}",
                entry.score, expected_score
            ),
        )
    };
    result.anchored = Some(AnchorLookup {
        found: true,
        score: Some(entry.score),
        timestamp: Some(entry.timestamp),
        author: Some(entry.author),
    });
    result
}
