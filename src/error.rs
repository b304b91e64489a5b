//! Error types for efforia-pok
//!
//! Only the validator can reject a session. Normalization, fingerprinting and
//! scoring are total over validated input and have no error type of their own.

use thiserror::Error;

/// Reasons a raw telemetry document fails the session gate.
///
/// The `Display` text is the user-facing message and is passed through
/// unmodified by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Session must be a JSON object")]
    NotAnObject,

    #[error("Session must have sessionStart and sessionEnd (ISO strings)")]
    MissingTimestamps,

    #[error("Session must have keystrokes (array)")]
    KeystrokesNotArray,

    #[error("keystrokes[{index}] must have count and meanIntervalMs (numbers)")]
    InvalidKeystrokeSample { index: usize },

    #[error("Session must have editOps (object with insert, delete, replace)")]
    EditOpsNotObject,

    #[error("editOps must have insert, delete, replace (numbers)")]
    EditOpsNotNumeric,

    #[error("Session must have pasteBuckets (array)")]
    PasteBucketsNotArray,

    #[error("Session must have idleActive (object with activeSeconds, idleSeconds)")]
    IdleActiveNotObject,

    #[error("idleActive must have activeSeconds and idleSeconds (numbers)")]
    IdleActiveNotNumeric,
}

/// Shape problems in a certificate presented for verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    #[error("Certificate fingerprint_hash must be a 64-character hex string")]
    HashLength,

    #[error("Certificate fingerprint_hash must be hexadecimal")]
    HashNotHex,

    #[error("Certificate human_effort_score must be a number between 0 and 1")]
    ScoreOutOfRange,

    #[error("Certificate timestamp must be a non-empty string")]
    EmptyTimestamp,
}

/// Failures at the anchoring boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("Fingerprint is not valid hex: {0}")]
    InvalidHash(String),

    #[error("PoK: score must be 0-1000 (got {0})")]
    ScoreOutOfRange(String),

    #[error("PoK: already anchored")]
    AlreadyAnchored,
}

/// Errors surfaced by the crate's fallible entry points
#[derive(Debug, Error)]
pub enum PokError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Invalid certificate: {0}")]
    Certificate(#[from] CertificateError),

    #[error("Anchor rejected: {0}")]
    Anchor(#[from] AnchorError),

    #[error("Invalid scoring config: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_passes_through_message() {
        let err: PokError = SchemaError::EditOpsNotNumeric.into();
        assert_eq!(
            err.to_string(),
            "editOps must have insert, delete, replace (numbers)"
        );
    }

    #[test]
    fn test_keystroke_error_names_index() {
        let err = SchemaError::InvalidKeystrokeSample { index: 3 };
        assert!(err.to_string().starts_with("keystrokes[3]"));
    }
}
