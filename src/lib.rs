//! Efforia PoK - proof-of-keystrokes certificates for human authorship
//!
//! Turns content-free editing telemetry into a compact certificate through a
//! deterministic pipeline: validation → normalization → fingerprinting →
//! scoring → certificate assembly. No source text, file names or raw key
//! events ever enter the pipeline.
//!
//! ## Modules
//!
//! - **Certificate pipeline**: validate a session and issue a certificate
//! - **Verification**: recompute a fingerprint and check a certificate
//! - **Anchoring**: prepare certificates for a write-once ledger

pub mod anchor;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod normalizer;
pub mod pipeline;
pub mod score;
pub mod types;
pub mod validate;
pub mod verify;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use anchor::{AnchorLedger, AnchorRequest, InMemoryLedger};
pub use config::{ScoringConfig, SCORE_VERSION};
pub use error::{AnchorError, CertificateError, PokError, SchemaError};
pub use fingerprint::{fingerprint_hash, fingerprint_payload};
pub use normalizer::{normalize, Normalizer};
pub use pipeline::{session_json_to_certificate, session_to_certificate, CertificateProcessor};
pub use score::{confidence_level, human_effort_score, Scorer};
pub use types::{Certificate, ConfidenceLevel, NormalizedFeatures, SessionTelemetry};
pub use validate::{parse_session, validate};
pub use verify::{certificate_matches_session, verify, VerificationResult};

/// Library version, reported by the CLI and the C ABI
pub const POK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default file the capture component exports sessions to
pub const DEFAULT_SESSION_FILE: &str = "efforia-session.json";

/// Default file certificates are written to
pub const DEFAULT_CERTIFICATE_FILE: &str = "efforia-certificate.json";
