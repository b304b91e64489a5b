//! Session fingerprinting
//!
//! The fingerprint is a 256-bit digest over the ten normalized features,
//! rendered as decimal text in a fixed order and joined by `:`:
//!
//! ```text
//! totalKeystrokes:meanKeystrokeInterval:insertCount:deleteCount:replaceCount:
//! pasteCount:pasteLongBucketRatio:activeRatio:sessionDurationSeconds:fileChangeCount
//! ```
//!
//! The capture, certificate and verifier implementations each recompute this
//! string independently, so the order and the number formatting are part of
//! the hash definition. Integral values print without a fraction (`200`),
//! ratios print their rounded decimal form (`0.667`).

use sha2::{Digest, Sha256};

use crate::types::NormalizedFeatures;

/// Separator between payload fields; never produced by [`format_decimal`]
pub const FIELD_DELIMITER: char = ':';

/// A 256-bit cryptographic digest
pub trait Digest256: Send + Sync {
    fn digest(&self, payload: &[u8]) -> [u8; 32];
}

/// SHA-256, the digest every fingerprint consumer agrees on
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl Digest256 for Sha256Digest {
    fn digest(&self, payload: &[u8]) -> [u8; 32] {
        Sha256::digest(payload).into()
    }
}

/// Build the delimited pre-image for the fingerprint
pub fn fingerprint_payload(features: &NormalizedFeatures) -> String {
    let fields = [
        format_decimal(features.total_keystrokes),
        format_decimal(features.mean_keystroke_interval),
        format_decimal(features.insert_count),
        format_decimal(features.delete_count),
        format_decimal(features.replace_count),
        format_decimal(features.paste_count),
        format_decimal(features.paste_long_bucket_ratio),
        format_decimal(features.active_ratio),
        features.session_duration_seconds.to_string(),
        format_decimal(features.file_change_count),
    ];

    let mut payload = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            payload.push(FIELD_DELIMITER);
        }
        payload.push_str(field);
    }
    payload
}

/// SHA-256 fingerprint of the features as 64 lowercase hex characters
pub fn fingerprint_hash(features: &NormalizedFeatures) -> String {
    fingerprint_hash_with(&Sha256Digest, features)
}

/// Fingerprint with a caller-supplied digest
pub fn fingerprint_hash_with(digest: &dyn Digest256, features: &NormalizedFeatures) -> String {
    let payload = fingerprint_payload(features);
    tracing::debug!(%payload, "computing fingerprint");
    hex::encode(digest.digest(payload.as_bytes()))
}

/// Render a number the way the fingerprint payload expects.
///
/// Shortest round-trip digits, no trailing `.0`, `-0` as `0`, exponent form
/// outside [1e-6, 1e21) and `NaN`/`Infinity` for non-finite values.
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", value);
    }

    // `{:e}` yields "1e21" / "1.5e-7"; positive exponents carry an explicit sign.
    let rendered = format!("{:e}", value);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => rendered,
    }
}
