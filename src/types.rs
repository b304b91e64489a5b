//! Core data types for efforia-pok
//!
//! These types flow through the certificate pipeline:
//! SessionTelemetry → NormalizedFeatures → (fingerprint, score) → Certificate

use serde::{Deserialize, Serialize};

/// Paste bucket labels whose pastes count as "long" (more than 200 characters)
pub const LONG_PASTE_BUCKETS: [&str; 2] = ["201-500", "501+"];

/// Aggregated keystroke timing for one bucket (never individual key events)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystrokeSample {
    /// Keystrokes observed in this bucket
    pub count: f64,
    /// Mean inter-key interval in milliseconds
    pub mean_interval_ms: f64,
    /// Variance bucket index (low/med/high)
    #[serde(default)]
    pub variance_bucket: i64,
}

/// Edit operation counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditOpCounts {
    pub insert: f64,
    pub delete: f64,
    pub replace: f64,
}

impl EditOpCounts {
    /// Sum of all edit operations
    pub fn total(&self) -> f64 {
        self.insert + self.delete + self.replace
    }
}

/// Paste events grouped by pasted length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasteBucket {
    /// Length bucket label: "0-50", "51-200", "201-500" or "501+"
    pub bucket: String,
    pub count: f64,
}

impl PasteBucket {
    /// Whether this bucket holds pastes longer than 200 characters
    pub fn is_long(&self) -> bool {
        LONG_PASTE_BUCKETS.contains(&self.bucket.as_str())
    }
}

/// Time split between active editing and idling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleActiveSummary {
    pub active_seconds: f64,
    pub idle_seconds: f64,
}

/// Content-free telemetry for one editing session, as exported by the capture
/// component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTelemetry {
    /// Session start (ISO 8601)
    pub session_start: String,
    /// Session end (ISO 8601)
    pub session_end: String,
    pub keystrokes: Vec<KeystrokeSample>,
    pub edit_ops: EditOpCounts,
    pub paste_buckets: Vec<PasteBucket>,
    pub idle_active: IdleActiveSummary,
    /// Number of distinct files touched (no names)
    #[serde(default)]
    pub file_change_count: f64,
}

/// The ten-field feature vector hashed and scored by the pipeline.
///
/// This is the privacy boundary: nothing outside these numbers reaches the
/// fingerprint or the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFeatures {
    pub total_keystrokes: f64,
    /// Count-weighted mean interval, whole milliseconds
    pub mean_keystroke_interval: f64,
    pub insert_count: f64,
    pub delete_count: f64,
    pub replace_count: f64,
    pub paste_count: f64,
    /// Share of pastes in long buckets, 3 decimals
    pub paste_long_bucket_ratio: f64,
    /// active / (active + idle), 3 decimals
    pub active_ratio: f64,
    pub session_duration_seconds: u64,
    pub file_change_count: f64,
}

impl NormalizedFeatures {
    /// Insert + delete + replace
    pub fn total_edit_ops(&self) -> f64 {
        self.insert_count + self.delete_count + self.replace_count
    }

    /// Keystrokes plus edit operations, the volume used for confidence
    pub fn total_activity(&self) -> f64 {
        self.total_keystrokes + self.total_edit_ops()
    }
}

/// Coarse reliability label attached to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-heuristic sub-scores, each in [0, 1].
///
/// Display-only; never part of the fingerprint payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub keystrokes: f64,
    pub pace: f64,
    pub edit_diversity: f64,
    pub low_paste: f64,
    pub active_ratio: f64,
    pub duration: f64,
}

impl ScoreBreakdown {
    /// Sub-scores paired with their wire names
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("keystrokes", self.keystrokes),
            ("pace", self.pace),
            ("editDiversity", self.edit_diversity),
            ("lowPaste", self.low_paste),
            ("activeRatio", self.active_ratio),
            ("duration", self.duration),
        ]
    }
}

/// Proof-of-keystrokes certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    /// SHA-256 hex of the normalized features
    pub fingerprint_hash: String,
    /// Effort score in [0, 1], 3 decimals
    pub human_effort_score: f64,
    pub confidence_level: ConfidenceLevel,
    /// Generation time (RFC 3339). Not reproducible; ignore when comparing.
    pub timestamp: String,
    /// Author address, set when preparing for anchoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
    /// Version of the scoring constants that produced the score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_serialization() {
        let json = serde_json::to_string(&ConfidenceLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");

        let parsed: ConfidenceLevel = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, ConfidenceLevel::High);
    }

    #[test]
    fn test_session_uses_camel_case_keys() {
        let json = r#"{
            "sessionStart": "2025-02-07T10:00:00.000Z",
            "sessionEnd": "2025-02-07T10:15:00.000Z",
            "keystrokes": [{ "count": 80, "meanIntervalMs": 180, "varianceBucket": 1 }],
            "editOps": { "insert": 1, "delete": 2, "replace": 3 },
            "pasteBuckets": [{ "bucket": "501+", "count": 1 }],
            "idleActive": { "activeSeconds": 10, "idleSeconds": 5 }
        }"#;

        let session: SessionTelemetry = serde_json::from_str(json).unwrap();
        assert_eq!(session.keystrokes[0].mean_interval_ms, 180.0);
        assert_eq!(session.edit_ops.total(), 6.0);
        assert!(session.paste_buckets[0].is_long());
        assert_eq!(session.file_change_count, 0.0);
    }

    #[test]
    fn test_certificate_omits_absent_optionals() {
        let cert = Certificate {
            fingerprint_hash: "ab".repeat(32),
            human_effort_score: 0.5,
            confidence_level: ConfidenceLevel::Low,
            timestamp: "2025-02-07T10:15:00.000Z".to_string(),
            author_address: None,
            session_duration_seconds: Some(900),
            score_breakdown: None,
            score_version: None,
        };

        let value = serde_json::to_value(&cert).unwrap();
        assert_eq!(value["confidence_level"], "low");
        assert_eq!(value["session_duration_seconds"], 900);
        assert!(value.get("author_address").is_none());
        assert!(value.get("score_breakdown").is_none());
    }

    #[test]
    fn test_breakdown_wire_names() {
        let breakdown = ScoreBreakdown {
            edit_diversity: 0.5,
            ..Default::default()
        };
        let value = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(value["editDiversity"], 0.5);
        assert_eq!(breakdown.entries()[2], ("editDiversity", 0.5));
    }
}
