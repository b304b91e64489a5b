//! Session telemetry gate
//!
//! Checks that an untyped JSON document has the `SessionTelemetry` shape and
//! converts it into the typed record. The checks exist to keep the numeric
//! stages from failing, not to judge plausibility: negative counts, reversed
//! timestamps and unknown bucket labels all pass.
//!
//! The keystroke array is strict at the array level and lenient per element:
//! an element that is not an object is skipped, but an object without numeric
//! `count` and `meanIntervalMs` rejects the session.

use serde_json::{Map, Value};

use crate::error::{PokError, SchemaError};
use crate::types::{
    EditOpCounts, IdleActiveSummary, KeystrokeSample, PasteBucket, SessionTelemetry,
};

/// Parse a session JSON string and run it through [`validate`]
pub fn parse_session(json: &str) -> Result<SessionTelemetry, PokError> {
    let raw: Value = serde_json::from_str(json)?;
    Ok(validate(&raw)?)
}

/// Validate an untyped record and convert it to `SessionTelemetry`.
///
/// Checks run in a fixed order and stop at the first failure. Unknown keys
/// are dropped.
pub fn validate(raw: &Value) -> Result<SessionTelemetry, SchemaError> {
    let session = raw.as_object().ok_or(SchemaError::NotAnObject)?;

    let (session_start, session_end) = match (
        session.get("sessionStart").and_then(Value::as_str),
        session.get("sessionEnd").and_then(Value::as_str),
    ) {
        (Some(start), Some(end)) => (start.to_string(), end.to_string()),
        _ => return Err(SchemaError::MissingTimestamps),
    };

    let keystrokes = validate_keystrokes(session)?;
    let edit_ops = validate_edit_ops(session)?;

    let paste_buckets = session
        .get("pasteBuckets")
        .and_then(Value::as_array)
        .ok_or(SchemaError::PasteBucketsNotArray)?
        .iter()
        .filter_map(Value::as_object)
        .map(|bucket| PasteBucket {
            bucket: bucket
                .get("bucket")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            count: number_or_zero(bucket.get("count")),
        })
        .collect();

    let idle_active = validate_idle_active(session)?;

    Ok(SessionTelemetry {
        session_start,
        session_end,
        keystrokes,
        edit_ops,
        paste_buckets,
        idle_active,
        file_change_count: number_or_zero(session.get("fileChangeCount")),
    })
}

fn validate_keystrokes(session: &Map<String, Value>) -> Result<Vec<KeystrokeSample>, SchemaError> {
    let elements = session
        .get("keystrokes")
        .and_then(Value::as_array)
        .ok_or(SchemaError::KeystrokesNotArray)?;

    let mut samples = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let Some(sample) = element.as_object() else {
            tracing::warn!(index, "skipping keystroke sample that is not an object");
            continue;
        };

        match (
            sample.get("count").and_then(Value::as_f64),
            sample.get("meanIntervalMs").and_then(Value::as_f64),
        ) {
            (Some(count), Some(mean_interval_ms)) => samples.push(KeystrokeSample {
                count,
                mean_interval_ms,
                variance_bucket: sample
                    .get("varianceBucket")
                    .and_then(Value::as_f64)
                    .map(|v| v as i64)
                    .unwrap_or(0),
            }),
            _ => return Err(SchemaError::InvalidKeystrokeSample { index }),
        }
    }

    Ok(samples)
}

fn validate_edit_ops(session: &Map<String, Value>) -> Result<EditOpCounts, SchemaError> {
    let ops = session
        .get("editOps")
        .and_then(Value::as_object)
        .ok_or(SchemaError::EditOpsNotObject)?;

    match (
        ops.get("insert").and_then(Value::as_f64),
        ops.get("delete").and_then(Value::as_f64),
        ops.get("replace").and_then(Value::as_f64),
    ) {
        (Some(insert), Some(delete), Some(replace)) => Ok(EditOpCounts {
            insert,
            delete,
            replace,
        }),
        _ => Err(SchemaError::EditOpsNotNumeric),
    }
}

fn validate_idle_active(session: &Map<String, Value>) -> Result<IdleActiveSummary, SchemaError> {
    let summary = session
        .get("idleActive")
        .and_then(Value::as_object)
        .ok_or(SchemaError::IdleActiveNotObject)?;

    match (
        summary.get("activeSeconds").and_then(Value::as_f64),
        summary.get("idleSeconds").and_then(Value::as_f64),
    ) {
        (Some(active_seconds), Some(idle_seconds)) => Ok(IdleActiveSummary {
            active_seconds,
            idle_seconds,
        }),
        _ => Err(SchemaError::IdleActiveNotNumeric),
    }
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn valid_session() -> Value {
        json!({
            "sessionStart": "2025-02-07T10:00:00.000Z",
            "sessionEnd": "2025-02-07T10:15:00.000Z",
            "keystrokes": [
                { "count": 80, "meanIntervalMs": 180, "varianceBucket": 1 },
                { "count": 120, "meanIntervalMs": 250, "varianceBucket": 1 }
            ],
            "editOps": { "insert": 150, "delete": 30, "replace": 12 },
            "pasteBuckets": [
                { "bucket": "0-50", "count": 2 },
                { "bucket": "51-200", "count": 0 },
                { "bucket": "201-500", "count": 0 },
                { "bucket": "501+", "count": 0 }
            ],
            "idleActive": { "activeSeconds": 600, "idleSeconds": 300 },
            "fileChangeCount": 3
        })
    }

    #[test]
    fn test_valid_session_converts() {
        let session = validate(&valid_session()).unwrap();
        assert_eq!(session.keystrokes.len(), 2);
        assert_eq!(session.keystrokes[1].count, 120.0);
        assert_eq!(session.edit_ops.replace, 12.0);
        assert_eq!(session.paste_buckets.len(), 4);
        assert_eq!(session.idle_active.idle_seconds, 300.0);
        assert_eq!(session.file_change_count, 3.0);
    }

    #[test]
    fn test_rejects_non_objects() {
        for raw in [json!(null), json!([1, 2]), json!("session"), json!(42)] {
            assert_eq!(validate(&raw), Err(SchemaError::NotAnObject));
        }
    }

    #[test]
    fn test_rejects_missing_timestamps() {
        let mut raw = valid_session();
        raw["sessionEnd"] = json!(1700000000);
        assert_eq!(validate(&raw), Err(SchemaError::MissingTimestamps));
    }

    #[test]
    fn test_rejects_keystrokes_not_array() {
        let mut raw = valid_session();
        raw["keystrokes"] = json!({ "count": 1 });
        assert_eq!(validate(&raw), Err(SchemaError::KeystrokesNotArray));
    }

    #[test]
    fn test_skips_non_object_keystroke_elements() {
        let mut raw = valid_session();
        raw["keystrokes"] = json!([
            null,
            7,
            "bucket",
            { "count": 10, "meanIntervalMs": 200 }
        ]);

        let session = validate(&raw).unwrap();
        assert_eq!(session.keystrokes.len(), 1);
        assert_eq!(session.keystrokes[0].count, 10.0);
        assert_eq!(session.keystrokes[0].variance_bucket, 0);
    }

    #[test]
    fn test_rejects_object_keystroke_without_numbers() {
        let mut raw = valid_session();
        raw["keystrokes"] = json!([
            { "count": 10, "meanIntervalMs": 200 },
            { "count": "10", "meanIntervalMs": 200 }
        ]);
        assert_eq!(
            validate(&raw),
            Err(SchemaError::InvalidKeystrokeSample { index: 1 })
        );
    }

    #[test]
    fn test_rejects_bad_edit_ops() {
        let mut raw = valid_session();
        raw["editOps"] = json!(null);
        assert_eq!(validate(&raw), Err(SchemaError::EditOpsNotObject));

        raw["editOps"] = json!({ "insert": 1, "delete": 2 });
        assert_eq!(validate(&raw), Err(SchemaError::EditOpsNotNumeric));
    }

    #[test]
    fn test_paste_bucket_elements_are_unchecked() {
        let mut raw = valid_session();
        raw["pasteBuckets"] = json!([42, { "bucket": 7 }, { "bucket": "501+", "count": 2 }]);

        let session = validate(&raw).unwrap();
        assert_eq!(session.paste_buckets.len(), 2);
        assert_eq!(session.paste_buckets[0].bucket, "");
        assert_eq!(session.paste_buckets[0].count, 0.0);
        assert!(session.paste_buckets[1].is_long());
    }

    #[test]
    fn test_rejects_paste_buckets_not_array() {
        let mut raw = valid_session();
        raw["pasteBuckets"] = json!("none");
        assert_eq!(validate(&raw), Err(SchemaError::PasteBucketsNotArray));
    }

    #[test]
    fn test_rejects_bad_idle_active() {
        let mut raw = valid_session();
        raw["idleActive"] = json!([]);
        assert_eq!(validate(&raw), Err(SchemaError::IdleActiveNotObject));

        raw["idleActive"] = json!({ "activeSeconds": 1, "idleSeconds": "2" });
        assert_eq!(validate(&raw), Err(SchemaError::IdleActiveNotNumeric));
    }

    #[test]
    fn test_checks_run_in_order() {
        // Both editOps and idleActive are broken; editOps is reported first.
        let mut raw = valid_session();
        raw["editOps"] = json!(1);
        raw["idleActive"] = json!(1);
        assert_eq!(validate(&raw), Err(SchemaError::EditOpsNotObject));
    }

    #[test]
    fn test_no_range_checks() {
        let mut raw = valid_session();
        raw["editOps"] = json!({ "insert": -5, "delete": 0.5, "replace": 0 });
        raw["sessionEnd"] = json!("2025-02-07T09:00:00.000Z");

        let session = validate(&raw).unwrap();
        assert_eq!(session.edit_ops.insert, -5.0);
    }

    #[test]
    fn test_unknown_keys_and_file_count_defaults() {
        let mut raw = valid_session();
        raw["documentText"] = json!("secret");
        raw.as_object_mut().unwrap().remove("fileChangeCount");

        let session = validate(&raw).unwrap();
        assert_eq!(session.file_change_count, 0.0);
        let round_trip = serde_json::to_value(&session).unwrap();
        assert!(round_trip.get("documentText").is_none());
    }

    #[test]
    fn test_parse_session_reports_syntax_errors() {
        let err = parse_session("not json").unwrap_err();
        assert!(matches!(err, PokError::JsonError(_)));

        let err = parse_session("[]").unwrap_err();
        assert!(matches!(err, PokError::Schema(SchemaError::NotAnObject)));
    }
}
