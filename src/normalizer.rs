//! Feature normalization
//!
//! Reduces session telemetry to the ten-number `NormalizedFeatures` vector.
//! Output depends only on the input values, never on the wall clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::{NormalizedFeatures, SessionTelemetry};

/// Normalizer for session telemetry
pub struct Normalizer;

impl Normalizer {
    /// Derive normalized features from a validated session
    pub fn normalize(session: &SessionTelemetry) -> NormalizedFeatures {
        let total_keystrokes: f64 = session.keystrokes.iter().map(|k| k.count).sum();

        let (weighted_interval, total_weight) = session
            .keystrokes
            .iter()
            .fold((0.0, 0.0), |(interval, weight), k| {
                (interval + k.mean_interval_ms * k.count, weight + k.count)
            });
        let mean_keystroke_interval = if total_weight > 0.0 {
            weighted_interval / total_weight
        } else {
            0.0
        };

        let paste_count: f64 = session.paste_buckets.iter().map(|p| p.count).sum();
        let long_paste_count: f64 = session
            .paste_buckets
            .iter()
            .filter(|p| p.is_long())
            .map(|p| p.count)
            .sum();
        let paste_long_bucket_ratio = if paste_count > 0.0 {
            long_paste_count / paste_count
        } else {
            0.0
        };

        let idle_active = &session.idle_active;
        let total_seconds = idle_active.active_seconds + idle_active.idle_seconds;
        let active_ratio = if total_seconds > 0.0 {
            idle_active.active_seconds / total_seconds
        } else {
            0.0
        };

        let features = NormalizedFeatures {
            total_keystrokes,
            mean_keystroke_interval: round_half_up(mean_keystroke_interval),
            insert_count: session.edit_ops.insert,
            delete_count: session.edit_ops.delete,
            replace_count: session.edit_ops.replace,
            paste_count,
            paste_long_bucket_ratio: round3(paste_long_bucket_ratio),
            active_ratio: round3(active_ratio),
            session_duration_seconds: session_duration_seconds(
                &session.session_start,
                &session.session_end,
            ),
            file_change_count: session.file_change_count,
        };

        tracing::debug!(
            keystrokes = features.total_keystrokes,
            duration_sec = features.session_duration_seconds,
            "normalized session"
        );
        features
    }
}

/// Convenience wrapper around [`Normalizer::normalize`]
pub fn normalize(session: &SessionTelemetry) -> NormalizedFeatures {
    Normalizer::normalize(session)
}

/// Whole seconds between two ISO timestamps, clamped at zero.
///
/// Returns 0 when either timestamp cannot be parsed.
pub fn session_duration_seconds(start: &str, end: &str) -> u64 {
    let (Some(start_ms), Some(end_ms)) = (parse_timestamp_ms(start), parse_timestamp_ms(end))
    else {
        tracing::warn!(start, end, "unparseable session timestamp, duration set to 0");
        return 0;
    };

    let seconds = round_half_up((end_ms - start_ms) as f64 / 1000.0);
    if seconds > 0.0 {
        seconds as u64
    } else {
        0
    }
}

/// Parse an ISO 8601 timestamp into Unix milliseconds.
///
/// Accepts RFC 3339 with an offset, a date-time without offset (read as UTC),
/// or a bare date (midnight UTC).
pub fn parse_timestamp_ms(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Round to the nearest integer, exact halves toward positive infinity
pub(crate) fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Round to 3 decimal places with [`round_half_up`]
pub(crate) fn round3(x: f64) -> f64 {
    round_half_up(x * 1000.0) / 1000.0
}
