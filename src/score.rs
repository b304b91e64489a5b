//! Human-effort scoring
//!
//! Six explainable heuristics, each mapped to [0, 1] and combined linearly:
//!
//! ```text
//! score = 0.25 * keystrokes
//!       + 0.20 * pace
//!       + 0.20 * edit_diversity
//!       + 0.15 * low_paste
//!       + 0.10 * active_ratio
//!       + 0.10 * duration
//! ```
//!
//! Weights and thresholds come from [`ScoringConfig`].

use crate::config::ScoringConfig;
use crate::normalizer::round3;
use crate::types::{ConfidenceLevel, NormalizedFeatures, ScoreBreakdown};

/// Score with the sub-scores that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EffortScore {
    /// Weighted sum, 3 decimals, in [0, 1]
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Scorer bound to one scoring configuration
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute the effort score and its breakdown
    pub fn score(&self, features: &NormalizedFeatures) -> EffortScore {
        let breakdown = ScoreBreakdown {
            keystrokes: unit(self.keystroke_score(features.total_keystrokes)),
            pace: unit(self.pace_score(features.mean_keystroke_interval)),
            edit_diversity: unit(self.edit_diversity_score(features)),
            low_paste: unit(self.low_paste_score(features)),
            active_ratio: unit(features.active_ratio),
            duration: unit(self.duration_score(features.session_duration_seconds)),
        };

        let w = &self.config.weights;
        let weighted = w.keystrokes * breakdown.keystrokes
            + w.pace * breakdown.pace
            + w.edit_diversity * breakdown.edit_diversity
            + w.low_paste * breakdown.low_paste
            + w.active_ratio * breakdown.active_ratio
            + w.duration * breakdown.duration;

        EffortScore {
            score: round3(weighted).clamp(0.0, 1.0),
            breakdown,
        }
    }

    /// Classify how much the score can be trusted.
    ///
    /// Uses the raw features, not the clamped sub-scores.
    pub fn confidence(&self, features: &NormalizedFeatures, score: f64) -> ConfidenceLevel {
        let thresholds = &self.config.confidence;
        let activity = features.total_activity();
        let duration = features.session_duration_seconds;

        if activity < thresholds.min_activity || duration < thresholds.min_duration_seconds {
            return ConfidenceLevel::Low;
        }
        if activity >= thresholds.high_activity
            && duration >= thresholds.high_duration_seconds
            && score >= thresholds.high_min_score
        {
            return ConfidenceLevel::High;
        }
        ConfidenceLevel::Medium
    }

    /// More keystrokes, more effort; log scale so ~300 keystrokes saturates
    fn keystroke_score(&self, total_keystrokes: f64) -> f64 {
        ((total_keystrokes + 1.0).log10() / self.config.keystroke_log_divisor).min(1.0)
    }

    /// Human typing sits on a plateau; faster looks scripted, slower looks idle
    fn pace_score(&self, interval_ms: f64) -> f64 {
        let band = &self.config.pace;
        if interval_ms < band.min_ms || interval_ms > band.max_ms {
            return 0.0;
        }
        if interval_ms < band.ideal_low_ms {
            return band.ramp_floor + (interval_ms / band.ideal_low_ms) * (1.0 - band.ramp_floor);
        }
        if interval_ms > band.ideal_high_ms {
            return (1.0 - (interval_ms - band.ideal_high_ms) / band.decay_span_ms)
                .max(band.decay_floor);
        }
        1.0
    }

    /// Fraction of {insert, delete, replace} in use once there are enough edits
    fn edit_diversity_score(&self, features: &NormalizedFeatures) -> f64 {
        let total_ops = features.total_edit_ops();
        if total_ops >= self.config.diversity_min_ops {
            let kinds_used = [
                features.insert_count,
                features.delete_count,
                features.replace_count,
            ]
            .iter()
            .filter(|count| **count > 0.0)
            .count();
            kinds_used as f64 / 3.0
        } else if total_ops > 0.0 {
            self.config.sparse_edit_diversity
        } else {
            0.0
        }
    }

    /// Credit for not pasting long blocks; the all-zero vector earns none
    fn low_paste_score(&self, features: &NormalizedFeatures) -> f64 {
        if *features == NormalizedFeatures::default() {
            return 0.0;
        }
        (1.0 - features.paste_long_bucket_ratio).max(0.0)
    }

    fn duration_score(&self, duration_seconds: u64) -> f64 {
        (duration_seconds as f64 / self.config.duration_cap_seconds).min(1.0)
    }
}

/// Score features with the built-in constants
pub fn human_effort_score(features: &NormalizedFeatures) -> EffortScore {
    Scorer::default().score(features)
}

/// Confidence label with the built-in thresholds
pub fn confidence_level(features: &NormalizedFeatures, score: f64) -> ConfidenceLevel {
    Scorer::default().confidence(features, score)
}

/// Map to [0, 1]; NaN becomes 0
fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoreWeights;
    use pretty_assertions::assert_eq;

    fn sample_features() -> NormalizedFeatures {
        NormalizedFeatures {
            total_keystrokes: 200.0,
            mean_keystroke_interval: 222.0,
            insert_count: 150.0,
            delete_count: 30.0,
            replace_count: 12.0,
            paste_count: 2.0,
            paste_long_bucket_ratio: 0.0,
            active_ratio: 0.667,
            session_duration_seconds: 900,
            file_change_count: 3.0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sample_session_score() {
        let result = human_effort_score(&sample_features());
        assert_eq!(result.score, 0.947);
        assert!(approx(result.breakdown.keystrokes, 201f64.log10() / 2.5));
        assert_eq!(result.breakdown.pace, 1.0);
        assert_eq!(result.breakdown.edit_diversity, 1.0);
        assert_eq!(result.breakdown.low_paste, 1.0);
        assert_eq!(result.breakdown.active_ratio, 0.667);
        assert_eq!(result.breakdown.duration, 1.0);
        assert_eq!(
            confidence_level(&sample_features(), result.score),
            ConfidenceLevel::High
        );
    }

    #[test]
    fn test_fast_paste_heavy_session() {
        let features = NormalizedFeatures {
            total_keystrokes: 40.0,
            mean_keystroke_interval: 90.0,
            insert_count: 3.0,
            paste_count: 6.0,
            paste_long_bucket_ratio: 0.833,
            active_ratio: 0.833,
            session_duration_seconds: 120,
            ..Default::default()
        };

        let result = human_effort_score(&features);
        assert_eq!(result.score, 0.554);
        assert!(approx(result.breakdown.pace, 0.72));
        assert_eq!(result.breakdown.edit_diversity, 0.5);
        assert!(approx(result.breakdown.low_paste, 0.167));
        assert!(approx(result.breakdown.duration, 0.4));
        assert_eq!(confidence_level(&features, result.score), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_slow_long_session() {
        let features = NormalizedFeatures {
            total_keystrokes: 500.0,
            mean_keystroke_interval: 1200.0,
            insert_count: 40.0,
            delete_count: 10.0,
            active_ratio: 0.333,
            session_duration_seconds: 2401,
            ..Default::default()
        };

        let result = human_effort_score(&features);
        assert_eq!(result.score, 0.827);
        assert!(approx(result.breakdown.pace, 0.8));
        assert!(approx(result.breakdown.edit_diversity, 2.0 / 3.0));
        assert_eq!(confidence_level(&features, result.score), ConfidenceLevel::High);
    }

    #[test]
    fn test_zero_features_score_zero_and_low() {
        let features = NormalizedFeatures::default();
        let result = human_effort_score(&features);

        assert_eq!(result.score, 0.0);
        assert_eq!(result.breakdown, ScoreBreakdown::default());
        assert_eq!(confidence_level(&features, result.score), ConfidenceLevel::Low);
    }

    #[test]
    fn test_low_paste_credit_withheld_only_for_all_zero_vector() {
        let scorer = Scorer::default();
        assert_eq!(scorer.low_paste_score(&NormalizedFeatures::default()), 0.0);

        let idle_only = NormalizedFeatures {
            active_ratio: 0.5,
            session_duration_seconds: 600,
            ..Default::default()
        };
        assert_eq!(scorer.low_paste_score(&idle_only), 1.0);

        let one_keystroke = NormalizedFeatures {
            total_keystrokes: 1.0,
            ..Default::default()
        };
        assert_eq!(scorer.low_paste_score(&one_keystroke), 1.0);
    }

    #[test]
    fn test_sessions_without_input_keep_formula_score() {
        // 0.15 low paste + 0.10 * 0.5 active + 0.10 duration
        let idle_only = NormalizedFeatures {
            active_ratio: 0.5,
            session_duration_seconds: 600,
            ..Default::default()
        };
        assert_eq!(human_effort_score(&idle_only).score, 0.3);

        // Negative counters are not the all-zero vector
        let negative_insert = NormalizedFeatures {
            insert_count: -5.0,
            ..Default::default()
        };
        let result = human_effort_score(&negative_insert);
        assert_eq!(result.breakdown.low_paste, 1.0);
        assert_eq!(result.score, 0.15);
    }

    #[test]
    fn test_pace_curve() {
        let scorer = Scorer::default();
        assert_eq!(scorer.pace_score(79.0), 0.0);
        assert!(approx(scorer.pace_score(80.0), 0.3 + (80.0 / 150.0) * 0.7));
        assert_eq!(scorer.pace_score(150.0), 1.0);
        assert_eq!(scorer.pace_score(800.0), 1.0);
        assert!(approx(scorer.pace_score(1000.0), 0.9));
        assert!(approx(scorer.pace_score(2000.0), 0.4));
        assert_eq!(scorer.pace_score(2001.0), 0.0);
    }

    #[test]
    fn test_pace_decay_floor() {
        let mut config = ScoringConfig::default();
        config.pace.decay_span_ms = 500.0;
        let scorer = Scorer::new(config);
        assert!(approx(scorer.pace_score(1900.0), 0.2));
    }

    #[test]
    fn test_edit_diversity_steps() {
        let scorer = Scorer::default();
        let with_ops = |insert: f64, delete: f64, replace: f64| NormalizedFeatures {
            insert_count: insert,
            delete_count: delete,
            replace_count: replace,
            ..Default::default()
        };

        assert_eq!(scorer.edit_diversity_score(&with_ops(0.0, 0.0, 0.0)), 0.0);
        assert_eq!(scorer.edit_diversity_score(&with_ops(4.0, 0.0, 0.0)), 0.5);
        assert!(approx(scorer.edit_diversity_score(&with_ops(5.0, 0.0, 0.0)), 1.0 / 3.0));
        assert!(approx(scorer.edit_diversity_score(&with_ops(5.0, 1.0, 0.0)), 2.0 / 3.0));
        assert_eq!(scorer.edit_diversity_score(&with_ops(5.0, 1.0, 1.0)), 1.0);
    }

    #[test]
    fn test_confidence_activity_boundary() {
        let scorer = Scorer::default();
        let with_activity = |keystrokes: f64| NormalizedFeatures {
            total_keystrokes: keystrokes,
            session_duration_seconds: 60,
            ..Default::default()
        };

        assert_eq!(scorer.confidence(&with_activity(19.0), 0.9), ConfidenceLevel::Low);
        assert_eq!(scorer.confidence(&with_activity(20.0), 0.9), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_confidence_counts_edit_ops() {
        let features = NormalizedFeatures {
            total_keystrokes: 10.0,
            insert_count: 5.0,
            delete_count: 3.0,
            replace_count: 2.0,
            session_duration_seconds: 120,
            ..Default::default()
        };
        assert_eq!(confidence_level(&features, 0.5), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_confidence_duration_and_score_gates() {
        let scorer = Scorer::default();
        let mut features = NormalizedFeatures {
            total_keystrokes: 500.0,
            session_duration_seconds: 59,
            ..Default::default()
        };
        assert_eq!(scorer.confidence(&features, 0.9), ConfidenceLevel::Low);

        features.session_duration_seconds = 299;
        assert_eq!(scorer.confidence(&features, 0.9), ConfidenceLevel::Medium);

        features.session_duration_seconds = 300;
        assert_eq!(scorer.confidence(&features, 0.9), ConfidenceLevel::High);
        assert_eq!(scorer.confidence(&features, 0.399), ConfidenceLevel::Medium);
        assert_eq!(scorer.confidence(&features, 0.4), ConfidenceLevel::High);
    }

    #[test]
    fn test_negative_inputs_stay_bounded() {
        let features = NormalizedFeatures {
            total_keystrokes: -50.0,
            mean_keystroke_interval: -10.0,
            insert_count: -5.0,
            paste_long_bucket_ratio: 1.5,
            active_ratio: -0.2,
            ..Default::default()
        };

        let result = human_effort_score(&features);
        assert!((0.0..=1.0).contains(&result.score));
        for (name, value) in result.breakdown.entries() {
            assert!((0.0..=1.0).contains(&value), "{} = {}", name, value);
        }
    }

    #[test]
    fn test_custom_weights() {
        let config = ScoringConfig {
            weights: ScoreWeights {
                keystrokes: 0.0,
                pace: 0.0,
                edit_diversity: 0.0,
                low_paste: 0.0,
                active_ratio: 0.0,
                duration: 1.0,
            },
            ..Default::default()
        };
        let scorer = Scorer::new(config);
        let features = NormalizedFeatures {
            session_duration_seconds: 150,
            ..Default::default()
        };
        assert_eq!(scorer.score(&features).score, 0.5);
    }
}
