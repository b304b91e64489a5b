//! Scoring constants
//!
//! Every weight, threshold and cap used by the scorer lives here. Changing a
//! value changes the meaning of every certificate issued with it, so a
//! modified config must carry a new `version`.

use serde::{Deserialize, Serialize};

use crate::error::PokError;

/// Version tag of the built-in scoring constants
pub const SCORE_VERSION: &str = "pok-score.v1";

/// Tolerance for the weight sum check
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Linear weights of the six sub-scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub keystrokes: f64,
    pub pace: f64,
    pub edit_diversity: f64,
    pub low_paste: f64,
    pub active_ratio: f64,
    pub duration: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            keystrokes: 0.25,
            pace: 0.20,
            edit_diversity: 0.20,
            low_paste: 0.15,
            active_ratio: 0.10,
            duration: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.keystrokes
            + self.pace
            + self.edit_diversity
            + self.low_paste
            + self.active_ratio
            + self.duration
    }

    fn all(&self) -> [f64; 6] {
        [
            self.keystrokes,
            self.pace,
            self.edit_diversity,
            self.low_paste,
            self.active_ratio,
            self.duration,
        ]
    }
}

/// Typing pace band, in milliseconds between keystrokes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceBand {
    /// Below this the pace scores 0 (bot-like)
    pub min_ms: f64,
    /// Above this the pace scores 0 (idle)
    pub max_ms: f64,
    /// Start of the human-like plateau
    pub ideal_low_ms: f64,
    /// End of the human-like plateau
    pub ideal_high_ms: f64,
    /// Ramp value at 0 ms; ramps linearly to 1 at `ideal_low_ms`
    pub ramp_floor: f64,
    /// Span over which the score decays by 1 above the plateau
    pub decay_span_ms: f64,
    /// Lowest value the decay reaches
    pub decay_floor: f64,
}

impl Default for PaceBand {
    fn default() -> Self {
        Self {
            min_ms: 80.0,
            max_ms: 2000.0,
            ideal_low_ms: 150.0,
            ideal_high_ms: 800.0,
            ramp_floor: 0.3,
            decay_span_ms: 2000.0,
            decay_floor: 0.2,
        }
    }
}

/// Volume and duration gates for the confidence label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Activity below this is `low`
    pub min_activity: f64,
    /// Sessions shorter than this are `low`
    pub min_duration_seconds: u64,
    pub high_activity: f64,
    pub high_duration_seconds: u64,
    pub high_min_score: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            min_activity: 20.0,
            min_duration_seconds: 60,
            high_activity: 100.0,
            high_duration_seconds: 300,
            high_min_score: 0.4,
        }
    }
}

/// Immutable scoring configuration injected into the `Scorer`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub version: String,
    pub weights: ScoreWeights,
    /// `log10(keystrokes + 1) / divisor`, capped at 1
    pub keystroke_log_divisor: f64,
    pub pace: PaceBand,
    /// Edit ops needed before diversity is measured
    pub diversity_min_ops: f64,
    /// Diversity value for sessions with a few edits
    pub sparse_edit_diversity: f64,
    /// Duration that earns the full duration sub-score
    pub duration_cap_seconds: f64,
    pub confidence: ConfidenceThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            version: SCORE_VERSION.to_string(),
            weights: ScoreWeights::default(),
            keystroke_log_divisor: 2.5,
            pace: PaceBand::default(),
            diversity_min_ops: 5.0,
            sparse_edit_diversity: 0.5,
            duration_cap_seconds: 300.0,
            confidence: ConfidenceThresholds::default(),
        }
    }
}

impl ScoringConfig {
    /// Load a config from JSON; missing fields take the built-in values
    pub fn from_json(json: &str) -> Result<Self, PokError> {
        let config: ScoringConfig = serde_json::from_str(json)
            .map_err(|e| PokError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config for persistence
    pub fn to_json(&self) -> Result<String, PokError> {
        serde_json::to_string_pretty(self).map_err(|e| PokError::EncodingError(e.to_string()))
    }

    /// Check the config keeps scores within [0, 1]
    pub fn validate(&self) -> Result<(), PokError> {
        if self.version.trim().is_empty() {
            return Err(PokError::InvalidConfig("version must not be empty".to_string()));
        }

        if self.weights.all().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PokError::InvalidConfig(
                "weights must be finite and non-negative".to_string(),
            ));
        }

        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(PokError::InvalidConfig(format!(
                "weights must sum to 1.0 (got {})",
                sum
            )));
        }

        let pace = &self.pace;
        let ordered = pace.min_ms <= pace.ideal_low_ms
            && pace.ideal_low_ms <= pace.ideal_high_ms
            && pace.ideal_high_ms <= pace.max_ms;
        if !ordered || pace.ideal_low_ms <= 0.0 || pace.decay_span_ms <= 0.0 {
            return Err(PokError::InvalidConfig(
                "pace band must satisfy 0 < min <= ideal_low <= ideal_high <= max".to_string(),
            ));
        }

        if self.keystroke_log_divisor <= 0.0 || self.duration_cap_seconds <= 0.0 {
            return Err(PokError::InvalidConfig(
                "keystroke_log_divisor and duration_cap_seconds must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
