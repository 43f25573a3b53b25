//! Auto-reorganization configuration.
//!
//! Out-of-range values are clamped by [`AutoReorgConfig::validated`], never
//! rejected, so a watcher can always be built from partial input. A negative
//! debounce cannot be expressed at all (`debounce_ms` is unsigned) and fails
//! at parse time.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_THRESHOLD_SCORE: f32 = 0.8;
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Largest result count the search service accepts.
pub const MAX_RESULTS_LIMIT: usize = 50;

/// Configuration for the auto-reorg watcher and its search pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoReorgConfig {
    /// Whether watching is on at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum similarity score for a suggestion, in `[0, 1]`.
    #[serde(default = "default_threshold_score")]
    pub threshold_score: f32,

    /// Quiet period after the last change before dispatching.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Most suggestions to request and return, in `1..=50`.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_threshold_score() -> f32 {
    DEFAULT_THRESHOLD_SCORE
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl Default for AutoReorgConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold_score: DEFAULT_THRESHOLD_SCORE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl AutoReorgConfig {
    /// A disabled config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_threshold_score(mut self, threshold: f32) -> Self {
        self.threshold_score = threshold;
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Clamp every field into its accepted range.
    ///
    /// - `threshold_score` → `[0, 1]`; NaN becomes the default
    /// - `max_results` → `1..=50`
    pub fn validated(mut self) -> Self {
        if self.threshold_score.is_nan() {
            tracing::warn!("threshold_score is NaN, using default {DEFAULT_THRESHOLD_SCORE}");
            self.threshold_score = DEFAULT_THRESHOLD_SCORE;
        }
        let threshold = self.threshold_score.clamp(0.0, 1.0);
        if threshold != self.threshold_score {
            tracing::warn!(from = self.threshold_score, to = threshold, "clamped threshold_score");
            self.threshold_score = threshold;
        }

        let max_results = self.max_results.clamp(1, MAX_RESULTS_LIMIT);
        if max_results != self.max_results {
            tracing::warn!(from = self.max_results, to = max_results, "clamped max_results");
            self.max_results = max_results;
        }

        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parse from RON text and validate.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(ConfigError::from)?;
        Ok(config.validated())
    }

    /// Load from a RON file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::from)?;
        Self::from_ron_str(&text)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::from)?;
        Ok(text)
    }
}
