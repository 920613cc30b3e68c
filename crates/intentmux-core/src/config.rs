//! Resolver tuning shared by the engine, the CLI, and the HTTP boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed sequence length the classifier was trained with.
pub const DEFAULT_MAX_LEN: usize = 20;
/// Lexical matches at or below this similarity produce no candidate.
pub const DEFAULT_SIMILARITY_FLOOR: f32 = 0.3;
/// Lexical matches above this similarity override the classifier.
pub const DEFAULT_STRONG_MATCH: f32 = 0.6;
/// Resolutions below this confidence get a clarification reply instead of an answer.
pub const DEFAULT_UNSURE_BELOW: f32 = 0.40;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_len must be at least 1")]
    ZeroMaxLen,
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f32 },
    #[error("similarity_floor ({floor}) must not exceed strong_match ({strong})")]
    FloorAboveStrong { floor: f32, strong: f32 },
}

/// Thresholds and shapes used when resolving an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_len: usize,
    pub similarity_floor: f32,
    pub strong_match: f32,
    pub unsure_below: f32,
    /// Refuse to start when the label encoder and classifier disagree on class count.
    pub strict_labels: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            similarity_floor: DEFAULT_SIMILARITY_FLOOR,
            strong_match: DEFAULT_STRONG_MATCH,
            unsure_below: DEFAULT_UNSURE_BELOW,
            strict_labels: true,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_len == 0 {
            return Err(ConfigError::ZeroMaxLen);
        }
        for (name, value) in [
            ("similarity_floor", self.similarity_floor),
            ("strong_match", self.strong_match),
            ("unsure_below", self.unsure_below),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        if self.similarity_floor > self.strong_match {
            return Err(ConfigError::FloorAboveStrong {
                floor: self.similarity_floor,
                strong: self.strong_match,
            });
        }
        Ok(())
    }
}
