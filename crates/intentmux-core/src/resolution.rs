//! Candidates, resolutions, and the arbitration rule between the two paths.

use serde::{Deserialize, Serialize};

/// Sentinel intent for a classifier index that cannot be translated to a label.
pub const UNKNOWN_INTENT: &str = "Unknown";

/// One scored guess from a single classification path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub intent: String,
    /// Always within [0, 1].
    pub confidence: f32,
}

impl Candidate {
    /// Build a candidate, clamping the confidence into [0, 1].
    ///
    /// Non-finite scores collapse to 0.0; cosine similarity can overshoot 1.0
    /// by a rounding error, which is clamped away here.
    pub fn new(intent: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            intent: intent.into(),
            confidence,
        }
    }

    /// The classifier's answer when nothing could be translated or inference failed.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_INTENT, 0.0)
    }

    pub fn is_unknown(&self) -> bool {
        self.intent == UNKNOWN_INTENT
    }
}

/// Which path produced the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// TF-IDF nearest-neighbour over the training corpus.
    Lexical,
    /// The trained sequence classifier.
    Model,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Model => "model",
        }
    }
}

/// Which arbitration branch selected the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Lexical similarity above the strong-match threshold.
    StrongMatch,
    /// Lexical candidate more confident than the classifier.
    LexicalDominant,
    /// Classifier candidate kept.
    ModelDefault,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongMatch => "strong_match",
            Self::LexicalDominant => "lexical_dominant",
            Self::ModelDefault => "model_default",
        }
    }
}

/// Final answer for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub intent: String,
    pub confidence: f32,
    pub source: Source,
    pub rule: Rule,
}

impl Resolution {
    fn from_candidate(candidate: &Candidate, source: Source, rule: Rule) -> Self {
        Self {
            intent: candidate.intent.clone(),
            confidence: candidate.confidence,
            source,
            rule,
        }
    }
}

/// Pick one answer from the lexical and classifier candidates.
///
/// 1. A lexical candidate strictly above `strong_match` wins outright.
/// 2. Otherwise a lexical candidate strictly more confident than the
///    classifier wins.
/// 3. Otherwise the classifier candidate stands.
pub fn arbitrate(lexical: Option<&Candidate>, model: &Candidate, strong_match: f32) -> Resolution {
    match lexical {
        Some(lex) if lex.confidence > strong_match => {
            Resolution::from_candidate(lex, Source::Lexical, Rule::StrongMatch)
        }
        Some(lex) if lex.confidence > model.confidence => {
            Resolution::from_candidate(lex, Source::Lexical, Rule::LexicalDominant)
        }
        _ => Resolution::from_candidate(model, Source::Model, Rule::ModelDefault),
    }
}
