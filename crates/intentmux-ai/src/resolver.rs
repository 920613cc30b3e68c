//! Hybrid intent resolution: lexical nearest neighbour + sequence classifier.
//!
//! Both paths run on every request against immutable state built at load
//! time. Failures inside a path are absorbed into its [`Outcome`]; the
//! resolver itself always returns an answer.

use std::sync::Arc;

use intentmux_core::{Candidate, Resolution, ResolverConfig, arbitrate, normalize};
use serde::Serialize;
use tracing::debug;

use crate::ArtifactError;
use crate::corpus::Corpus;
use crate::labels::LabelEncoder;
use crate::lexical::LexicalIndex;
use crate::model::SequenceModel;
use crate::tokenizer::TextEncoder;

/// What one path produced for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A usable candidate.
    Match { candidate: Candidate },
    /// The path ran but nothing cleared its threshold.
    NoMatch { best: f32 },
    /// The path is not available in this process.
    Disabled,
    /// The path errored; the error was absorbed.
    Failed { error: String },
}

impl Outcome {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Match { candidate } => Some(candidate),
            _ => None,
        }
    }
}

/// Both path outcomes plus the arbitrated answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub normalized: String,
    pub lexical: Outcome,
    pub model: Outcome,
    pub resolution: Resolution,
}

/// TF-IDF index paired with the corpus it was fitted on.
struct LexicalLookup {
    index: LexicalIndex,
    corpus: Arc<Corpus>,
}

/// Immutable resolution context shared by all requests.
pub struct HybridResolver {
    model: Box<dyn SequenceModel>,
    tokenizer: Box<dyn TextEncoder>,
    labels: Option<LabelEncoder>,
    lexical: Option<LexicalLookup>,
    config: ResolverConfig,
}

impl HybridResolver {
    /// Build a resolver with only the classifier path.
    pub fn new(
        model: Box<dyn SequenceModel>,
        tokenizer: Box<dyn TextEncoder>,
        labels: Option<LabelEncoder>,
        config: ResolverConfig,
    ) -> Result<Self, ArtifactError> {
        config.validate()?;
        Ok(Self {
            model,
            tokenizer,
            labels,
            lexical: None,
            config,
        })
    }

    /// Enable the lexical path. The index must have one row per corpus record.
    pub fn with_lexical(
        mut self,
        index: LexicalIndex,
        corpus: Arc<Corpus>,
    ) -> Result<Self, ArtifactError> {
        if index.len() != corpus.len() {
            return Err(ArtifactError::Lexical(format!(
                "index has {} rows but corpus has {} records",
                index.len(),
                corpus.len()
            )));
        }
        self.lexical = Some(LexicalLookup { index, corpus });
        Ok(self)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn has_lexical(&self) -> bool {
        self.lexical.is_some()
    }

    pub fn labels(&self) -> Option<&LabelEncoder> {
        self.labels.as_ref()
    }

    /// Resolve one utterance to a single (intent, confidence) answer.
    pub fn resolve(&self, text: &str) -> Resolution {
        self.explain(text).resolution
    }

    /// Resolve and keep both path outcomes.
    pub fn explain(&self, text: &str) -> Explanation {
        let normalized = normalize(text);

        let lexical = self.lexical_outcome(&normalized);
        let model = self.model_outcome(&normalized);

        let model_candidate = model.candidate().cloned().unwrap_or_else(Candidate::unknown);
        let resolution = arbitrate(
            lexical.candidate(),
            &model_candidate,
            self.config.strong_match,
        );

        debug!(
            text = %normalized,
            ?lexical,
            ?model,
            intent = %resolution.intent,
            confidence = resolution.confidence,
            rule = resolution.rule.as_str(),
            "resolved intent"
        );

        Explanation {
            normalized,
            lexical,
            model,
            resolution,
        }
    }

    fn lexical_outcome(&self, normalized: &str) -> Outcome {
        let Some(lookup) = &self.lexical else {
            return Outcome::Disabled;
        };

        let Some((row, similarity)) = lookup.index.best_match(normalized) else {
            return Outcome::NoMatch { best: 0.0 };
        };
        if similarity <= self.config.similarity_floor {
            return Outcome::NoMatch { best: similarity };
        }

        match lookup.corpus.get(row) {
            Some(record) => {
                debug!(matched = %record.query, row, similarity, "lexical match");
                Outcome::Match {
                    candidate: Candidate::new(record.intent.clone(), similarity),
                }
            }
            None => Outcome::Failed {
                error: format!("row {row} has no corpus record"),
            },
        }
    }

    fn model_outcome(&self, normalized: &str) -> Outcome {
        match self.classify(normalized) {
            Ok(candidate) => Outcome::Match { candidate },
            Err(e) => {
                debug!(error = %e, "sequence classifier failed");
                Outcome::Failed {
                    error: format!("{e:#}"),
                }
            }
        }
    }

    fn classify(&self, normalized: &str) -> anyhow::Result<Candidate> {
        let ids = self.tokenizer.encode(normalized, self.config.max_len)?;
        let probs = self.model.predict(&ids)?;
        let (index, confidence) = argmax(&probs)?;

        let intent = self
            .labels
            .as_ref()
            .and_then(|labels| labels.decode(index))
            .unwrap_or(intentmux_core::UNKNOWN_INTENT);
        Ok(Candidate::new(intent, confidence))
    }
}

/// First index holding the maximum probability.
fn argmax(probs: &[f32]) -> anyhow::Result<(usize, f32)> {
    anyhow::ensure!(!probs.is_empty(), "model returned no probabilities");
    anyhow::ensure!(
        probs.iter().all(|p| p.is_finite()),
        "model returned non-finite probabilities"
    );
    let mut best = (0, probs[0]);
    for (i, &p) in probs.iter().enumerate().skip(1) {
        if p > best.1 {
            best = (i, p);
        }
    }
    Ok(best)
}
