//! Class index ↔ intent name mapping for the sequence classifier.
//!
//! The preferred source is the encoder artifact written by the training run.
//! When it is unavailable the encoder is rebuilt from the corpus's valid
//! intent set; the rebuilt ordering is sorted and may not match the one the
//! classifier was trained against.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ArtifactError;
use crate::corpus::Corpus;

/// Intents with fewer examples than this are left out of a rebuilt encoder.
pub const MIN_INTENT_SUPPORT: usize = 2;

/// Where the active label encoder came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Artifact,
    Rebuilt,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artifact => "artifact",
            Self::Rebuilt => "rebuilt",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EncoderDocument {
    Wrapped { classes: Vec<String> },
    Bare(Vec<String>),
}

/// Dense zero-based class index → intent name.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on a set of labels: unique values in sorted order.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Use an explicit ordering as written by the training run.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.is_empty() {
            return Err(ArtifactError::Labels("no classes".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for class in &classes {
            if !seen.insert(class.as_str()) {
                return Err(ArtifactError::Labels(format!("duplicate class '{class}'")));
            }
        }
        Ok(Self { classes })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let doc: EncoderDocument =
            serde_json::from_str(json).map_err(|e| ArtifactError::Labels(e.to_string()))?;
        let classes = match doc {
            EncoderDocument::Wrapped { classes } | EncoderDocument::Bare(classes) => classes,
        };
        Self::from_classes(classes.into_iter().map(|c| c.trim().to_string()).collect())
    }

    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ArtifactError::io(path, e))?;
        Self::from_json_str(&raw)
    }

    /// Intent name for a class index, if the index is in range.
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Intents with at least `min_support` examples, sorted.
pub fn valid_intents(corpus: &Corpus, min_support: usize) -> Vec<String> {
    corpus
        .intent_counts()
        .into_iter()
        .filter(|&(_, count)| count >= min_support)
        .map(|(intent, _)| intent.to_string())
        .collect()
}
