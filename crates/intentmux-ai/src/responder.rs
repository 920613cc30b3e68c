//! Canned replies for resolved intents, drawn from the corpus.

use std::collections::HashMap;

use intentmux_core::Resolution;
use intentmux_core::config::DEFAULT_UNSURE_BELOW;
use serde::Serialize;

pub const UNSURE_MESSAGE: &str = "I'm not sure I understand. Could you rephrase that? \
     You can ask me about our services, team, or location.";

/// What to say back for one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reply {
    /// The canonical response mapped to the resolved intent.
    Answer(String),
    /// Confidence too low to commit to an intent.
    Unsure,
    /// Confident intent with no response on file.
    Unmapped(String),
}

impl Reply {
    pub fn text(&self) -> String {
        match self {
            Self::Answer(response) => response.clone(),
            Self::Unsure => UNSURE_MESSAGE.to_string(),
            Self::Unmapped(intent) => format!(
                "I understood the intent ({intent}) but I don't have a specific response mapped for it yet."
            ),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Answer(_) => "answer",
            Self::Unsure => "unsure",
            Self::Unmapped(_) => "unmapped",
        }
    }
}

/// Intent → first canonical response in corpus order. Intent keys compare
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct Responder {
    responses: HashMap<String, String>,
    unsure_below: f32,
}

impl Default for Responder {
    fn default() -> Self {
        Self {
            responses: HashMap::new(),
            unsure_below: DEFAULT_UNSURE_BELOW,
        }
    }
}

impl Responder {
    pub fn new(unsure_below: f32) -> Self {
        Self {
            unsure_below,
            ..Self::default()
        }
    }

    /// Build from a corpus; `None` yields a responder with no mapped answers.
    pub fn from_corpus(corpus: Option<&crate::Corpus>, unsure_below: f32) -> Self {
        let mut responder = Self::new(unsure_below);
        for record in corpus.into_iter().flat_map(|c| c.records()) {
            responder
                .responses
                .entry(record.intent.to_lowercase())
                .or_insert_with(|| record.response.clone());
        }
        responder
    }

    pub fn response_for(&self, intent: &str) -> Option<&str> {
        self.responses.get(&intent.to_lowercase()).map(String::as_str)
    }

    /// Number of intents with a mapped response.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn reply(&self, resolution: &Resolution) -> Reply {
        if resolution.confidence < self.unsure_below {
            return Reply::Unsure;
        }
        match self.response_for(&resolution.intent) {
            Some(response) => Reply::Answer(response.to_string()),
            None => Reply::Unmapped(resolution.intent.clone()),
        }
    }
}
