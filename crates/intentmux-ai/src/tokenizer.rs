//! Text → fixed-length token id sequences for the sequence classifier.
//!
//! Two artifact formats are accepted for `tokenizer.json`:
//! - the Keras `Tokenizer.to_json()` document (word index + filter rules),
//!   handled natively;
//! - a HuggingFace `tokenizers` document, with the `onnx` feature.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::ArtifactError;

/// Keras' default filter set.
const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Converts normalised text into the id sequence the classifier expects.
pub trait TextEncoder: Send + Sync {
    /// Token ids for `text`, exactly `max_len` long.
    fn encode(&self, text: &str, max_len: usize) -> anyhow::Result<Vec<i64>>;

    /// Short description for logs and reports.
    fn describe(&self) -> String;
}

/// Keras-style word-index tokenizer.
#[derive(Debug, Clone)]
pub struct KerasTokenizer {
    word_index: HashMap<String, i64>,
    filters: HashSet<char>,
    lower: bool,
    split: String,
    num_words: Option<usize>,
    oov_index: Option<i64>,
}

impl KerasTokenizer {
    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let doc: Value =
            serde_json::from_str(json).map_err(|e| ArtifactError::Tokenizer(e.to_string()))?;
        Self::from_value(&doc)
    }

    /// Build from a parsed `to_json()` document, or from its bare `config` object.
    pub fn from_value(doc: &Value) -> Result<Self, ArtifactError> {
        let config = doc.get("config").unwrap_or(doc);

        let word_index = match config.get("word_index") {
            // to_json() stores the index as a JSON string inside the JSON.
            Some(Value::String(raw)) => serde_json::from_str::<HashMap<String, i64>>(raw)
                .map_err(|e| ArtifactError::Tokenizer(format!("word_index: {e}")))?,
            Some(v @ Value::Object(_)) => serde_json::from_value(v.clone())
                .map_err(|e| ArtifactError::Tokenizer(format!("word_index: {e}")))?,
            _ => return Err(ArtifactError::Tokenizer("missing word_index".into())),
        };
        if word_index.is_empty() {
            return Err(ArtifactError::Tokenizer("word_index is empty".into()));
        }

        let filters = config
            .get("filters")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FILTERS)
            .chars()
            .collect();
        let lower = config.get("lower").and_then(Value::as_bool).unwrap_or(true);
        let split = config
            .get("split")
            .and_then(Value::as_str)
            .unwrap_or(" ")
            .to_string();
        let num_words = config
            .get("num_words")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let oov_index = config
            .get("oov_token")
            .and_then(Value::as_str)
            .and_then(|tok| word_index.get(tok).copied());

        Ok(Self {
            word_index,
            filters,
            lower,
            split,
            num_words,
            oov_index,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.word_index.len()
    }

    /// Unpadded ids, the way `texts_to_sequences` produces them.
    pub fn to_sequence(&self, text: &str) -> Vec<i64> {
        let text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let filtered: String = text
            .chars()
            .map(|c| {
                if self.filters.contains(&c) {
                    self.split.clone()
                } else {
                    c.to_string()
                }
            })
            .collect();

        let mut ids = Vec::new();
        for word in filtered.split(self.split.as_str()).filter(|w| !w.is_empty()) {
            match self.word_index.get(word) {
                Some(&id) if self.num_words.is_none_or(|n| (id as usize) < n) => ids.push(id),
                _ => {
                    if let Some(oov) = self.oov_index {
                        ids.push(oov);
                    }
                }
            }
        }
        ids
    }
}

impl TextEncoder for KerasTokenizer {
    fn encode(&self, text: &str, max_len: usize) -> anyhow::Result<Vec<i64>> {
        let ids = truncate_pre(self.to_sequence(text), max_len);
        Ok(pad_post(ids, max_len, 0))
    }

    fn describe(&self) -> String {
        format!("keras word index ({} words)", self.word_index.len())
    }
}

/// Keep the last `max_len` ids.
pub(crate) fn truncate_pre(mut ids: Vec<i64>, max_len: usize) -> Vec<i64> {
    if ids.len() > max_len {
        ids.drain(..ids.len() - max_len);
    }
    ids
}

/// Right-pad with `pad_id` up to `max_len`.
pub(crate) fn pad_post(mut ids: Vec<i64>, max_len: usize, pad_id: i64) -> Vec<i64> {
    ids.resize(max_len.max(ids.len()), pad_id);
    ids.truncate(max_len);
    ids
}

/// Load whichever tokenizer format the artifact holds.
pub fn load_tokenizer(path: &Path) -> Result<Box<dyn TextEncoder>, ArtifactError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ArtifactError::io(path, e))?;
    let doc: Value = serde_json::from_str(&raw).map_err(|e| ArtifactError::json(path, e))?;

    let is_keras = doc.get("class_name").and_then(Value::as_str) == Some("Tokenizer")
        || doc.get("config").and_then(|c| c.get("word_index")).is_some()
        || doc.get("word_index").is_some();

    if is_keras {
        let tokenizer = KerasTokenizer::from_value(&doc)?;
        info!(words = tokenizer.vocab_size(), path = %path.display(), "loaded keras tokenizer");
        return Ok(Box::new(tokenizer));
    }

    load_hf(path)
}

#[cfg(feature = "onnx")]
fn load_hf(path: &Path) -> Result<Box<dyn TextEncoder>, ArtifactError> {
    let tokenizer = hf::HfTokenizer::load(path)?;
    info!(path = %path.display(), "loaded huggingface tokenizer");
    Ok(Box::new(tokenizer))
}

#[cfg(not(feature = "onnx"))]
fn load_hf(path: &Path) -> Result<Box<dyn TextEncoder>, ArtifactError> {
    Err(ArtifactError::Tokenizer(format!(
        "{} is not a keras tokenizer; huggingface tokenizers need the `onnx` feature",
        path.display()
    )))
}

#[cfg(feature = "onnx")]
mod hf {
    use std::path::Path;

    use tokenizers::Tokenizer;

    use super::{TextEncoder, pad_post};
    use crate::ArtifactError;

    pub struct HfTokenizer {
        tokenizer: Tokenizer,
        pad_id: i64,
    }

    impl HfTokenizer {
        pub fn load(path: &Path) -> Result<Self, ArtifactError> {
            let tokenizer = Tokenizer::from_file(path)
                .map_err(|e| ArtifactError::Tokenizer(format!("load tokenizer: {e}")))?;
            let pad_id = tokenizer
                .get_padding()
                .map(|p| p.pad_id as i64)
                .unwrap_or(0);
            Ok(Self { tokenizer, pad_id })
        }
    }

    impl TextEncoder for HfTokenizer {
        fn encode(&self, text: &str, max_len: usize) -> anyhow::Result<Vec<i64>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
            let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            Ok(pad_post(ids, max_len, self.pad_id))
        }

        fn describe(&self) -> String {
            format!(
                "huggingface tokenizer ({} tokens)",
                self.tokenizer.get_vocab_size(true)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keras_json(oov: bool, num_words: Option<usize>) -> String {
        let word_index = if oov {
            r#"{"<OOV>": 1, "reset": 2, "my": 3, "password": 4, "where": 5, "office": 6}"#
        } else {
            r#"{"reset": 1, "my": 2, "password": 3, "where": 4, "office": 5}"#
        };
        serde_json::json!({
            "class_name": "Tokenizer",
            "config": {
                "num_words": num_words,
                "filters": DEFAULT_FILTERS,
                "lower": true,
                "split": " ",
                "char_level": false,
                "oov_token": if oov { Some("<OOV>") } else { None },
                "document_count": 10,
                "word_index": word_index,
            }
        })
        .to_string()
    }

    #[test]
    fn encodes_and_pads_post() {
        let tok = KerasTokenizer::from_json_str(&keras_json(false, None)).unwrap();
        let ids = tok.encode("reset my password", 6).unwrap();
        assert_eq!(ids, vec![1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn punctuation_is_filtered() {
        let tok = KerasTokenizer::from_json_str(&keras_json(false, None)).unwrap();
        assert_eq!(tok.to_sequence("Reset, my password!!"), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_words_dropped_without_oov() {
        let tok = KerasTokenizer::from_json_str(&keras_json(false, None)).unwrap();
        assert_eq!(tok.to_sequence("please reset the password"), vec![1, 3]);
    }

    #[test]
    fn unknown_words_map_to_oov() {
        let tok = KerasTokenizer::from_json_str(&keras_json(true, None)).unwrap();
        assert_eq!(tok.to_sequence("please reset"), vec![1, 2]);
    }

    #[test]
    fn num_words_limits_vocabulary() {
        let tok = KerasTokenizer::from_json_str(&keras_json(true, Some(4))).unwrap();
        // "office" has id 6 >= 4 and falls back to OOV.
        assert_eq!(tok.to_sequence("reset office"), vec![2, 1]);
    }

    #[test]
    fn long_input_keeps_tail() {
        let tok = KerasTokenizer::from_json_str(&keras_json(false, None)).unwrap();
        let ids = tok.encode("reset my password where office", 3).unwrap();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn always_max_len() {
        let tok = KerasTokenizer::from_json_str(&keras_json(false, None)).unwrap();
        assert_eq!(tok.encode("", 20).unwrap(), vec![0; 20]);
        assert_eq!(tok.encode("reset", 20).unwrap().len(), 20);
    }

    #[test]
    fn accepts_object_word_index() {
        let json = r#"{"word_index": {"hello": 1}}"#;
        let tok = KerasTokenizer::from_json_str(json).unwrap();
        assert_eq!(tok.to_sequence("Hello"), vec![1]);
    }

    #[test]
    fn missing_word_index_errors() {
        let err = KerasTokenizer::from_json_str(r#"{"config": {}}"#).unwrap_err();
        assert!(matches!(err, ArtifactError::Tokenizer(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, keras_json(false, None)).unwrap();
        let tok = load_tokenizer(&path).unwrap();
        assert_eq!(tok.encode("office", 2).unwrap(), vec![5, 0]);
        assert!(tok.describe().contains("keras"));
    }

    #[test]
    fn load_missing_file_errors() {
        let err = load_tokenizer(Path::new("/nonexistent/tokenizer.json")).err().unwrap();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn pad_helpers() {
        assert_eq!(pad_post(vec![1, 2], 4, 9), vec![1, 2, 9, 9]);
        assert_eq!(pad_post(vec![1, 2, 3], 2, 0), vec![1, 2]);
        assert_eq!(truncate_pre(vec![1, 2, 3], 2), vec![2, 3]);
    }
}
