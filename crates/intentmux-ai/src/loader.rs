//! Artifact loading: the classifier and tokenizer are required, everything
//! else degrades.
//!
//! The loader builds one immutable [`Engine`] at startup. Corpus, lexical
//! index and label encoder problems switch off the affected capability and
//! are recorded in the [`LoadReport`]; a missing or unreadable classifier or
//! tokenizer is returned as an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use intentmux_core::{Resolution, ResolverConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::ArtifactError;
use crate::corpus::Corpus;
use crate::labels::{LabelEncoder, LabelSource, MIN_INTENT_SUPPORT, valid_intents};
use crate::lexical::LexicalIndex;
use crate::model::SequenceModel;
use crate::resolver::{Explanation, HybridResolver};
use crate::responder::{Reply, Responder};
use crate::tokenizer::{TextEncoder, load_tokenizer};

pub const MODEL_FILE: &str = "intent_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const ENCODER_FILE: &str = "intent_encoder.json";
pub const CORPUS_FILE: &str = "verixsoft_chat_dataset.csv";

/// Locations of the four training artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    pub encoder: PathBuf,
    pub corpus: PathBuf,
}

impl ArtifactPaths {
    /// Conventional file names inside one artifacts directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            encoder: dir.join(ENCODER_FILE),
            corpus: dir.join(CORPUS_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorpusStatus {
    Loaded { records: usize, dropped: usize },
    Missing,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LexicalStatus {
    Ready { rows: usize, vocabulary: usize },
    Disabled { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LabelStatus {
    Artifact { classes: usize },
    /// Fitted on the corpus's valid intents; ordering may differ from training.
    Rebuilt { classes: usize, reason: String },
    Unavailable { reason: String },
}

/// Every decision the loader took, for `check`, `/health` and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub corpus: CorpusStatus,
    pub lexical: LexicalStatus,
    pub labels: LabelStatus,
    /// Intents with at least two corpus examples; `None` without a corpus.
    pub valid_intents: Option<usize>,
    pub model_classes: Option<usize>,
    pub tokenizer: Option<String>,
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn lexical_enabled(&self) -> bool {
        matches!(self.lexical, LexicalStatus::Ready { .. })
    }

    pub fn label_source(&self) -> Option<LabelSource> {
        match self.labels {
            LabelStatus::Artifact { .. } => Some(LabelSource::Artifact),
            LabelStatus::Rebuilt { .. } => Some(LabelSource::Rebuilt),
            LabelStatus::Unavailable { .. } => None,
        }
    }

    pub fn label_count(&self) -> Option<usize> {
        match self.labels {
            LabelStatus::Artifact { classes } | LabelStatus::Rebuilt { classes, .. } => {
                Some(classes)
            }
            LabelStatus::Unavailable { .. } => None,
        }
    }

    pub fn corpus_records(&self) -> Option<usize> {
        match self.corpus {
            CorpusStatus::Loaded { records, .. } => Some(records),
            _ => None,
        }
    }
}

/// The optional artifacts, after degradation decisions.
pub struct Support {
    pub corpus: Option<Arc<Corpus>>,
    pub index: Option<LexicalIndex>,
    pub labels: Option<LabelEncoder>,
    pub report: LoadReport,
}

/// Load the corpus, lexical index and label encoder. Never fails.
pub fn load_support(corpus_path: &Path, encoder_path: &Path) -> Support {
    let corpus = match Corpus::from_path(corpus_path) {
        Ok(corpus) => corpus,
        Err(ArtifactError::NotFound(_)) => {
            warn!(path = %corpus_path.display(), "corpus not found; lexical fallback disabled");
            return without_corpus(CorpusStatus::Missing, encoder_path);
        }
        Err(e) => {
            warn!(error = %e, "corpus unusable; lexical fallback disabled");
            return without_corpus(
                CorpusStatus::Failed {
                    reason: e.to_string(),
                },
                encoder_path,
            );
        }
    };

    let corpus_status = CorpusStatus::Loaded {
        records: corpus.len(),
        dropped: corpus.dropped(),
    };

    let fitted = if corpus.is_empty() {
        Err(ArtifactError::EmptyCorpus)
    } else {
        LexicalIndex::fit(corpus.queries())
    };
    let (index, lexical) = match fitted {
        Ok(index) => {
            info!(
                rows = index.len(),
                vocabulary = index.vocabulary_size(),
                "lexical index ready"
            );
            let status = LexicalStatus::Ready {
                rows: index.len(),
                vocabulary: index.vocabulary_size(),
            };
            (Some(index), status)
        }
        Err(e) => {
            warn!(error = %e, "lexical index unavailable; lexical fallback disabled");
            let status = LexicalStatus::Disabled {
                reason: e.to_string(),
            };
            (None, status)
        }
    };

    let valid = valid_intents(&corpus, MIN_INTENT_SUPPORT);
    info!(count = valid.len(), "valid intents");

    let (labels, label_status) = match LabelEncoder::from_path(encoder_path) {
        Ok(labels) => {
            info!(classes = labels.len(), "label encoder loaded from artifact");
            let status = LabelStatus::Artifact {
                classes: labels.len(),
            };
            (Some(labels), status)
        }
        Err(e) if valid.is_empty() => {
            warn!(error = %e, "label encoder unavailable and no valid intents to rebuild from");
            let status = LabelStatus::Unavailable {
                reason: e.to_string(),
            };
            (None, status)
        }
        Err(e) => {
            let labels = LabelEncoder::fit(valid.iter().cloned());
            warn!(
                error = %e,
                classes = labels.len(),
                "label encoder rebuilt from corpus; class order may not match the classifier"
            );
            let status = LabelStatus::Rebuilt {
                classes: labels.len(),
                reason: e.to_string(),
            };
            (Some(labels), status)
        }
    };

    let mut warnings = Vec::new();
    if matches!(label_status, LabelStatus::Rebuilt { .. }) {
        warnings.push("label encoder rebuilt from corpus".to_string());
    }

    Support {
        corpus: Some(Arc::new(corpus)),
        index,
        labels,
        report: LoadReport {
            corpus: corpus_status,
            lexical,
            labels: label_status,
            valid_intents: Some(valid.len()),
            model_classes: None,
            tokenizer: None,
            warnings,
        },
    }
}

fn without_corpus(corpus: CorpusStatus, encoder_path: &Path) -> Support {
    let (labels, label_status) = match LabelEncoder::from_path(encoder_path) {
        Ok(labels) => {
            info!(classes = labels.len(), "label encoder loaded from artifact");
            let status = LabelStatus::Artifact {
                classes: labels.len(),
            };
            (Some(labels), status)
        }
        Err(e) => {
            warn!(error = %e, "no corpus and no label encoder; classifier answers will be Unknown");
            let status = LabelStatus::Unavailable {
                reason: e.to_string(),
            };
            (None, status)
        }
    };

    let mut warnings = Vec::new();
    if labels.is_none() {
        warnings.push("classifier indices cannot be translated to intents".to_string());
    }

    Support {
        corpus: None,
        index: None,
        labels,
        report: LoadReport {
            corpus,
            lexical: LexicalStatus::Disabled {
                reason: "no corpus".to_string(),
            },
            labels: label_status,
            valid_intents: None,
            model_classes: None,
            tokenizer: None,
            warnings,
        },
    }
}

/// Everything a request needs, built once and shared read-only.
pub struct Engine {
    resolver: HybridResolver,
    responder: Responder,
    report: LoadReport,
}

impl Engine {
    /// Wire a classifier and tokenizer to the optional artifacts.
    ///
    /// Fails on an invalid config, or on a label/classifier size mismatch when
    /// `strict_labels` is set.
    pub fn assemble(
        model: Box<dyn SequenceModel>,
        tokenizer: Box<dyn TextEncoder>,
        support: Support,
        config: ResolverConfig,
    ) -> Result<Self, ArtifactError> {
        config.validate()?;

        let Support {
            corpus,
            index,
            labels,
            mut report,
        } = support;

        report.model_classes = model.num_classes();
        report.tokenizer = Some(tokenizer.describe());

        if let (Some(outputs), Some(labels)) = (model.num_classes(), labels.as_ref())
            && outputs != labels.len()
        {
            if config.strict_labels {
                return Err(ArtifactError::LabelMismatch {
                    labels: labels.len(),
                    outputs,
                });
            }
            warn!(
                labels = labels.len(),
                outputs, "label encoder does not match classifier outputs"
            );
            report.warnings.push(format!(
                "label encoder has {} classes but the classifier outputs {outputs}",
                labels.len()
            ));
        }

        let responder = Responder::from_corpus(corpus.as_deref(), config.unsure_below);

        let mut resolver = HybridResolver::new(model, tokenizer, labels, config)?;
        if let (Some(index), Some(corpus)) = (index, corpus) {
            resolver = resolver.with_lexical(index, corpus)?;
        }

        info!(
            lexical = report.lexical_enabled(),
            labels = report.label_source().map(|s| s.as_str()).unwrap_or("none"),
            responses = responder.len(),
            "engine ready"
        );
        Ok(Self {
            resolver,
            responder,
            report,
        })
    }

    pub fn resolve(&self, text: &str) -> Resolution {
        self.resolver.resolve(text)
    }

    pub fn explain(&self, text: &str) -> Explanation {
        self.resolver.explain(text)
    }

    /// Resolve and pick the reply to show a user.
    pub fn chat(&self, text: &str) -> (Resolution, Reply) {
        let resolution = self.resolver.resolve(text);
        let reply = self.responder.reply(&resolution);
        (resolution, reply)
    }

    pub fn resolver(&self) -> &HybridResolver {
        &self.resolver
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Load every artifact except the classifier, which the caller supplies.
pub fn load_with_model(
    model: Box<dyn SequenceModel>,
    paths: &ArtifactPaths,
    config: ResolverConfig,
) -> Result<Engine, ArtifactError> {
    let tokenizer = load_tokenizer(&paths.tokenizer)?;
    let support = load_support(&paths.corpus, &paths.encoder);
    Engine::assemble(model, tokenizer, support, config)
}

/// Load the ONNX classifier and every other artifact.
#[cfg(feature = "onnx")]
pub fn load(paths: &ArtifactPaths, config: ResolverConfig) -> Result<Engine, ArtifactError> {
    if !paths.model.exists() {
        return Err(ArtifactError::NotFound(paths.model.clone()));
    }
    let model = crate::model::OnnxSequenceModel::load(&paths.model)
        .map_err(|e| ArtifactError::Model(format!("{}: {e:#}", paths.model.display())))?;
    load_with_model(Box::new(model), paths, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::testutils::FixedModel;
    use intentmux_core::Rule;

    const CSV: &str = "ID,Intent,User_Query,System_Instruction,Ideal_Response,Source\n\
        1,AccountReset,Reset my password,x,Use the reset link.,gen\n\
        2,AccountReset,I forgot my password,x,Use the link on the login page.,gen\n\
        3,Location,Where is your office located,x,We are downtown.,gen\n\
        4,Location,Office address,x,See the contact page.,gen\n\
        5,Pricing,How much does a website cost,x,It depends.,gen\n\
        6,,orphan query,x,no intent,gen\n";

    fn tokenizer_json() -> String {
        serde_json::json!({
            "class_name": "Tokenizer",
            "config": {
                "word_index": r#"{"reset": 1, "my": 2, "password": 3, "office": 4}"#,
                "oov_token": null
            }
        })
        .to_string()
    }

    fn artifacts(corpus: bool, encoder: Option<&str>) -> (tempfile::TempDir, ArtifactPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        std::fs::write(&paths.tokenizer, tokenizer_json()).unwrap();
        if corpus {
            std::fs::write(&paths.corpus, CSV).unwrap();
        }
        if let Some(encoder) = encoder {
            std::fs::write(&paths.encoder, encoder).unwrap();
        }
        (dir, paths)
    }

    fn model(probs: &[f32]) -> Box<dyn SequenceModel> {
        Box::new(FixedModel(probs.to_vec()))
    }

    #[test]
    fn conventional_names() {
        let paths = ArtifactPaths::in_dir("model-train");
        assert_eq!(paths.model, Path::new("model-train/intent_model.onnx"));
        assert_eq!(paths.corpus, Path::new("model-train/verixsoft_chat_dataset.csv"));
    }

    #[test]
    fn full_artifact_set() {
        let (_dir, paths) = artifacts(true, Some(r#"{"classes": ["AccountReset", "Location"]}"#));
        let engine = load_with_model(model(&[0.3, 0.7]), &paths, ResolverConfig::default()).unwrap();

        let report = engine.report();
        assert_eq!(report.corpus, CorpusStatus::Loaded { records: 5, dropped: 1 });
        assert!(report.lexical_enabled());
        assert_eq!(report.label_source(), Some(LabelSource::Artifact));
        assert_eq!(report.valid_intents, Some(2));
        assert_eq!(report.model_classes, Some(2));
        assert!(report.warnings.is_empty());

        let res = engine.resolve("reset my password");
        assert_eq!(res.intent, "AccountReset");
        assert_eq!(res.rule, Rule::StrongMatch);
    }

    #[test]
    fn missing_encoder_is_rebuilt_from_valid_intents() {
        let (_dir, paths) = artifacts(true, None);
        let engine = load_with_model(model(&[0.1, 0.9]), &paths, ResolverConfig::default()).unwrap();
        let report = engine.report();
        assert!(matches!(report.labels, LabelStatus::Rebuilt { classes: 2, .. }));
        assert_eq!(report.warnings.len(), 1);
        // Pricing has one example and is not part of the rebuilt encoder.
        let labels = engine.resolver().labels().unwrap();
        assert_eq!(labels.classes(), &["AccountReset", "Location"]);
        assert_eq!(engine.resolve("zzz").intent, "Location");
    }

    #[test]
    fn corrupt_encoder_is_rebuilt() {
        let (_dir, paths) = artifacts(true, Some("{not json"));
        let support = load_support(&paths.corpus, &paths.encoder);
        assert!(matches!(support.report.labels, LabelStatus::Rebuilt { .. }));
    }

    #[test]
    fn no_corpus_serves_classifier_only() {
        let (_dir, paths) = artifacts(false, Some(r#"["AccountReset", "Location", "Pricing"]"#));
        let engine =
            load_with_model(model(&[0.1, 0.1, 0.8]), &paths, ResolverConfig::default()).unwrap();
        let report = engine.report();
        assert_eq!(report.corpus, CorpusStatus::Missing);
        assert!(!report.lexical_enabled());
        assert!(!engine.resolver().has_lexical());

        let res = engine.resolve("reset my password");
        assert_eq!(res.intent, "Pricing");
        assert_eq!(res.confidence, 0.8);
    }

    #[test]
    fn nothing_optional_available() {
        let (_dir, paths) = artifacts(false, None);
        let engine = load_with_model(model(&[0.6, 0.4]), &paths, ResolverConfig::default()).unwrap();
        assert!(matches!(engine.report().labels, LabelStatus::Unavailable { .. }));
        let res = engine.resolve("hello");
        assert_eq!(res.intent, "Unknown");
        assert_eq!(res.confidence, 0.6);
    }

    #[test]
    fn corpus_without_required_columns_degrades() {
        let (_dir, paths) = artifacts(false, Some(r#"["A", "B"]"#));
        std::fs::write(&paths.corpus, "question,label\nhi,Greeting\n").unwrap();
        let support = load_support(&paths.corpus, &paths.encoder);
        assert!(matches!(support.report.corpus, CorpusStatus::Failed { .. }));
        assert!(support.index.is_none());
        // Encoder artifact still loaded on the no-corpus path.
        assert_eq!(support.report.label_source(), Some(LabelSource::Artifact));
    }

    #[test]
    fn stop_word_corpus_disables_lexical_only() {
        let (_dir, paths) = artifacts(false, None);
        std::fs::write(
            &paths.corpus,
            "User_Query,Intent,Ideal_Response\nis it,Greeting,Hi\nthe a,Greeting,Hello\n",
        )
        .unwrap();
        let support = load_support(&paths.corpus, &paths.encoder);
        assert!(matches!(support.report.lexical, LexicalStatus::Disabled { .. }));
        assert_eq!(support.report.label_count(), Some(1));
        assert!(support.corpus.is_some());
    }

    #[test]
    fn strict_label_mismatch_is_fatal() {
        let (_dir, paths) = artifacts(true, Some(r#"["AccountReset", "Location"]"#));
        let err = load_with_model(model(&[0.2, 0.3, 0.5]), &paths, ResolverConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ArtifactError::LabelMismatch { labels: 2, outputs: 3 }));
    }

    #[test]
    fn lenient_label_mismatch_warns() {
        let (_dir, paths) = artifacts(true, Some(r#"["AccountReset", "Location"]"#));
        let config = ResolverConfig {
            strict_labels: false,
            ..Default::default()
        };
        let engine = load_with_model(model(&[0.2, 0.3, 0.5]), &paths, config).unwrap();
        assert_eq!(engine.report().warnings.len(), 1);
        assert_eq!(engine.resolve("zzz").intent, "Unknown");
    }

    #[test]
    fn missing_tokenizer_is_fatal() {
        let (_dir, paths) = artifacts(true, None);
        std::fs::remove_file(&paths.tokenizer).unwrap();
        let err = load_with_model(model(&[1.0]), &paths, ResolverConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn chat_maps_responses() {
        let (_dir, paths) = artifacts(true, Some(r#"["AccountReset", "Location"]"#));
        let engine = load_with_model(model(&[0.5, 0.5]), &paths, ResolverConfig::default()).unwrap();
        let (res, reply) = engine.chat("where is your office located");
        assert_eq!(res.intent, "Location");
        assert_eq!(reply, Reply::Answer("We are downtown.".into()));

        let (_, reply) = engine.chat("zzz");
        // Classifier at 0.5 picks the first class.
        assert_eq!(reply, Reply::Answer("Use the reset link.".into()));
    }

    #[test]
    fn report_serialises() {
        let (_dir, paths) = artifacts(false, None);
        let support = load_support(&paths.corpus, &paths.encoder);
        let json = serde_json::to_value(&support.report).unwrap();
        assert_eq!(json["corpus"]["status"], "missing");
        assert_eq!(json["lexical"]["status"], "disabled");
    }
}
