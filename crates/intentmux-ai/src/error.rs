use std::path::PathBuf;

use intentmux_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("corpus is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("corpus has no usable records")]
    EmptyCorpus,

    #[error("lexical index: {0}")]
    Lexical(String),

    #[error("tokenizer: {0}")]
    Tokenizer(String),

    #[error("label encoder: {0}")]
    Labels(String),

    #[error("sequence model: {0}")]
    Model(String),

    #[error("label encoder has {labels} classes but the classifier outputs {outputs}")]
    LabelMismatch { labels: usize, outputs: usize },

    #[error("invalid resolver config: {0}")]
    Config(#[from] ConfigError),
}

impl ArtifactError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}
