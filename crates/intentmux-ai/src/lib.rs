//! Intent resolution layer: ONNX sequence classifier, TF-IDF lexical fallback, arbitration.

mod error;
pub use error::ArtifactError;

pub mod corpus;
pub mod labels;
pub mod lexical;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod responder;
mod stop_words;
pub mod tokenizer;

pub use corpus::{Corpus, CorpusRecord};
pub use labels::{LabelEncoder, valid_intents};
pub use lexical::LexicalIndex;
pub use loader::{ArtifactPaths, Engine, LoadReport, Support, load_support, load_with_model};
pub use model::SequenceModel;
pub use resolver::{Explanation, HybridResolver, Outcome};
pub use responder::{Reply, Responder};
pub use tokenizer::{KerasTokenizer, TextEncoder};

#[cfg(feature = "onnx")]
pub use loader::load;
#[cfg(feature = "onnx")]
pub use model::OnnxSequenceModel;
