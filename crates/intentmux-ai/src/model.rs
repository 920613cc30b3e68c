//! Sequence classifier: fixed-length token ids → class probabilities.
//!
//! The production implementation runs an ONNX export of the trained model
//! through ONNX Runtime (feature `onnx`). The resolver only sees the
//! [`SequenceModel`] trait, so tests and embedders can supply their own.

/// A trained classifier over padded token id sequences.
pub trait SequenceModel: Send + Sync {
    /// Probability per class index for one padded sequence.
    fn predict(&self, ids: &[i64]) -> anyhow::Result<Vec<f32>>;

    /// Output dimensionality, when the model declares it.
    fn num_classes(&self) -> Option<usize>;
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxSequenceModel;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::Mutex;

    use ort::session::Session;
    use ort::tensor::TensorElementType;
    use ort::value::{DynValue, Tensor, ValueType};
    use tracing::info;

    use super::SequenceModel;

    /// Element type the graph expects for its token input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum InputKind {
        Float32,
        Int32,
        Int64,
    }

    /// ONNX Runtime session over an exported intent classifier.
    ///
    /// The graph takes one `[1, max_len]` input and its first output is a
    /// `[1, n_classes]` probability row. `Session::run` needs exclusive
    /// access, so concurrent requests serialise on the session lock.
    pub struct OnnxSequenceModel {
        session: Mutex<Session>,
        input_name: String,
        input_kind: InputKind,
        num_classes: Option<usize>,
    }

    impl OnnxSequenceModel {
        /// Load the classifier graph from an `.onnx` file.
        pub fn load(model_path: &Path) -> anyhow::Result<Self> {
            anyhow::ensure!(model_path.exists(), "{model_path:?} not found");

            let session = Session::builder()?.commit_from_file(model_path)?;

            let input = session
                .inputs()
                .first()
                .ok_or_else(|| anyhow::anyhow!("model has no inputs"))?;
            let input_name = input.name().to_string();
            let input_kind = infer_input_kind(input.dtype())?;

            let num_classes = session
                .outputs()
                .first()
                .and_then(|o| infer_dim(o.dtype()));

            info!(
                input = %input_name,
                ?input_kind,
                classes = ?num_classes,
                model = %model_path.display(),
                "loaded sequence classifier"
            );
            Ok(Self {
                session: Mutex::new(session),
                input_name,
                input_kind,
                num_classes,
            })
        }
    }

    impl SequenceModel for OnnxSequenceModel {
        fn predict(&self, ids: &[i64]) -> anyhow::Result<Vec<f32>> {
            let shape = [1i64, ids.len() as i64];

            let input: DynValue = match self.input_kind {
                InputKind::Float32 => {
                    let data: Vec<f32> = ids.iter().map(|&id| id as f32).collect();
                    Tensor::from_array((shape, data.into_boxed_slice()))?.into_dyn()
                }
                InputKind::Int32 => {
                    let data: Vec<i32> = ids.iter().map(|&id| id as i32).collect();
                    Tensor::from_array((shape, data.into_boxed_slice()))?.into_dyn()
                }
                InputKind::Int64 => {
                    Tensor::from_array((shape, ids.to_vec().into_boxed_slice()))?.into_dyn()
                }
            };

            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
            let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

            let (_, probs) = outputs[0].try_extract_tensor::<f32>()?;
            Ok(probs.to_vec())
        }

        fn num_classes(&self) -> Option<usize> {
            self.num_classes
        }
    }

    fn infer_input_kind(input_type: &ValueType) -> anyhow::Result<InputKind> {
        match input_type {
            ValueType::Tensor { ty, .. } => match ty {
                TensorElementType::Float32 => Ok(InputKind::Float32),
                TensorElementType::Int32 => Ok(InputKind::Int32),
                TensorElementType::Int64 => Ok(InputKind::Int64),
                other => anyhow::bail!("unsupported model input type {other:?}"),
            },
            other => anyhow::bail!("model input is not a tensor: {other:?}"),
        }
    }

    /// Last dimension of the output tensor, when static.
    fn infer_dim(output_type: &ValueType) -> Option<usize> {
        match output_type {
            ValueType::Tensor { shape, .. } => shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
            _ => None,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::path::PathBuf;

        fn model_path() -> Option<PathBuf> {
            let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join("model-train")
                .join("intent_model.onnx");
            if path.exists() {
                Some(path)
            } else {
                eprintln!("skipping: {} not present", path.display());
                None
            }
        }

        #[test]
        fn load_missing_model_errors() {
            assert!(OnnxSequenceModel::load(Path::new("/nonexistent/model.onnx")).is_err());
        }

        #[test]
        fn predicts_a_distribution() {
            let Some(path) = model_path() else { return };
            let model = OnnxSequenceModel::load(&path).unwrap();
            let probs = model.predict(&[1; 20]).unwrap();
            assert!(!probs.is_empty());
            if let Some(n) = model.num_classes() {
                assert_eq!(probs.len(), n);
            }
            let sum: f32 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-3, "expected softmax output, sum {sum}");
        }
    }
}
