//! Binary crack classifier

use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;

use super::frame::InputTensor;
use super::VisionError;

/// Scores one preprocessed frame. Higher means more likely cracked.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &InputTensor) -> Result<f32, VisionError>;
}

type Plan = TypedRunnableModel<TypedModel>;

/// ONNX export of the crack model, executed with tract.
///
/// Expects a single NHWC `[1, size, size, 3]` f32 input and a single
/// sigmoid output.
pub struct OnnxClassifier {
    plan: Plan,
    input_size: u32,
    path: PathBuf,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("path", &self.path)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load and optimise the model. Any failure here is fatal for the node.
    pub fn load(path: &Path, input_size: u32) -> Result<Self, VisionError> {
        let to_err = |e: TractError| VisionError::ModelLoad {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        };
        if !path.exists() {
            return Err(VisionError::ModelLoad {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            });
        }

        let side = input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(to_err)?
            .with_input_fact(0, f32::fact([1, side, side, 3]).into())
            .map_err(to_err)?
            .into_optimized()
            .map_err(to_err)?
            .into_runnable()
            .map_err(to_err)?;

        tracing::info!(path = %path.display(), input_size, "🧠 [Vision] Crack classifier loaded");
        Ok(Self {
            plan,
            input_size,
            path: path.to_path_buf(),
        })
    }

    pub const fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &InputTensor) -> Result<f32, VisionError> {
        let expected = InputTensor::expected_len(self.input_size);
        if input.size != self.input_size || input.data.len() != expected {
            return Err(VisionError::InputShape {
                expected,
                got: input.data.len(),
            });
        }

        let side = self.input_size as usize;
        let tensor: Tensor =
            tract_ndarray::Array4::from_shape_vec((1, side, side, 3), input.data.clone())
                .map_err(|e| VisionError::Inference(e.to_string()))?
                .into();
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| VisionError::Inference(format!("{e:#}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| VisionError::Inference("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| VisionError::Inference(format!("{e:#}")))?;
        view.iter()
            .next()
            .copied()
            .ok_or_else(|| VisionError::Inference("model output is empty".to_string()))
    }
}
