//! Vision node: classify frames for cracks and report verdicts to the edge node
//!
//! A frame is resized to the model's square input, scaled to [0, 1], scored
//! once by the classifier and thresholded at 0.5. The verdict is sent as a
//! DANGER or SAFE token, at most once per frame.

pub mod annotate;
pub mod classifier;
pub mod frame;
pub mod node;
pub mod pipeline;
pub mod source;

pub use classifier::{Classifier, OnnxClassifier};
pub use frame::{Frame, InputTensor};
pub use node::{VisionNode, VisionStats};
pub use pipeline::{label_for_score, ClassificationResult, InferencePipeline, Label};
pub use source::{open_source, DirectorySource, FrameSource, StillImageSource};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Failed to load model {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Input tensor has {got} values, expected {expected}")]
    InputShape { expected: usize, got: usize },

    #[error("Classifier score {0} is outside [0, 1]")]
    ScoreOutOfRange(f32),

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported frame source {0}: expected a still image or a directory of frames")]
    UnsupportedSource(PathBuf),

    #[error("Failed to save annotated frame {path}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}
