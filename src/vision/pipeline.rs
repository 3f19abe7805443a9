//! classify(frame) -> score, label, transport token

use std::fmt;

use serde::{Deserialize, Serialize};

use super::classifier::Classifier;
use super::frame::Frame;
use super::VisionError;
use crate::config::defaults::CRACK_SCORE_THRESHOLD;
use crate::config::ChannelOrder;
use crate::transport::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Safe,
    CrackDetected,
}

impl Label {
    pub const fn token(self) -> Token {
        match self {
            Self::Safe => Token::Safe,
            Self::CrackDetected => Token::Danger,
        }
    }

    /// File-name friendly form.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::CrackDetected => "crack",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Safe => "Safe",
            Self::CrackDetected => "Crack Detected",
        })
    }
}

/// Score strictly above the threshold is a crack; exactly 0.5 is safe.
pub fn label_for_score(score: f32) -> Label {
    if score > CRACK_SCORE_THRESHOLD {
        Label::CrackDetected
    } else {
        Label::Safe
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub score: f32,
    pub label: Label,
}

impl ClassificationResult {
    pub fn from_score(score: f32) -> Self {
        Self {
            score,
            label: label_for_score(score),
        }
    }

    /// Token to send for this frame.
    pub const fn message(&self) -> Token {
        self.label.token()
    }

    pub fn is_crack(&self) -> bool {
        self.label == Label::CrackDetected
    }
}

pub struct InferencePipeline<C> {
    classifier: C,
    input_size: u32,
    channel_order: ChannelOrder,
}

impl<C: Classifier> InferencePipeline<C> {
    pub const fn new(classifier: C, input_size: u32, channel_order: ChannelOrder) -> Self {
        Self {
            classifier,
            input_size,
            channel_order,
        }
    }

    /// Preprocess, score once, threshold.
    ///
    /// A score outside [0, 1] (or NaN) means the model is not the sigmoid
    /// classifier it should be; the frame is rejected.
    pub fn classify(&self, frame: &Frame) -> Result<ClassificationResult, VisionError> {
        let input = frame.to_input(self.input_size, self.channel_order);
        let score = self.classifier.predict(&input)?;
        if !(0.0..=1.0).contains(&score) {
            return Err(VisionError::ScoreOutOfRange(score));
        }
        Ok(ClassificationResult::from_score(score))
    }
}
