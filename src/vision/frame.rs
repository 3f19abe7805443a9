//! Decoded frames and classifier input tensors

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;

use super::VisionError;
use crate::config::ChannelOrder;

/// One 8-bit colour frame.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    /// File stem or capture label, used to name annotated copies
    name: String,
}

/// NHWC `[1, size, size, 3]` f32 tensor in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub size: u32,
    pub data: Vec<f32>,
}

impl InputTensor {
    pub const fn expected_len(size: u32) -> usize {
        (size as usize) * (size as usize) * 3
    }
}

impl Frame {
    pub fn from_path(path: &Path) -> Result<Self, VisionError> {
        let image = image::open(path)
            .map_err(|source| VisionError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgb8();
        let name = path
            .file_stem()
            .map_or_else(|| "frame".to_string(), |s| s.to_string_lossy().into_owned());
        Ok(Self { image, name })
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            image,
            name: "frame".to_string(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Bilinear resize to `size`×`size`, scale to [0, 1], interleave channels
    /// in `order`.
    pub fn to_input(&self, size: u32, order: ChannelOrder) -> InputTensor {
        let resized = if self.image.dimensions() == (size, size) {
            self.image.clone()
        } else {
            imageops::resize(&self.image, size, size, FilterType::Triangle)
        };

        let mut data = Vec::with_capacity(InputTensor::expected_len(size));
        for pixel in resized.pixels() {
            let [r, g, b] = pixel.0;
            let ordered = match order {
                ChannelOrder::Bgr => [b, g, r],
                ChannelOrder::Rgb => [r, g, b],
            };
            data.extend(ordered.iter().map(|&c| f32::from(c) / 255.0));
        }
        InputTensor { size, data }
    }
}
