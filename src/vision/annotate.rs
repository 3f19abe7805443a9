//! Annotated copies of classified frames

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

use super::frame::Frame;
use super::pipeline::{ClassificationResult, Label};
use super::VisionError;
use crate::config::defaults::ANNOTATION_BORDER_PX;

const CRACK_COLOUR: Rgb<u8> = Rgb([220, 20, 20]);
const SAFE_COLOUR: Rgb<u8> = Rgb([20, 180, 20]);

/// Copy of the frame with a border in the verdict colour.
pub fn annotate(frame: &Frame, result: &ClassificationResult) -> RgbImage {
    let mut out = frame.image().clone();
    let colour = match result.label {
        Label::CrackDetected => CRACK_COLOUR,
        Label::Safe => SAFE_COLOUR,
    };
    let (w, h) = out.dimensions();
    let border = ANNOTATION_BORDER_PX.min(w / 2).min(h / 2);
    for (x, y, px) in out.enumerate_pixels_mut() {
        if x < border || y < border || x >= w - border || y >= h - border {
            *px = colour;
        }
    }
    out
}

/// `{stem}_{label}_{score}.png`, e.g. `deck_0007_crack_0.93.png`.
pub fn annotated_file_name(stem: &str, result: &ClassificationResult) -> String {
    format!("{stem}_{}_{:.2}.png", result.label.slug(), result.score)
}

/// Write the annotated frame into `dir`, creating it if needed.
pub fn save_annotated(
    dir: &Path,
    stem: &str,
    frame: &Frame,
    result: &ClassificationResult,
) -> Result<PathBuf, VisionError> {
    std::fs::create_dir_all(dir).map_err(|source| VisionError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(annotated_file_name(stem, result));
    annotate(frame, result)
        .save(&path)
        .map_err(|source| VisionError::Save {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
