//! Frame sources
//!
//! Still images and directories of frames are handled here. Video files and
//! live cameras plug in by implementing [`FrameSource`].

use std::path::{Path, PathBuf};

use super::frame::Frame;
use super::VisionError;
use crate::config::defaults::STILL_IMAGE_EXTENSIONS;

pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// Next frame, `None` when the source is exhausted. A decode failure
    /// is reported for that frame only.
    fn next_frame(&mut self) -> Option<Result<Frame, VisionError>>;

    /// Streams are paced between frames; a still image is not.
    fn is_stream(&self) -> bool {
        true
    }
}

pub fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            STILL_IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// A single image file, yielded once.
pub struct StillImageSource {
    path: PathBuf,
    name: String,
    done: bool,
}

impl StillImageSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            done: false,
        }
    }
}

impl FrameSource for StillImageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Option<Result<Frame, VisionError>> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(Frame::from_path(&self.path))
    }

    fn is_stream(&self) -> bool {
        false
    }
}

/// Image files in a directory, in lexical file-name order.
pub struct DirectorySource {
    name: String,
    frames: std::vec::IntoIter<PathBuf>,
}

impl DirectorySource {
    pub fn open(dir: &Path) -> Result<Self, VisionError> {
        let io_err = |source: std::io::Error| VisionError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_still_image(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        tracing::debug!(dir = %dir.display(), frames = frames.len(), "[Vision] Frame directory scanned");
        Ok(Self {
            name: dir.display().to_string(),
            frames: frames.into_iter(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_frame(&mut self) -> Option<Result<Frame, VisionError>> {
        self.frames.next().map(|p| Frame::from_path(&p))
    }
}

/// Pick a source for a path: directory, still image, or unsupported.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>, VisionError> {
    if path.is_dir() {
        Ok(Box::new(DirectorySource::open(path)?))
    } else if is_still_image(path) {
        Ok(Box::new(StillImageSource::new(path)))
    } else {
        Err(VisionError::UnsupportedSource(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(path: &Path) {
        RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]))
            .save(path)
            .expect("save png");
    }

    #[test]
    fn test_still_image_detection() {
        assert!(is_still_image(Path::new("deck.JPG")));
        assert!(is_still_image(Path::new("a/b/pier.webp")));
        assert!(!is_still_image(Path::new("survey.mp4")));
        assert!(!is_still_image(Path::new("no_extension")));
    }

    #[test]
    fn test_still_image_yields_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("deck.png");
        write_png(&path);
        let mut source = StillImageSource::new(&path);
        assert!(!source.is_stream());
        assert!(source.next_frame().expect("one frame").is_ok());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_directory_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_png(&dir.path().join("frame_002.png"));
        write_png(&dir.path().join("frame_001.png"));
        std::fs::write(dir.path().join("notes.txt"), "skip me").expect("write");

        let mut source = DirectorySource::open(dir.path()).expect("open");
        assert_eq!(source.remaining(), 2);
        assert!(source.is_stream());
        assert!(source.next_frame().expect("frame").is_ok());
        assert!(source.next_frame().expect("frame").is_ok());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_corrupt_frame_is_per_frame_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bad.jpg"), b"not a jpeg").expect("write");
        let mut source = open_source(dir.path()).expect("open");
        assert!(matches!(
            source.next_frame(),
            Some(Err(VisionError::Decode { .. }))
        ));
    }

    #[test]
    fn test_video_file_is_unsupported() {
        assert!(matches!(
            open_source(Path::new("inspection.mp4")),
            Err(VisionError::UnsupportedSource(_))
        ));
    }
}
