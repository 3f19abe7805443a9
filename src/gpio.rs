//! Digital I/O through the Linux sysfs GPIO interface
//!
//! The indicator LED is an output, the vibration switch an input. Both are
//! behind small traits so the edge loop can be driven by test doubles.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("Failed to export GPIO {pin}: {source}")]
    Export { pin: u32, source: std::io::Error },

    #[error("Failed to set direction of GPIO {pin}: {source}")]
    Direction { pin: u32, source: std::io::Error },

    #[error("GPIO {pin} value I/O failed: {source}")]
    Value { pin: u32, source: std::io::Error },

    #[error("GPIO {pin} returned unexpected value '{value}'")]
    BadValue { pin: u32, value: String },
}

/// A pin the node drives.
pub trait DigitalOutput: Send {
    fn write(&mut self, high: bool) -> Result<(), GpioError>;

    /// Return the pin to a safe state at shutdown.
    fn release(&mut self) -> Result<(), GpioError> {
        Ok(())
    }
}

/// A pin the node samples.
pub trait DigitalInput: Send {
    fn read(&mut self) -> Result<bool, GpioError>;

    fn release(&mut self) -> Result<(), GpioError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// One exported pin under a sysfs GPIO root (normally `/sys/class/gpio`).
#[derive(Debug)]
pub struct SysfsPin {
    root: PathBuf,
    pin: u32,
    direction: Direction,
    exported_here: bool,
}

impl SysfsPin {
    /// Export the pin (unless something already did) and set its direction.
    /// Outputs start low.
    pub fn open(root: &Path, pin: u32, direction: Direction) -> Result<Self, GpioError> {
        let pin_dir = root.join(format!("gpio{pin}"));
        let exported_here = if pin_dir.exists() {
            false
        } else {
            std::fs::write(root.join("export"), pin.to_string())
                .map_err(|source| GpioError::Export { pin, source })?;
            true
        };

        let dir_value = match direction {
            Direction::In => "in",
            // "low" sets output and drives it low in one write
            Direction::Out => "low",
        };
        std::fs::write(pin_dir.join("direction"), dir_value)
            .map_err(|source| GpioError::Direction { pin, source })?;

        tracing::debug!(pin, ?direction, exported_here, "[GPIO] pin ready");
        Ok(Self {
            root: root.to_path_buf(),
            pin,
            direction,
            exported_here,
        })
    }

    pub fn output(root: &Path, pin: u32) -> Result<Self, GpioError> {
        Self::open(root, pin, Direction::Out)
    }

    pub fn input(root: &Path, pin: u32) -> Result<Self, GpioError> {
        Self::open(root, pin, Direction::In)
    }

    pub const fn pin(&self) -> u32 {
        self.pin
    }

    fn value_path(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin)).join("value")
    }

    fn unexport(&mut self) -> Result<(), GpioError> {
        if self.exported_here {
            std::fs::write(self.root.join("unexport"), self.pin.to_string())
                .map_err(|source| GpioError::Export { pin: self.pin, source })?;
            self.exported_here = false;
        }
        Ok(())
    }
}

impl DigitalOutput for SysfsPin {
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        std::fs::write(self.value_path(), if high { "1" } else { "0" })
            .map_err(|source| GpioError::Value { pin: self.pin, source })
    }

    fn release(&mut self) -> Result<(), GpioError> {
        if self.direction == Direction::Out {
            DigitalOutput::write(self, false)?;
        }
        self.unexport()
    }
}

impl DigitalInput for SysfsPin {
    fn read(&mut self) -> Result<bool, GpioError> {
        let raw = std::fs::read_to_string(self.value_path())
            .map_err(|source| GpioError::Value { pin: self.pin, source })?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(GpioError::BadValue {
                pin: self.pin,
                value: other.to_string(),
            }),
        }
    }

    fn release(&mut self) -> Result<(), GpioError> {
        self.unexport()
    }
}

// ============================================================================
// In-memory pin
// ============================================================================

/// Pin backed by shared flags, for bench runs and tests. Clones observe
/// and drive the same level.
#[derive(Debug, Clone, Default)]
pub struct MemoryPin {
    level: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl MemoryPin {
    pub fn new(level: bool) -> Self {
        let pin = Self::default();
        pin.set(level);
        pin
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    pub fn set(&self, level: bool) {
        self.level.store(level, Ordering::SeqCst);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl DigitalOutput for MemoryPin {
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        self.set(high);
        Ok(())
    }

    fn release(&mut self) -> Result<(), GpioError> {
        self.set(false);
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl DigitalInput for MemoryPin {
    fn read(&mut self) -> Result<bool, GpioError> {
        Ok(self.level())
    }

    fn release(&mut self) -> Result<(), GpioError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// sysfs stand-in: pre-create gpioN so export is skipped.
    fn fake_root(pins: &[u32]) -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for pin in pins {
            let p = dir.path().join(format!("gpio{pin}"));
            std::fs::create_dir_all(&p).expect("mkdir");
            std::fs::write(p.join("value"), "0\n").expect("seed value");
        }
        dir
    }

    #[test]
    fn test_output_starts_low_and_toggles() {
        let root = fake_root(&[27]);
        let mut led = SysfsPin::output(root.path(), 27).expect("open");
        let dir = std::fs::read_to_string(root.path().join("gpio27/direction")).expect("read");
        assert_eq!(dir, "low");

        DigitalOutput::write(&mut led, true).expect("write");
        let value = std::fs::read_to_string(root.path().join("gpio27/value")).expect("read");
        assert_eq!(value, "1");
    }

    #[test]
    fn test_input_reads_value() {
        let root = fake_root(&[17]);
        let mut switch = SysfsPin::input(root.path(), 17).expect("open");
        assert!(!DigitalInput::read(&mut switch).expect("read"));
        std::fs::write(root.path().join("gpio17/value"), "1\n").expect("write");
        assert!(DigitalInput::read(&mut switch).expect("read"));
    }

    #[test]
    fn test_garbage_value_is_error() {
        let root = fake_root(&[17]);
        let mut switch = SysfsPin::input(root.path(), 17).expect("open");
        std::fs::write(root.path().join("gpio17/value"), "x").expect("write");
        assert!(matches!(
            DigitalInput::read(&mut switch),
            Err(GpioError::BadValue { pin: 17, .. })
        ));
    }

    #[test]
    fn test_release_drives_output_low_and_leaves_foreign_export() {
        let root = fake_root(&[27]);
        let mut led = SysfsPin::output(root.path(), 27).expect("open");
        DigitalOutput::write(&mut led, true).expect("write");
        DigitalOutput::release(&mut led).expect("release");
        let value = std::fs::read_to_string(root.path().join("gpio27/value")).expect("read");
        assert_eq!(value, "0");
        // Pin was already exported, so it is not unexported
        assert!(!root.path().join("unexport").exists());
    }

    #[test]
    fn test_memory_pin_shares_level_between_clones() {
        let observer = MemoryPin::default();
        let mut led = observer.clone();
        DigitalOutput::write(&mut led, true).expect("write");
        assert!(observer.level());
        DigitalOutput::release(&mut led).expect("release");
        assert!(!observer.level());
        assert!(observer.is_released());
    }

    #[test]
    fn test_export_when_missing() {
        let root = tempfile::tempdir().expect("tempdir");
        // Real sysfs creates gpioN on export; a plain directory does not,
        // so direction setup fails after the export write.
        let result = SysfsPin::input(root.path(), 4);
        assert!(matches!(result, Err(GpioError::Direction { pin: 4, .. })));
        let exported = std::fs::read_to_string(root.path().join("export")).expect("read");
        assert_eq!(exported, "4");
    }
}
