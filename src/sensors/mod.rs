//! Inertial sensing
//!
//! Reads the MPU-6050 accelerometer over I2C and turns raw axis words into
//! roll and pitch angles.

pub mod mpu6050;
pub mod orientation;

pub use mpu6050::{AccelSource, I2cBus, Mpu6050, RegisterBus};
pub use orientation::{decode_twos_complement, estimate, Orientation, RawAxes, ScaledAccel};

use std::path::PathBuf;
use thiserror::Error;

/// Sensor bus errors
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Failed to open I2C bus {path}: {source}")]
    BusOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to select I2C address {address:#04x}: {source}")]
    AddressSelect {
        address: u16,
        source: std::io::Error,
    },

    #[error("Register {register:#04x} read failed: {source}")]
    Read {
        register: u8,
        source: std::io::Error,
    },

    #[error("Register {register:#04x} write failed: {source}")]
    Write {
        register: u8,
        source: std::io::Error,
    },

    #[error("Register {0:#04x} has no low byte after it")]
    WordOutOfRange(u8),
}
