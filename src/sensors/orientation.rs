//! Orientation estimation from a gravity vector
//!
//! The accelerometer is assumed static, so the measured acceleration is
//! gravity alone and the tilt angles follow from its direction:
//!
//! - roll  = atan2(y, sqrt(x² + z²))
//! - pitch = -atan2(x, sqrt(y² + z²))
//!
//! Both are reported in degrees. Roll and pitch are therefore always in
//! [-90, 90] and never NaN for finite input.

use serde::{Deserialize, Serialize};

use crate::config::defaults::{ACCEL_SENSITIVITY_LSB_PER_G, TILT_LIMIT_DEG};

/// Interpret a big-endian register word as a signed 16-bit two's-complement value.
pub const fn decode_twos_complement(word: u16) -> i16 {
    i16::from_be_bytes(word.to_be_bytes())
}

/// Signed accelerometer counts for the three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawAxes {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl RawAxes {
    /// Build from the unsigned words as read off the bus.
    pub const fn from_words(x: u16, y: u16, z: u16) -> Self {
        Self {
            x: decode_twos_complement(x),
            y: decode_twos_complement(y),
            z: decode_twos_complement(z),
        }
    }

    /// Scale to units of g.
    pub fn scaled(self) -> ScaledAccel {
        ScaledAccel {
            x: f64::from(self.x) / ACCEL_SENSITIVITY_LSB_PER_G,
            y: f64::from(self.y) / ACCEL_SENSITIVITY_LSB_PER_G,
            z: f64::from(self.z) / ACCEL_SENSITIVITY_LSB_PER_G,
        }
    }
}

/// Acceleration in g.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaledAccel {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Tilt of the structure in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub accel: ScaledAccel,
}

impl Orientation {
    /// True when either angle is strictly beyond the tilt limit.
    pub fn exceeds_tilt_limit(&self) -> bool {
        self.roll.abs() > TILT_LIMIT_DEG || self.pitch.abs() > TILT_LIMIT_DEG
    }
}

/// Compute roll and pitch from one accelerometer sample.
///
/// An all-zero sample (free fall or a dead sensor) yields roll = pitch = 0
/// since `atan2(0, 0)` is 0.
pub fn estimate(raw: RawAxes) -> Orientation {
    let accel = raw.scaled();
    let roll = accel.y.atan2(accel.x.hypot(accel.z)).to_degrees();
    let pitch = -accel.x.atan2(accel.y.hypot(accel.z)).to_degrees();
    Orientation { roll, pitch, accel }
}
