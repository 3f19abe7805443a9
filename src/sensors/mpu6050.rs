//! MPU-6050 accelerometer driver over Linux i2c-dev

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use super::orientation::RawAxes;
use super::SensorError;
use crate::config::defaults::{ACCEL_XOUT_H, ACCEL_YOUT_H, ACCEL_ZOUT_H, PWR_MGMT_1};

/// `I2C_SLAVE` request from linux/i2c-dev.h
const I2C_SLAVE: u16 = 0x0703;

// ============================================================================
// Bus Abstraction
// ============================================================================

/// Byte-wide register access on a single slave device.
pub trait RegisterBus: Send {
    fn read_byte(&mut self, register: u8) -> Result<u8, SensorError>;
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), SensorError>;
}

/// Anything that can produce one three-axis accelerometer sample.
pub trait AccelSource: Send {
    fn read_raw_axes(&mut self) -> Result<RawAxes, SensorError>;
}

/// `/dev/i2c-N` bound to one slave address.
pub struct I2cBus {
    file: File,
    path: PathBuf,
    address: u16,
}

impl I2cBus {
    /// Open the bus device and select the slave address.
    pub fn open(path: &Path, address: u16) -> Result<Self, SensorError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| SensorError::BusOpen {
                path: path.to_path_buf(),
                source,
            })?;

        #[allow(unsafe_code)]
        // SAFETY: the fd is owned by `file` and open for the duration of the call;
        // I2C_SLAVE takes the address by value.
        let rc = unsafe {
            libc::ioctl(file.as_raw_fd(), I2C_SLAVE.into(), libc::c_ulong::from(address))
        };
        if rc < 0 {
            return Err(SensorError::AddressSelect {
                address,
                source: std::io::Error::last_os_error(),
            });
        }

        tracing::debug!(path = %path.display(), address = %format!("{address:#04x}"), "[Sensor] I2C bus open");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            address,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn address(&self) -> u16 {
        self.address
    }
}

impl RegisterBus for I2cBus {
    fn read_byte(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.file
            .write_all(&[register])
            .and_then(|()| self.file.read_exact(&mut buf))
            .map_err(|source| SensorError::Read { register, source })?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.file
            .write_all(&[register, value])
            .map_err(|source| SensorError::Write { register, source })
    }
}

// ============================================================================
// Device
// ============================================================================

/// MPU-6050 at its power-on ±2 g range.
pub struct Mpu6050<B> {
    bus: B,
}

impl<B: RegisterBus> Mpu6050<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Take the device out of sleep. Callers should wait
    /// `SENSOR_WAKE_SETTLE_MS` before the first sample.
    pub fn wake(&mut self) -> Result<(), SensorError> {
        self.bus.write_byte(PWR_MGMT_1, 0)
    }

    /// Read the big-endian word whose high byte is at `register`.
    pub fn read_word(&mut self, register: u8) -> Result<u16, SensorError> {
        let low_register = register
            .checked_add(1)
            .ok_or(SensorError::WordOutOfRange(register))?;
        let high = self.bus.read_byte(register)?;
        let low = self.bus.read_byte(low_register)?;
        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: RegisterBus> AccelSource for Mpu6050<B> {
    fn read_raw_axes(&mut self) -> Result<RawAxes, SensorError> {
        let x = self.read_word(ACCEL_XOUT_H)?;
        let y = self.read_word(ACCEL_YOUT_H)?;
        let z = self.read_word(ACCEL_ZOUT_H)?;
        Ok(RawAxes::from_words(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBus {
        registers: HashMap<u8, u8>,
        writes: Vec<(u8, u8)>,
        fail_reads: bool,
    }

    impl RegisterBus for FakeBus {
        fn read_byte(&mut self, register: u8) -> Result<u8, SensorError> {
            if self.fail_reads {
                return Err(SensorError::Read {
                    register,
                    source: std::io::Error::new(std::io::ErrorKind::Other, "nack"),
                });
            }
            Ok(self.registers.get(&register).copied().unwrap_or(0))
        }

        fn write_byte(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
            self.writes.push((register, value));
            self.registers.insert(register, value);
            Ok(())
        }
    }

    #[test]
    fn test_wake_clears_power_management() {
        let mut dev = Mpu6050::new(FakeBus::default());
        dev.wake().expect("wake");
        assert_eq!(dev.into_inner().writes, vec![(0x6B, 0)]);
    }

    #[test]
    fn test_read_word_is_high_then_low() {
        let mut bus = FakeBus::default();
        bus.registers.insert(0x3B, 0x12);
        bus.registers.insert(0x3C, 0x34);
        let mut dev = Mpu6050::new(bus);
        assert_eq!(dev.read_word(0x3B).expect("read"), 0x1234);
    }

    #[test]
    fn test_read_word_at_last_register_is_error() {
        let mut dev = Mpu6050::new(FakeBus::default());
        assert!(matches!(
            dev.read_word(0xFF),
            Err(SensorError::WordOutOfRange(0xFF))
        ));
    }

    #[test]
    fn test_read_raw_axes_decodes_signed() {
        let mut bus = FakeBus::default();
        // x = -1, y = 0, z = +1 g
        bus.registers.insert(0x3B, 0xFF);
        bus.registers.insert(0x3C, 0xFF);
        bus.registers.insert(0x3F, 0x40);
        bus.registers.insert(0x40, 0x00);
        let mut dev = Mpu6050::new(bus);
        let raw = dev.read_raw_axes().expect("read");
        assert_eq!(raw, RawAxes { x: -1, y: 0, z: 16_384 });
    }

    #[test]
    fn test_read_failure_propagates() {
        let bus = FakeBus {
            fail_reads: true,
            ..FakeBus::default()
        };
        let mut dev = Mpu6050::new(bus);
        assert!(matches!(
            dev.read_raw_axes(),
            Err(SensorError::Read { register: 0x3B, .. })
        ));
    }

    #[test]
    fn test_open_missing_bus_is_error() {
        let result = I2cBus::open(Path::new("/nonexistent/i2c-9"), 0x69);
        assert!(matches!(result, Err(SensorError::BusOpen { .. })));
    }
}
