//! System-wide default constants.
//!
//! Fixed decision constants live here rather than in `BridgeConfig`:
//! the alert thresholds are part of the monitor's contract and are not
//! operator-tunable. Grouped by subsystem for easy discovery.

// ============================================================================
// Inertial Sensor (MPU-6050)
// ============================================================================

/// Accelerometer sensitivity at the power-on full-scale range (±2 g).
///
/// 16 384 counts per g reproduces the reference device calibration.
pub const ACCEL_SENSITIVITY_LSB_PER_G: f64 = 16_384.0;

/// Power management register; writing 0 takes the device out of sleep.
pub const PWR_MGMT_1: u8 = 0x6B;

/// High byte of the X-axis accelerometer word (low byte at +1).
pub const ACCEL_XOUT_H: u8 = 0x3B;

/// High byte of the Y-axis accelerometer word (low byte at +1).
pub const ACCEL_YOUT_H: u8 = 0x3D;

/// High byte of the Z-axis accelerometer word (low byte at +1).
pub const ACCEL_ZOUT_H: u8 = 0x3F;

/// Settle time after waking the device before the first read (ms).
pub const SENSOR_WAKE_SETTLE_MS: u64 = 100;

// ============================================================================
// Alert Aggregation
// ============================================================================

/// Absolute roll or pitch above which the structure is considered tilted (degrees).
pub const TILT_LIMIT_DEG: f64 = 30.0;

// ============================================================================
// Vision
// ============================================================================

/// Classifier score strictly above this value is a crack.
pub const CRACK_SCORE_THRESHOLD: f32 = 0.5;

/// File extensions treated as a single still image rather than a frame stream.
pub const STILL_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Border width drawn around annotated frames (pixels).
pub const ANNOTATION_BORDER_PX: u32 = 6;

// ============================================================================
// Transport
// ============================================================================

/// Default TCP port shared by both nodes.
pub const DEFAULT_TRANSPORT_PORT: u16 = 5000;

/// Receive buffer for one non-blocking poll. Tokens are at most 6 bytes;
/// anything longer is coalesced traffic and is treated as unrecognized.
pub const RECEIVE_BUFFER_SIZE: usize = 1024;

/// TCP keepalive idle time on the initiator socket (seconds).
pub const KEEPALIVE_IDLE_SECS: u64 = 30;

/// TCP keepalive probe interval on the initiator socket (seconds).
pub const KEEPALIVE_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Telemetry / Notifications
// ============================================================================

/// Timestamp layout used in telemetry records and alert bodies.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SMTP command timeout (seconds).
pub const SMTP_TIMEOUT_SECS: u64 = 30;

/// How long shutdown waits for in-flight telemetry/notification tasks (ms).
pub const SHUTDOWN_DRAIN_MS: u64 = 2_000;
