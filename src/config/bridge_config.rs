//! Bridge Configuration - deployment settings as operator-tunable TOML values
//!
//! Each struct implements `Default` with the values the monitor ships with,
//! so an empty or missing file behaves exactly like the stock deployment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults::DEFAULT_TRANSPORT_PORT;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "BRIDGE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "bridge_config.toml";

/// Overrides `notify.password` so credentials stay out of the file.
pub const SMTP_PASSWORD_ENV_VAR: &str = "BRIDGE_SMTP_PASSWORD";

/// Overrides `telemetry.auth_token`.
pub const TELEMETRY_TOKEN_ENV_VAR: &str = "BRIDGE_TELEMETRY_TOKEN";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a bridge deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Node identification and sampling period
    #[serde(default)]
    pub node: NodeConfig,

    /// Inertial sensor bus
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Indicator and vibration pins
    #[serde(default)]
    pub gpio: GpioConfig,

    /// Link between the edge node and the vision node
    #[serde(default)]
    pub transport: TransportConfig,

    /// Alert email
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Remote telemetry store
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Crack classifier
    #[serde(default)]
    pub vision: VisionConfig,
}

impl BridgeConfig {
    /// Load configuration.
    ///
    /// An explicit path (from `--config`) is used as given. Otherwise the
    /// search order is `$BRIDGE_CONFIG`, then `./bridge_config.toml`, then
    /// defaults. Any candidate file that exists must parse and validate;
    /// defaults apply only when there is no file at all.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
        Self::resolve(explicit, env_path.as_deref(), Path::new(LOCAL_CONFIG_FILE))
    }

    fn resolve(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        local: &Path,
    ) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                let config = Self::load_from_file(path)?;
                info!(path = %path.display(), node = %config.node.name, "Loaded bridge config");
                config
            }
            None => Self::search(env_path, local)?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn search(env_path: Option<&Path>, local: &Path) -> Result<Self, ConfigError> {
        // 1. Check env var
        if let Some(p) = env_path {
            if p.exists() {
                let config = Self::load_from_file(p)?;
                info!(path = %p.display(), node = %config.node.name, "Loaded bridge config from BRIDGE_CONFIG");
                return Ok(config);
            }
            warn!(path = %p.display(), "BRIDGE_CONFIG points to non-existent file, falling back");
        }

        // 2. Check ./bridge_config.toml
        if local.exists() {
            let config = Self::load_from_file(local)?;
            info!(path = %local.display(), node = %config.node.name, "Loaded bridge config");
            return Ok(config);
        }

        // 3. Defaults
        info!("No bridge_config.toml found, using built-in defaults");
        Ok(Self::default())
    }

    /// Read and parse a TOML file. Validation is left to [`load`](Self::load),
    /// which runs it once after the environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse_toml(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are warned about, not rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_toml(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))
    }

    /// Replace secrets with values from the environment when present.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(SMTP_PASSWORD_ENV_VAR) {
            if !password.is_empty() {
                self.notify.password = password;
            }
        }
        if let Ok(token) = std::env::var(TELEMETRY_TOKEN_ENV_VAR) {
            if !token.is_empty() {
                self.telemetry.auth_token = Some(token);
            }
        }
    }

    /// Validate all settings for internal consistency.
    ///
    /// Collects every problem rather than stopping at the first, then adds
    /// the hard range errors from [`validation::validate_ranges`](super::validation::validate_ranges).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.node.tick_interval_ms == 0 {
            errors.push("node.tick_interval_ms must be > 0".to_string());
        }
        if self.transport.receive_timeout_ms == 0 {
            errors.push("transport.receive_timeout_ms must be > 0".to_string());
        }
        if self.transport.receive_timeout_ms >= self.node.tick_interval_ms {
            errors.push(format!(
                "transport.receive_timeout_ms ({}) must be less than node.tick_interval_ms ({})",
                self.transport.receive_timeout_ms, self.node.tick_interval_ms
            ));
        }
        if self.transport.peer_port == 0 {
            errors.push("transport.peer_port must be > 0".to_string());
        }
        if self.gpio.indicator_pin == self.gpio.vibration_pin {
            errors.push(format!(
                "gpio.indicator_pin and gpio.vibration_pin must differ (both {})",
                self.gpio.indicator_pin
            ));
        }
        if self.notify.enabled {
            if self.notify.smtp_host.trim().is_empty() {
                errors.push("notify.smtp_host is required when notify.enabled = true".to_string());
            }
            if self.notify.smtp_port == 0 {
                errors.push("notify.smtp_port must be > 0".to_string());
            }
            if self.notify.recipient.trim().is_empty() {
                errors.push("notify.recipient is required when notify.enabled = true".to_string());
            }
        }
        if self.telemetry.enabled && self.telemetry.database_url.trim().is_empty() {
            errors.push(
                "telemetry.database_url is required when telemetry.enabled = true".to_string(),
            );
        }
        if self.vision.input_size == 0 {
            errors.push("vision.input_size must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Node
// ============================================================================

/// Identification and sampling period. The name appears in logs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_name")]
    pub name: String,

    /// Sampling loop period (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_node_name() -> String {
    "bridge-01".to_string()
}
const fn default_tick_interval_ms() -> u64 {
    1_000
}

impl NodeConfig {
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

// ============================================================================
// Sensor
// ============================================================================

/// MPU-6050 bus location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Linux I2C character device
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: PathBuf,

    /// 7-bit slave address (0x68 with AD0 low, 0x69 with AD0 high)
    #[serde(default = "default_sensor_address")]
    pub address: u16,
}

fn default_i2c_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-1")
}
const fn default_sensor_address() -> u16 {
    0x69
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            address: default_sensor_address(),
        }
    }
}

// ============================================================================
// GPIO
// ============================================================================

/// BCM pin numbers for the indicator LED (output) and vibration switch (input).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    #[serde(default = "default_indicator_pin")]
    pub indicator_pin: u32,

    #[serde(default = "default_vibration_pin")]
    pub vibration_pin: u32,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}
const fn default_indicator_pin() -> u32 {
    27
}
const fn default_vibration_pin() -> u32 {
    17
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            indicator_pin: default_indicator_pin(),
            vibration_pin: default_vibration_pin(),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Edge node listens on `bind_addr`; the vision node dials `peer_host:peer_port`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// When false the edge node skips the accept gate and runs without a vision link
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_peer_host")]
    pub peer_host: String,

    #[serde(default = "default_peer_port")]
    pub peer_port: u16,

    /// Upper bound on one per-tick receive poll (ms)
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

const fn default_true() -> bool {
    true
}
fn default_bind_addr() -> String {
    format!("0.0.0.0:{DEFAULT_TRANSPORT_PORT}")
}
fn default_peer_host() -> String {
    "127.0.0.1".to_string()
}
const fn default_peer_port() -> u16 {
    DEFAULT_TRANSPORT_PORT
}
const fn default_receive_timeout_ms() -> u64 {
    100
}
const fn default_connect_timeout_secs() -> u64 {
    5
}

impl TransportConfig {
    pub const fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_addr: default_bind_addr(),
            peer_host: default_peer_host(),
            peer_port: default_peer_port(),
            receive_timeout_ms: default_receive_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

// ============================================================================
// Notify
// ============================================================================

/// SMTP alert email settings. Disabled by default; alerts are then only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    /// App password; prefer `BRIDGE_SMTP_PASSWORD`
    #[serde(default)]
    pub password: String,

    /// Sender mailbox; the username is used when empty
    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub recipient: String,

    /// Minimum seconds between two notifications of the same cause.
    /// 0 re-notifies on every tick the condition holds.
    #[serde(default)]
    pub renotify_interval_secs: u64,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
const fn default_smtp_port() -> u16 {
    587
}

impl NotifyConfig {
    /// Sender address, falling back to the login name.
    pub fn sender(&self) -> &str {
        if self.from.trim().is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            recipient: String::new(),
            renotify_interval_secs: 0,
        }
    }
}

// ============================================================================
// Telemetry
// ============================================================================

/// Push-capable REST store (Firebase Realtime Database compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub database_url: String,

    /// Collection records are pushed under
    #[serde(default = "default_telemetry_path")]
    pub path: String,

    /// Database secret or ID token; prefer `BRIDGE_TELEMETRY_TOKEN`
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default = "default_telemetry_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_telemetry_path() -> String {
    "bridge_data".to_string()
}
const fn default_telemetry_timeout_secs() -> u64 {
    10
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database_url: String::new(),
            path: default_telemetry_path(),
            auth_token: None,
            timeout_secs: default_telemetry_timeout_secs(),
        }
    }
}

// ============================================================================
// Vision
// ============================================================================

/// Channel layout the classifier was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// OpenCV-style blue/green/red
    #[default]
    Bgr,
    Rgb,
}

/// Crack classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// ONNX export of the binary crack classifier
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Square input resolution the model expects
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    #[serde(default)]
    pub channel_order: ChannelOrder,

    /// Pause between frames of a stream source (ms)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Save annotated frames here when set
    #[serde(default)]
    pub annotate_dir: Option<PathBuf>,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("crack_detection.onnx")
}
const fn default_input_size() -> u32 {
    227
}
const fn default_frame_interval_ms() -> u64 {
    300
}

impl VisionConfig {
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_size: default_input_size(),
            channel_order: ChannelOrder::default(),
            frame_interval_ms: default_frame_interval_ms(),
            annotate_dir: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
