//! Config validation: unknown-key detection with Levenshtein suggestions
//! and hardware/network range checks.
//!
//! The raw TOML is first walked as a `toml::Value` tree and compared against
//! the known field names, emitting warnings with "did you mean?" suggestions.
//! Normal serde deserialization follows. Unknown keys never fail a load.

use std::collections::HashSet;
use std::net::SocketAddr;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `BridgeConfig`.
///
/// Kept by hand in step with bridge_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [node]
        "node",
        "node.name",
        "node.tick_interval_ms",
        // [sensor]
        "sensor",
        "sensor.i2c_bus",
        "sensor.address",
        // [gpio]
        "gpio",
        "gpio.sysfs_root",
        "gpio.indicator_pin",
        "gpio.vibration_pin",
        // [transport]
        "transport",
        "transport.enabled",
        "transport.bind_addr",
        "transport.peer_host",
        "transport.peer_port",
        "transport.receive_timeout_ms",
        "transport.connect_timeout_secs",
        // [notify]
        "notify",
        "notify.enabled",
        "notify.smtp_host",
        "notify.smtp_port",
        "notify.username",
        "notify.password",
        "notify.from",
        "notify.recipient",
        "notify.renotify_interval_secs",
        // [telemetry]
        "telemetry",
        "telemetry.enabled",
        "telemetry.database_url",
        "telemetry.path",
        "telemetry.auth_token",
        "telemetry.timeout_secs",
        // [vision]
        "vision",
        "vision.model_path",
        "vision.input_size",
        "vision.channel_order",
        "vision.frame_interval_ms",
        "vision.annotate_dir",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are reported by serde
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate hardware and network ranges on a parsed `BridgeConfig`.
///
/// Returns (errors, warnings): errors must prevent startup, warnings are
/// suspicious but workable.
pub fn validate_ranges(config: &super::BridgeConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // 7-bit addressing; 0x00-0x02 and 0x78-0x7F are reserved
    let addr = config.sensor.address;
    if !(0x03..=0x77).contains(&addr) {
        errors.push(format!(
            "sensor.address = {addr:#04x} is outside the 7-bit I2C range (0x03-0x77)"
        ));
    }

    if config.transport.enabled && config.transport.bind_addr.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "transport.bind_addr = '{}' is not a valid socket address",
            config.transport.bind_addr
        ));
    }

    if config.telemetry.enabled
        && !config.telemetry.database_url.trim().is_empty()
        && !config.telemetry.database_url.starts_with("http://")
        && !config.telemetry.database_url.starts_with("https://")
    {
        errors.push(format!(
            "telemetry.database_url = '{}' must start with http:// or https://",
            config.telemetry.database_url
        ));
    }

    if config.node.tick_interval_ms > 0 && config.node.tick_interval_ms < 100 {
        warnings.push(ValidationWarning {
            field: "node.tick_interval_ms".to_string(),
            message: format!(
                "node.tick_interval_ms = {} samples faster than alerts can be delivered",
                config.node.tick_interval_ms
            ),
            suggestion: None,
        });
    }

    if config.vision.frame_interval_ms == 0 {
        warnings.push(ValidationWarning {
            field: "vision.frame_interval_ms".to_string(),
            message: "vision.frame_interval_ms = 0 sends one verdict per decoded frame"
                .to_string(),
            suggestion: None,
        });
    }

    if config.notify.enabled && config.notify.password.is_empty() {
        warnings.push(ValidationWarning {
            field: "notify.password".to_string(),
            message: "notify.password is empty; set BRIDGE_SMTP_PASSWORD".to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
