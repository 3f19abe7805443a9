//! Alert message content

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::defaults::TIMESTAMP_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Vibration,
    Tilt,
    Crack,
}

/// Subject and body of one alert. Delivery is the sink's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn vibration(at: DateTime<Local>) -> Self {
        Self {
            kind: NotificationKind::Vibration,
            subject: "Bridge Vibration Alert".to_string(),
            body: format!(
                "High vibration detected on bridge at {}.",
                at.format(TIMESTAMP_FORMAT)
            ),
        }
    }

    pub fn tilt(roll: f64, pitch: f64) -> Self {
        Self {
            kind: NotificationKind::Tilt,
            subject: "Bridge Stability Alert".to_string(),
            body: format!("Unusual tilt detected!\nRoll: {roll:.2}°\nPitch: {pitch:.2}°"),
        }
    }

    pub fn crack() -> Self {
        Self {
            kind: NotificationKind::Crack,
            subject: "Bridge Crack Alert".to_string(),
            body: "A structural crack has been detected. Immediate attention required."
                .to_string(),
        }
    }
}
