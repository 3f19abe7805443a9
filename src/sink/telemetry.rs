//! Telemetry records and the REST push store

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::SinkError;
use crate::config::defaults::TIMESTAMP_FORMAT;
use crate::config::TelemetryConfig;
use crate::sensors::Orientation;
use crate::transport::{RemoteVerdict, Token};

/// One sampled tick as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub time: String,
    /// 0 = normal, 1 = detected
    pub vibration: u8,
    pub roll: f64,
    pub pitch: f64,
    pub verdict: Option<Token>,
    pub alerting: bool,
}

impl TelemetryRecord {
    pub fn new(
        at: DateTime<Local>,
        vibration: bool,
        orientation: &Orientation,
        verdict: RemoteVerdict,
        alerting: bool,
    ) -> Self {
        Self {
            time: at.format(TIMESTAMP_FORMAT).to_string(),
            vibration: u8::from(vibration),
            roll: round2(orientation.roll),
            pitch: round2(orientation.pitch),
            verdict: verdict.token(),
            alerting,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn push_record(&self, record: &TelemetryRecord) -> Result<(), SinkError>;
}

/// Pushes records to a Firebase-style REST collection:
/// `POST {database_url}/{path}.json?auth={token}` appends a child.
pub struct RestTelemetrySink {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl RestTelemetrySink {
    pub fn new(config: &TelemetryConfig) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let endpoint = format!(
            "{}/{}.json",
            config.database_url.trim_end_matches('/'),
            config.path.trim_matches('/')
        );
        Ok(Self {
            http,
            endpoint,
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TelemetrySink for RestTelemetrySink {
    async fn push_record(&self, record: &TelemetryRecord) -> Result<(), SinkError> {
        let mut req = self.http.post(&self.endpoint).json(record);
        if let Some(token) = &self.auth_token {
            req = req.query(&[("auth", token)]);
        }
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SinkError::Status(resp.status()))
        }
    }
}

/// Used when telemetry is disabled.
pub struct NullTelemetrySink;

#[async_trait]
impl TelemetrySink for NullTelemetrySink {
    async fn push_record(&self, _record: &TelemetryRecord) -> Result<(), SinkError> {
        Ok(())
    }
}
