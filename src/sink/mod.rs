//! Best-effort outputs: telemetry push and alert email
//!
//! Both run as detached tasks so a slow or unreachable remote never delays
//! a tick. Failures are logged and counted, nothing more.

pub mod notifier;
pub mod telemetry;

pub use notifier::{LogNotifier, Notifier, SmtpNotifier};
pub use telemetry::{NullTelemetrySink, RestTelemetrySink, TelemetryRecord, TelemetrySink};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::alert::Notification;
use crate::config::BridgeConfig;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
}

#[derive(Debug, Default)]
struct Counters {
    telemetry_pushed: AtomicU64,
    telemetry_failed: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
}

/// Point-in-time copy of the sink counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkCounts {
    pub telemetry_pushed: u64,
    pub telemetry_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
}

/// Telemetry store plus alert notifier, dispatched off the tick path.
pub struct Sinks {
    telemetry: Arc<dyn TelemetrySink>,
    notifier: Arc<dyn Notifier>,
    recipient: Arc<str>,
    counters: Arc<Counters>,
    tasks: TaskTracker,
}

impl Sinks {
    pub fn new(
        telemetry: Arc<dyn TelemetrySink>,
        notifier: Arc<dyn Notifier>,
        recipient: &str,
    ) -> Self {
        Self {
            telemetry,
            notifier,
            recipient: Arc::from(recipient),
            counters: Arc::new(Counters::default()),
            tasks: TaskTracker::new(),
        }
    }

    /// Build from config. A sink that fails to initialise is replaced by its
    /// no-op counterpart with a warning; sinks never stop the node.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let telemetry: Arc<dyn TelemetrySink> = if config.telemetry.enabled {
            match RestTelemetrySink::new(&config.telemetry) {
                Ok(sink) => {
                    info!(endpoint = %sink.endpoint(), "[Telemetry] REST push enabled");
                    Arc::new(sink)
                }
                Err(e) => {
                    warn!(error = %e, "[Telemetry] Client init failed, telemetry disabled");
                    Arc::new(NullTelemetrySink)
                }
            }
        } else {
            info!("[Telemetry] Disabled");
            Arc::new(NullTelemetrySink)
        };

        let notifier: Arc<dyn Notifier> = if config.notify.enabled {
            match SmtpNotifier::new(&config.notify) {
                Ok(n) => {
                    info!(host = %config.notify.smtp_host, port = config.notify.smtp_port, "[Notifier] SMTP alerts enabled");
                    Arc::new(n)
                }
                Err(e) => {
                    warn!(error = %e, "[Notifier] SMTP init failed, alerts will be logged only");
                    Arc::new(LogNotifier)
                }
            }
        } else {
            info!("[Notifier] Email disabled, alerts will be logged only");
            Arc::new(LogNotifier)
        };

        Self::new(telemetry, notifier, &config.notify.recipient)
    }

    /// Push one record in the background.
    pub fn push_telemetry(&self, record: TelemetryRecord) {
        let sink = Arc::clone(&self.telemetry);
        let counters = Arc::clone(&self.counters);
        self.tasks.spawn(async move {
            match sink.push_record(&record).await {
                Ok(()) => {
                    counters.telemetry_pushed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.telemetry_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, time = %record.time, "[Telemetry] Push failed");
                }
            }
        });
    }

    /// Send one alert in the background.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        let counters = Arc::clone(&self.counters);
        let recipient = Arc::clone(&self.recipient);
        self.tasks.spawn(async move {
            match notifier
                .send_alert(&notification.subject, &notification.body, &recipient)
                .await
            {
                Ok(()) => {
                    counters.notifications_sent.fetch_add(1, Ordering::Relaxed);
                    info!(kind = ?notification.kind, "📧 [Notifier] Alert sent");
                }
                Err(e) => {
                    counters.notifications_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(kind = ?notification.kind, error = %e, "[Notifier] Alert dispatch failed");
                }
            }
        });
    }

    pub fn counts(&self) -> SinkCounts {
        SinkCounts {
            telemetry_pushed: self.counters.telemetry_pushed.load(Ordering::Relaxed),
            telemetry_failed: self.counters.telemetry_failed.load(Ordering::Relaxed),
            notifications_sent: self.counters.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.counters.notifications_failed.load(Ordering::Relaxed),
        }
    }

    /// Wait up to `limit` for in-flight dispatches. Returns false if some
    /// were still running.
    pub async fn drain(&self, limit: Duration) -> bool {
        self.tasks.close();
        let finished = tokio::time::timeout(limit, self.tasks.wait()).await.is_ok();
        if !finished {
            warn!(pending = self.tasks.len(), "[Sinks] Shutdown drain timed out");
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::NotificationKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send_alert(
            &self,
            subject: &str,
            _body: &str,
            recipient: &str,
        ) -> Result<(), SinkError> {
            self.sent
                .lock()
                .expect("lock")
                .push((subject.to_string(), recipient.to_string()));
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl TelemetrySink for Unreachable {
        async fn push_record(&self, _record: &TelemetryRecord) -> Result<(), SinkError> {
            Err(SinkError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        }
    }

    fn record() -> TelemetryRecord {
        TelemetryRecord {
            time: "2024-03-09 14:05:07".to_string(),
            vibration: 0,
            roll: 0.0,
            pitch: 0.0,
            verdict: None,
            alerting: false,
        }
    }

    #[tokio::test]
    async fn test_dispatch_addresses_recipient() {
        let recorder = Arc::new(Recorder::default());
        let sinks = Sinks::new(Arc::new(NullTelemetrySink), recorder.clone(), "ops@example.com");
        sinks.dispatch(Notification::crack());
        assert!(sinks.drain(Duration::from_secs(1)).await);

        let sent = recorder.sent.lock().expect("lock");
        assert_eq!(
            *sent,
            vec![("Bridge Crack Alert".to_string(), "ops@example.com".to_string())]
        );
        assert_eq!(sinks.counts().notifications_sent, 1);
        assert_eq!(Notification::crack().kind, NotificationKind::Crack);
    }

    #[tokio::test]
    async fn test_telemetry_failure_is_counted_not_raised() {
        let sinks = Sinks::new(Arc::new(Unreachable), Arc::new(LogNotifier), "");
        sinks.push_telemetry(record());
        sinks.push_telemetry(record());
        assert!(sinks.drain(Duration::from_secs(1)).await);
        let counts = sinks.counts();
        assert_eq!(counts.telemetry_failed, 2);
        assert_eq!(counts.telemetry_pushed, 0);
    }

    #[test]
    fn test_from_config_defaults_to_noop_sinks() {
        let sinks = Sinks::from_config(&BridgeConfig::default());
        assert_eq!(sinks.counts(), SinkCounts::default());
    }
}
