//! Edge node: sensors, indicator, acceptor and sinks around one tick loop

pub mod node;

pub use node::{EdgeIo, EdgeNode, TickReport};

use tracing::info;

use crate::sink::SinkCounts;

/// Counters reported when the edge node shuts down.
#[derive(Debug, Clone, Default)]
pub struct EdgeStats {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub alert_ticks: u64,
    /// Notifications handed to the notifier
    pub notifications: u64,
    pub tokens_received: u64,
    pub unrecognized_tokens: u64,
    pub peer_disconnects: u64,
    pub indicator_errors: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub telemetry_pushed: u64,
    pub telemetry_failed: u64,
}

impl EdgeStats {
    pub fn absorb_sink_counts(&mut self, counts: SinkCounts) {
        self.notifications_sent = counts.notifications_sent;
        self.notifications_failed = counts.notifications_failed;
        self.telemetry_pushed = counts.telemetry_pushed;
        self.telemetry_failed = counts.telemetry_failed;
    }

    pub fn log_summary(&self) {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Ticks:                {}", self.ticks);
        info!("   Skipped Ticks:        {}", self.skipped_ticks);
        info!("   Alert Ticks:          {}", self.alert_ticks);
        info!("   Notifications:        {} ({} sent, {} failed)", self.notifications, self.notifications_sent, self.notifications_failed);
        info!("   Telemetry:            {} pushed, {} failed", self.telemetry_pushed, self.telemetry_failed);
        info!("   Tokens Received:      {}", self.tokens_received);
        info!("   Unrecognized Tokens:  {}", self.unrecognized_tokens);
        info!("   Peer Disconnects:     {}", self.peer_disconnects);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}
