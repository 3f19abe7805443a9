//! Fixed-period sampling loop of the edge node
//!
//! Per tick, strictly in this order: vibration read, accelerometer read,
//! orientation estimate, receive poll, aggregation, indicator write, alert
//! dispatch, telemetry push. Dispatch and push are detached, so the state
//! for the tick is final before anything leaves the node.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::EdgeStats;
use crate::alert::{AlertAggregator, AlertState, TickInput, TickOutcome};
use crate::config::defaults::{SHUTDOWN_DRAIN_MS, TIMESTAMP_FORMAT};
use crate::gpio::{DigitalInput, DigitalOutput};
use crate::sensors::{estimate, AccelSource, Orientation};
use crate::sink::{Sinks, TelemetryRecord};
use crate::transport::{Acceptor, Received};

/// Physical I/O of the edge node.
pub struct EdgeIo<S, V, L> {
    pub sensor: S,
    pub vibration: V,
    pub indicator: L,
}

/// What happened in one completed tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: DateTime<Local>,
    pub vibration: bool,
    pub orientation: Orientation,
    pub received: Received,
    pub outcome: TickOutcome,
}

pub struct EdgeNode<S, V, L> {
    name: String,
    io: EdgeIo<S, V, L>,
    acceptor: Acceptor,
    aggregator: AlertAggregator,
    sinks: Sinks,
    tick_interval: Duration,
    cancel_token: CancellationToken,
    stats: EdgeStats,
}

impl<S, V, L> EdgeNode<S, V, L>
where
    S: AccelSource,
    V: DigitalInput,
    L: DigitalOutput,
{
    pub fn new(
        name: &str,
        io: EdgeIo<S, V, L>,
        acceptor: Acceptor,
        aggregator: AlertAggregator,
        sinks: Sinks,
        tick_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            name: name.to_string(),
            io,
            acceptor,
            aggregator,
            sinks,
            tick_interval,
            cancel_token,
            stats: EdgeStats::default(),
        }
    }

    pub const fn acceptor(&self) -> &Acceptor {
        &self.acceptor
    }

    pub const fn alert_state(&self) -> AlertState {
        self.aggregator.state()
    }

    pub const fn stats(&self) -> &EdgeStats {
        &self.stats
    }

    /// Block until the vision node connects. Runs once, before the loop.
    ///
    /// Returns false if shutdown was requested while waiting. An acceptor
    /// that is not listening passes straight through.
    pub async fn wait_for_peer(&mut self) -> bool {
        if !self.acceptor.is_listening() {
            info!("[EdgeNode] Running without a vision link");
            return true;
        }
        info!("⏳ [EdgeNode] Waiting for vision node to connect...");
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[EdgeNode] Shutdown requested while waiting for vision node");
                    return false;
                }
                result = self.acceptor.accept_peer() => {
                    match result {
                        Ok(_) => return true,
                        Err(e) => {
                            warn!(error = %e, "[Transport] Accept failed, still waiting");
                            tokio::time::sleep(Duration::from_millis(250)).await;
                        }
                    }
                }
            }
        }
    }

    /// Run one tick. Returns `None` when a sensor read failed and the tick
    /// was skipped; the indicator then keeps its previous level.
    pub async fn tick(&mut self) -> Option<TickReport> {
        let at = Local::now();

        let vibration = match self.io.vibration.read() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "[Sensor] Vibration read failed, tick skipped");
                self.stats.skipped_ticks += 1;
                return None;
            }
        };
        let raw = match self.io.sensor.read_raw_axes() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "[Sensor] Accelerometer read failed, tick skipped");
                self.stats.skipped_ticks += 1;
                return None;
            }
        };
        let orientation = estimate(raw);
        info!(
            "{} | {} | {:.2} | {:.2}",
            at.format(TIMESTAMP_FORMAT),
            u8::from(vibration),
            orientation.roll,
            orientation.pitch
        );

        let received = self.acceptor.receive().await;
        let token = match &received {
            Received::Token(t) => {
                self.stats.tokens_received += 1;
                info!(token = %t, "[EdgeNode] Vision verdict received");
                Some(*t)
            }
            Received::Unrecognized(_) => {
                self.stats.unrecognized_tokens += 1;
                None
            }
            Received::PeerClosed => {
                self.stats.peer_disconnects += 1;
                None
            }
            Received::Empty => None,
        };

        let outcome = self.aggregator.evaluate(&TickInput {
            at,
            vibration,
            orientation,
            verdict: self.acceptor.verdict(),
            received: token,
        });

        if outcome.entered_alert() {
            warn!(signals = ?outcome.signals.list(), "🚨 [EdgeNode] ALERT raised");
        } else if outcome.cleared() {
            info!("✅ [EdgeNode] Alert cleared");
        }

        if let Err(e) = self.io.indicator.write(outcome.indicator_high) {
            warn!(error = %e, "[GPIO] Indicator write failed");
            self.stats.indicator_errors += 1;
        }

        for notification in &outcome.notifications {
            self.sinks.dispatch(notification.clone());
            self.stats.notifications += 1;
        }
        if outcome.suppressed > 0 {
            debug!(suppressed = outcome.suppressed, "[EdgeNode] Repeat alerts withheld");
        }

        self.sinks.push_telemetry(TelemetryRecord::new(
            at,
            vibration,
            &orientation,
            self.acceptor.verdict(),
            outcome.state == AlertState::Alerting,
        ));

        self.stats.ticks += 1;
        if outcome.state == AlertState::Alerting {
            self.stats.alert_ticks += 1;
        }

        Some(TickReport {
            at,
            vibration,
            orientation,
            received,
            outcome,
        })
    }

    /// Tick at the configured period until cancelled or `max_ticks` ticks
    /// (completed or skipped) have run, then shut down.
    pub async fn run(mut self, max_ticks: Option<u64>) -> EdgeStats {
        info!(
            node = %self.name,
            interval_ms = self.tick_interval.as_millis(),
            "📊 [EdgeNode] Sampling started"
        );
        info!("Timestamp           | Vibration | Roll | Pitch");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!("[EdgeNode] Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {}
            }

            self.tick().await;

            if max_ticks.is_some_and(|max| self.stats.ticks + self.stats.skipped_ticks >= max) {
                info!("[EdgeNode] Tick limit reached");
                break;
            }
        }

        self.shutdown().await;
        self.stats.log_summary();
        self.stats
    }

    /// Close the link, release the pins, let in-flight alerts finish.
    /// Called by [`run`](Self::run); call directly only when the loop never started.
    pub async fn shutdown(&mut self) {
        self.acceptor.close().await;

        if let Err(e) = self.io.indicator.release() {
            warn!(error = %e, "[GPIO] Failed to release indicator");
        }
        if let Err(e) = self.io.vibration.release() {
            warn!(error = %e, "[GPIO] Failed to release vibration input");
        }

        self.sinks
            .drain(Duration::from_millis(SHUTDOWN_DRAIN_MS))
            .await;
        self.stats.absorb_sink_counts(self.sinks.counts());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{GpioError, MemoryPin};
    use crate::sensors::{RawAxes, SensorError};
    use crate::sink::{LogNotifier, NullTelemetrySink};
    use crate::transport::{RemoteVerdict, Token};
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    struct FixedAxes(RawAxes);

    impl AccelSource for FixedAxes {
        fn read_raw_axes(&mut self) -> Result<RawAxes, SensorError> {
            Ok(self.0)
        }
    }

    struct BrokenSwitch;

    impl DigitalInput for BrokenSwitch {
        fn read(&mut self) -> Result<bool, GpioError> {
            Err(GpioError::BadValue {
                pin: 17,
                value: String::new(),
            })
        }
    }

    const LEVEL: RawAxes = RawAxes { x: 0, y: 0, z: 16_384 };
    const ROLLED: RawAxes = RawAxes { x: 0, y: 16_384, z: 0 };

    fn sinks() -> Sinks {
        Sinks::new(Arc::new(NullTelemetrySink), Arc::new(LogNotifier), "")
    }

    fn node<V: DigitalInput>(
        axes: RawAxes,
        vibration: V,
        led: MemoryPin,
        acceptor: Acceptor,
    ) -> EdgeNode<FixedAxes, V, MemoryPin> {
        EdgeNode::new(
            "test-bridge",
            EdgeIo {
                sensor: FixedAxes(axes),
                vibration,
                indicator: led,
            },
            acceptor,
            AlertAggregator::new(Duration::ZERO),
            sinks(),
            Duration::from_millis(20),
            CancellationToken::new(),
        )
    }

    fn offline() -> Acceptor {
        Acceptor::disabled(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_level_tick_is_idle() {
        let led = MemoryPin::default();
        let mut edge = node(LEVEL, MemoryPin::new(false), led.clone(), offline());
        let report = edge.tick().await.expect("tick");
        assert_eq!(report.outcome.state, AlertState::Idle);
        assert!(!led.level());
        assert_eq!(edge.stats().ticks, 1);
    }

    #[tokio::test]
    async fn test_tilt_turns_indicator_on() {
        let led = MemoryPin::default();
        let mut edge = node(ROLLED, MemoryPin::new(false), led.clone(), offline());
        let report = edge.tick().await.expect("tick");
        assert!(report.outcome.signals.tilt);
        assert!(led.level());
        assert_eq!(edge.stats().notifications, 1);
    }

    #[tokio::test]
    async fn test_vibration_read_failure_skips_tick() {
        let led = MemoryPin::new(true);
        let mut edge = node(LEVEL, BrokenSwitch, led.clone(), offline());
        assert!(edge.tick().await.is_none());
        assert_eq!(edge.stats().skipped_ticks, 1);
        assert!(led.level(), "indicator holds its level on a skipped tick");
    }

    #[tokio::test]
    async fn test_danger_token_alerts_and_disconnect_clears() {
        let mut acceptor = Acceptor::bind("127.0.0.1:0", Duration::from_millis(50))
            .await
            .expect("bind");
        let addr = acceptor.local_addr().expect("addr");
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), acceptor.accept_peer());
        accepted.expect("accept");
        let mut client = client.expect("connect");

        let led = MemoryPin::default();
        let mut edge = node(LEVEL, MemoryPin::new(false), led.clone(), acceptor);

        client.write_all(Token::Danger.as_bytes()).await.expect("write");
        let report = edge.tick().await.expect("tick");
        assert_eq!(report.received, Received::Token(Token::Danger));
        assert!(led.level());

        drop(client);
        let report = edge.tick().await.expect("tick");
        assert_eq!(report.received, Received::PeerClosed);
        assert_eq!(edge.acceptor().verdict(), RemoteVerdict::Absent);
        assert!(!led.level());
    }

    #[tokio::test]
    async fn test_run_stops_at_tick_limit_and_releases_pins() {
        let led = MemoryPin::default();
        let switch = MemoryPin::new(true);
        let edge = node(LEVEL, switch.clone(), led.clone(), offline());
        let stats = edge.run(Some(3)).await;
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.alert_ticks, 3);
        assert_eq!(stats.notifications, 3);
        assert!(led.is_released());
        assert!(!led.level());
        assert!(switch.is_released());
    }

    #[tokio::test]
    async fn test_cancel_during_peer_wait() {
        let acceptor = Acceptor::bind("127.0.0.1:0", Duration::from_millis(50))
            .await
            .expect("bind");
        let mut edge = node(LEVEL, MemoryPin::new(false), MemoryPin::default(), acceptor);
        edge.cancel_token.cancel();
        assert!(!edge.wait_for_peer().await);
    }
}
