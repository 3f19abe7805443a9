//! Idle/Alerting state machine evaluated once per tick
//!
//! Three conditions feed the state: the vibration switch, a tilt beyond the
//! limit, and a DANGER verdict from the vision node. Vibration and tilt are
//! re-read every tick. The crack condition is latched in the remote verdict
//! until a SAFE token arrives or the link drops.
//!
//! Notifications:
//! - vibration, or tilt when there is no vibration: every tick the condition
//!   holds (unless a re-notify window is configured)
//! - crack: every tick a DANGER token is received
//! - SAFE: never; it only clears the crack condition

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::notification::{Notification, NotificationKind};
use crate::sensors::Orientation;
use crate::transport::{RemoteVerdict, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    Idle,
    Alerting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSignal {
    None,
    VibrationDetected,
    TiltExceeded,
    RemoteCrackDetected,
}

/// Conditions active in one tick. Any of them turns the indicator on;
/// they are not ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveSignals {
    pub vibration: bool,
    pub tilt: bool,
    pub remote_crack: bool,
}

impl ActiveSignals {
    pub const fn any(&self) -> bool {
        self.vibration || self.tilt || self.remote_crack
    }

    pub fn list(&self) -> Vec<AlertSignal> {
        let mut out = Vec::with_capacity(3);
        if self.vibration {
            out.push(AlertSignal::VibrationDetected);
        }
        if self.tilt {
            out.push(AlertSignal::TiltExceeded);
        }
        if self.remote_crack {
            out.push(AlertSignal::RemoteCrackDetected);
        }
        if out.is_empty() {
            out.push(AlertSignal::None);
        }
        out
    }

    const fn is_active(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Vibration => self.vibration,
            NotificationKind::Tilt => self.tilt,
            NotificationKind::Crack => self.remote_crack,
        }
    }
}

/// Everything the aggregator looks at for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub at: DateTime<Local>,
    pub vibration: bool,
    pub orientation: Orientation,
    /// Verdict after this tick's receive poll
    pub verdict: RemoteVerdict,
    /// Token received during this tick's poll, if any
    pub received: Option<Token>,
}

#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub previous: AlertState,
    pub state: AlertState,
    pub signals: ActiveSignals,
    pub indicator_high: bool,
    /// To dispatch this tick
    pub notifications: Vec<Notification>,
    /// Withheld by the re-notify window
    pub suppressed: usize,
}

impl TickOutcome {
    pub fn entered_alert(&self) -> bool {
        self.previous == AlertState::Idle && self.state == AlertState::Alerting
    }

    pub fn cleared(&self) -> bool {
        self.previous == AlertState::Alerting && self.state == AlertState::Idle
    }
}

pub struct AlertAggregator {
    state: AlertState,
    /// `None` re-notifies every tick
    renotify_interval: Option<Duration>,
    last_sent: HashMap<NotificationKind, DateTime<Local>>,
}

impl AlertAggregator {
    /// A zero interval disables suppression.
    pub fn new(renotify_interval: Duration) -> Self {
        Self {
            state: AlertState::Idle,
            renotify_interval: (!renotify_interval.is_zero()).then_some(renotify_interval),
            last_sent: HashMap::new(),
        }
    }

    pub const fn state(&self) -> AlertState {
        self.state
    }

    pub fn evaluate(&mut self, input: &TickInput) -> TickOutcome {
        let signals = ActiveSignals {
            vibration: input.vibration,
            tilt: input.orientation.exceeds_tilt_limit(),
            remote_crack: input.verdict.is_danger(),
        };

        // A cause that has cleared notifies afresh when it returns
        self.last_sent.retain(|kind, _| signals.is_active(*kind));

        let mut candidates = Vec::with_capacity(2);
        if signals.vibration {
            candidates.push(Notification::vibration(input.at));
        } else if signals.tilt {
            candidates.push(Notification::tilt(
                input.orientation.roll,
                input.orientation.pitch,
            ));
        }
        if input.received == Some(Token::Danger) {
            candidates.push(Notification::crack());
        }

        let before = candidates.len();
        let notifications: Vec<Notification> = candidates
            .into_iter()
            .filter(|n| self.admit(n.kind, input.at))
            .collect();
        let suppressed = before - notifications.len();

        let previous = self.state;
        self.state = if signals.any() {
            AlertState::Alerting
        } else {
            AlertState::Idle
        };

        TickOutcome {
            previous,
            state: self.state,
            signals,
            indicator_high: self.state == AlertState::Alerting,
            notifications,
            suppressed,
        }
    }

    fn admit(&mut self, kind: NotificationKind, at: DateTime<Local>) -> bool {
        let Some(window) = self.renotify_interval else {
            return true;
        };
        let within_window = self.last_sent.get(&kind).is_some_and(|last| {
            (at - *last)
                .to_std()
                .is_ok_and(|elapsed| elapsed < window)
        });
        if within_window {
            return false;
        }
        self.last_sent.insert(kind, at);
        true
    }
}
