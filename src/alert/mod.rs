//! Alert aggregation and alert message content

pub mod aggregator;
pub mod notification;

pub use aggregator::{
    ActiveSignals, AlertAggregator, AlertSignal, AlertState, TickInput, TickOutcome,
};
pub use notification::{Notification, NotificationKind};
