//! Bridge Sentinel: structural monitoring for a single bridge span
//!
//! Two cooperating processes share this library:
//!
//! - **Edge node** (`bridge-sentinel`): samples an MPU-6050 and a vibration
//!   switch once per tick, derives roll and pitch, folds in the latest crack
//!   verdict from the vision node, drives the alert LED and sends telemetry
//!   and alert email.
//! - **Vision node** (`crack-detector`): classifies camera frames with a
//!   crack model and sends `DANGER` / `SAFE` tokens to the edge node over TCP.

pub mod alert;
pub mod config;
pub mod edge;
pub mod gpio;
pub mod sensors;
pub mod sink;
pub mod transport;
#[cfg(feature = "vision")]
pub mod vision;

pub use alert::{AlertAggregator, AlertSignal, AlertState, Notification};
pub use config::BridgeConfig;
pub use edge::{EdgeIo, EdgeNode, EdgeStats};
pub use sensors::{estimate, Orientation, RawAxes};
pub use transport::{Acceptor, Initiator, RemoteVerdict, Token, TransportLink};
