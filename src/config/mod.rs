//! Bridge Configuration Module
//!
//! Provides per-deployment configuration loaded from TOML files. Both the
//! edge node and the vision node read the same file; each uses the sections
//! it needs.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `BRIDGE_CONFIG` environment variable (path to TOML file)
//! 3. `bridge_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = BridgeConfig::load(args.config.as_deref())?;
//! let tick = config.node.tick_interval();
//! ```

mod bridge_config;
pub mod defaults;
pub mod validation;

pub use bridge_config::*;
