//! Bridge Sentinel edge node
//!
//! Samples the MPU-6050 and vibration switch on a Raspberry Pi, lights the
//! alert LED, and forwards telemetry and alert email. Waits for the vision
//! node to connect before the first tick unless `--no-vision-link` is given.
//!
//! # Usage
//!
//! ```bash
//! # Stock deployment (reads ./bridge_config.toml if present)
//! ./bridge-sentinel
//!
//! # Explicit config, no vision node, 60 ticks then exit
//! ./bridge-sentinel --config /etc/bridge/bridge_config.toml --no-vision-link --ticks 60
//! ```
//!
//! # Environment Variables
//!
//! - `BRIDGE_CONFIG`: Path to the TOML config
//! - `BRIDGE_SMTP_PASSWORD`: SMTP password (overrides `notify.password`)
//! - `BRIDGE_TELEMETRY_TOKEN`: Telemetry auth token (overrides `telemetry.auth_token`)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bridge_sentinel::alert::AlertAggregator;
use bridge_sentinel::config::defaults::SENSOR_WAKE_SETTLE_MS;
use bridge_sentinel::config::BridgeConfig;
use bridge_sentinel::edge::{EdgeIo, EdgeNode};
use bridge_sentinel::gpio::SysfsPin;
use bridge_sentinel::sensors::{I2cBus, Mpu6050};
use bridge_sentinel::sink::Sinks;
use bridge_sentinel::transport::Acceptor;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "bridge-sentinel")]
#[command(about = "Bridge structural monitor - edge sensor node")]
#[command(version)]
struct CliArgs {
    /// Path to bridge_config.toml (otherwise BRIDGE_CONFIG, then ./bridge_config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Do not wait for the vision node; run on local sensors only
    #[arg(long)]
    no_vision_link: bool,

    /// Stop after this many ticks
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = BridgeConfig::load(args.config.as_deref()).context("Invalid configuration")?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Bridge Sentinel - Edge Node");
    info!("  Node: {}", config.node.name);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Sensor bus: no bus, no monitor
    let bus = I2cBus::open(&config.sensor.i2c_bus, config.sensor.address).with_context(|| {
        format!(
            "Sensor bus unavailable ({} @ {:#04x})",
            config.sensor.i2c_bus.display(),
            config.sensor.address
        )
    })?;
    let mut sensor = Mpu6050::new(bus);
    sensor.wake().context("Failed to wake MPU-6050")?;
    tokio::time::sleep(Duration::from_millis(SENSOR_WAKE_SETTLE_MS)).await;
    info!(
        bus = %config.sensor.i2c_bus.display(),
        address = %format!("{:#04x}", config.sensor.address),
        "📡 [Sensor] MPU-6050 awake"
    );

    let indicator = SysfsPin::output(&config.gpio.sysfs_root, config.gpio.indicator_pin)
        .context("Failed to set up indicator pin")?;
    let vibration = SysfsPin::input(&config.gpio.sysfs_root, config.gpio.vibration_pin)
        .context("Failed to set up vibration pin")?;
    info!(
        indicator = config.gpio.indicator_pin,
        vibration = config.gpio.vibration_pin,
        "💡 [GPIO] Pins ready"
    );

    let receive_timeout = config.transport.receive_timeout();
    let acceptor = if args.no_vision_link || !config.transport.enabled {
        Acceptor::disabled(receive_timeout)
    } else {
        match Acceptor::bind(&config.transport.bind_addr, receive_timeout).await {
            Ok(acceptor) => acceptor,
            Err(e) => {
                warn!(error = %e, "[Transport] Bind failed, running without a vision link");
                Acceptor::disabled(receive_timeout)
            }
        }
    };

    let sinks = Sinks::from_config(&config);
    let aggregator =
        AlertAggregator::new(Duration::from_secs(config.notify.renotify_interval_secs));

    let mut edge = EdgeNode::new(
        &config.node.name,
        EdgeIo {
            sensor,
            vibration,
            indicator,
        },
        acceptor,
        aggregator,
        sinks,
        config.node.tick_interval(),
        cancel_token,
    );

    if !edge.wait_for_peer().await {
        // Cancelled before the loop started; still release pins and link
        edge.shutdown().await;
        info!("Clean exit");
        return Ok(());
    }

    edge.run(args.ticks).await;
    info!("Clean exit");
    Ok(())
}
