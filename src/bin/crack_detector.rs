//! Crack detector: vision node of Bridge Sentinel
//!
//! Loads the crack model, dials the edge node, then classifies every frame of
//! each `--source` in order and sends a DANGER or SAFE token per frame.
//!
//! # Usage
//!
//! ```bash
//! # A directory of inspection photos and a single still
//! ./crack-detector --source /data/deck_survey --source pier_03.jpg
//!
//! # Edge node on another host, fresh connection for every source
//! ./crack-detector --host 10.0.0.12 --port 5000 --source /data --reconnect-each-session
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bridge_sentinel::config::BridgeConfig;
use bridge_sentinel::transport::Initiator;
use bridge_sentinel::vision::{open_source, InferencePipeline, OnnxClassifier, VisionNode};

#[derive(Parser, Debug)]
#[command(name = "crack-detector")]
#[command(about = "Bridge structural monitor - crack detection vision node")]
#[command(version)]
struct CliArgs {
    /// Path to bridge_config.toml (otherwise BRIDGE_CONFIG, then ./bridge_config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Edge node host (overrides transport.peer_host)
    #[arg(long)]
    host: Option<String>,

    /// Edge node port (overrides transport.peer_port)
    #[arg(long)]
    port: Option<u16>,

    /// Frame source: a still image or a directory of frames. Repeatable.
    #[arg(short, long, value_name = "PATH", required = true)]
    source: Vec<PathBuf>,

    /// Close and re-dial the edge node before each source after the first
    #[arg(long)]
    reconnect_each_session: bool,
}

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

    let host = args.host.unwrap_or_else(|| config.transport.peer_host.clone());
    let port = args.port.unwrap_or(config.transport.peer_port);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Bridge Sentinel - Crack Detector");
    info!("  Model: {}", config.vision.model_path.display());
    info!("  Edge node: {}:{}", host, port);
    info!("  Sources: {}", args.source.len());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // No model, no detector
    let classifier = OnnxClassifier::load(&config.vision.model_path, config.vision.input_size)
        .context("Failed to load crack model")?;
    info!(
        input_size = config.vision.input_size,
        channel_order = ?config.vision.channel_order,
        "🧠 [Vision] Model loaded"
    );

    let pipeline = InferencePipeline::new(
        classifier,
        config.vision.input_size,
        config.vision.channel_order,
    );
    let initiator = Initiator::new(&host, port, config.transport.connect_timeout());
    let mut node = VisionNode::new(
        pipeline,
        initiator,
        config.vision.frame_interval(),
        cancel_token.clone(),
    )
    .with_annotate_dir(config.vision.annotate_dir.clone());

    node.reconnect().await;

    for (index, path) in args.source.iter().enumerate() {
        if cancel_token.is_cancelled() {
            break;
        }
        if index > 0 && args.reconnect_each_session {
            node.reconnect().await;
        }

        let mut source = match open_source(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "[Vision] Source skipped");
                continue;
            }
        };
        node.run_session(source.as_mut()).await;
    }

    node.shutdown().await;
    info!("Clean exit");
    Ok(())
}
