//! Frame loop of the vision node

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::annotate::save_annotated;
use super::classifier::Classifier;
use super::pipeline::{ClassificationResult, InferencePipeline};
use super::source::FrameSource;
use crate::transport::{Initiator, SendOutcome};

#[derive(Debug, Clone, Default)]
pub struct VisionStats {
    pub sessions: u64,
    pub frames: u64,
    pub crack_frames: u64,
    pub frame_errors: u64,
    pub sends: u64,
    pub failed_sends: u64,
    /// Verdicts not sent because the link was absent or degraded
    pub skipped_sends: u64,
    pub connect_failures: u64,
}

impl VisionStats {
    pub fn log_summary(&self) {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Sessions:             {}", self.sessions);
        info!("   Frames:               {}", self.frames);
        info!("   Crack Frames:         {}", self.crack_frames);
        info!("   Frame Errors:         {}", self.frame_errors);
        info!("   Verdicts Sent:        {}", self.sends);
        info!("   Failed Sends:         {}", self.failed_sends);
        info!("   Skipped Sends:        {}", self.skipped_sends);
        info!("   Connect Failures:     {}", self.connect_failures);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

pub struct VisionNode<C> {
    pipeline: InferencePipeline<C>,
    initiator: Initiator,
    frame_interval: Duration,
    annotate_dir: Option<PathBuf>,
    cancel_token: CancellationToken,
    stats: VisionStats,
}

impl<C: Classifier> VisionNode<C> {
    pub fn new(
        pipeline: InferencePipeline<C>,
        initiator: Initiator,
        frame_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            initiator,
            frame_interval,
            annotate_dir: None,
            cancel_token,
            stats: VisionStats::default(),
        }
    }

    #[must_use]
    pub fn with_annotate_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.annotate_dir = dir;
        self
    }

    pub const fn stats(&self) -> &VisionStats {
        &self.stats
    }

    pub const fn initiator(&self) -> &Initiator {
        &self.initiator
    }

    /// Explicit (re)connect: closes any existing link and dials afresh.
    /// Failure is logged; classification keeps running without a link.
    pub async fn reconnect(&mut self) -> bool {
        match self.initiator.connect().await {
            Ok(_) => true,
            Err(e) => {
                self.stats.connect_failures += 1;
                warn!(error = %e, "[Transport] Could not connect to edge node, verdicts will not be sent");
                false
            }
        }
    }

    /// Classify every frame of one source and send a verdict per frame.
    pub async fn run_session(&mut self, source: &mut dyn FrameSource) {
        self.stats.sessions += 1;
        info!(source = %source.name(), "🎥 [Vision] Session started");
        let mut first = true;

        loop {
            if self.cancel_token.is_cancelled() {
                info!("[Vision] Shutdown signal received");
                break;
            }
            if !first && source.is_stream() && !self.frame_interval.is_zero() {
                tokio::select! {
                    _ = self.cancel_token.cancelled() => {
                        info!("[Vision] Shutdown signal received");
                        break;
                    }
                    _ = tokio::time::sleep(self.frame_interval) => {}
                }
            }
            first = false;

            let Some(next) = source.next_frame() else {
                break;
            };
            self.stats.frames += 1;

            let frame = match next {
                Ok(frame) => frame,
                Err(e) => {
                    self.stats.frame_errors += 1;
                    warn!(error = %e, "[Vision] Frame skipped");
                    continue;
                }
            };

            let result = match self.pipeline.classify(&frame) {
                Ok(result) => result,
                Err(e) => {
                    self.stats.frame_errors += 1;
                    warn!(frame = %frame.name(), error = %e, "[Vision] Classification failed");
                    continue;
                }
            };
            self.report(&result, frame.name());

            if let Some(dir) = &self.annotate_dir {
                if let Err(e) = save_annotated(dir, frame.name(), &frame, &result) {
                    warn!(error = %e, "[Vision] Annotation not saved");
                }
            }

            match self.initiator.send(result.message()).await {
                SendOutcome::Sent => self.stats.sends += 1,
                SendOutcome::Failed => self.stats.failed_sends += 1,
                SendOutcome::SkippedDegraded | SendOutcome::NoLink => self.stats.skipped_sends += 1,
            }
        }

        info!(source = %source.name(), frames = self.stats.frames, "[Vision] Session ended");
    }

    fn report(&mut self, result: &ClassificationResult, frame: &str) {
        if result.is_crack() {
            self.stats.crack_frames += 1;
            warn!(frame, "🚨 [Vision] {} ({:.2})", result.label, result.score);
        } else {
            info!(frame, "[Vision] {} ({:.2})", result.label, result.score);
        }
    }

    pub async fn shutdown(mut self) -> VisionStats {
        self.initiator.close().await;
        self.stats.log_summary();
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelOrder;
    use crate::vision::{Frame, InputTensor, VisionError};
    use image::{Rgb, RgbImage};
    use std::collections::VecDeque;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Scores frames by their red channel: red frames are cracks.
    struct RedMeansCrack;

    impl Classifier for RedMeansCrack {
        fn predict(&self, input: &InputTensor) -> Result<f32, VisionError> {
            // BGR order: red is the third value of each pixel
            Ok(input.data[2])
        }
    }

    struct Scripted {
        frames: VecDeque<Result<Frame, VisionError>>,
    }

    impl FrameSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn next_frame(&mut self) -> Option<Result<Frame, VisionError>> {
            self.frames.pop_front()
        }
    }

    fn frame(rgb: [u8; 3]) -> Frame {
        Frame::from_rgb(RgbImage::from_pixel(16, 16, Rgb(rgb)))
    }

    fn node(port: u16) -> VisionNode<RedMeansCrack> {
        VisionNode::new(
            InferencePipeline::new(RedMeansCrack, 8, ChannelOrder::Bgr),
            Initiator::new("127.0.0.1", port, Duration::from_secs(2)),
            Duration::from_millis(1),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_session_sends_one_token_per_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let mut vision = node(port);
        let (connected, accepted) = tokio::join!(vision.reconnect(), listener.accept());
        assert!(connected);
        let (mut edge_side, _) = accepted.expect("accept");

        let mut source = Scripted {
            frames: VecDeque::from(vec![
                Ok(frame([255, 0, 0])),
                Err(VisionError::UnsupportedSource(PathBuf::from("broken"))),
                Ok(frame([0, 0, 255])),
            ]),
        };
        vision.run_session(&mut source).await;

        let stats = vision.stats().clone();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.frame_errors, 1);
        assert_eq!(stats.crack_frames, 1);
        assert_eq!(stats.sends, 2);

        vision.shutdown().await;
        let mut received = String::new();
        edge_side.read_to_string(&mut received).await.expect("read");
        assert_eq!(received, "DANGERSAFE");
    }

    #[tokio::test]
    async fn test_session_without_link_still_classifies() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            l.local_addr().expect("addr").port()
        };
        let mut vision = node(port);
        assert!(!vision.reconnect().await);

        let mut source = Scripted {
            frames: VecDeque::from(vec![Ok(frame([255, 0, 0]))]),
        };
        vision.run_session(&mut source).await;
        assert_eq!(vision.stats().crack_frames, 1);
        assert_eq!(vision.stats().skipped_sends, 1);
        assert_eq!(vision.stats().connect_failures, 1);
    }

    #[tokio::test]
    async fn test_annotations_written_when_enabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut vision = node(1).with_annotate_dir(Some(dir.path().to_path_buf()));
        let mut source = Scripted {
            frames: VecDeque::from(vec![Ok(frame([0, 200, 0]).with_name("pier_01"))]),
        };
        vision.run_session(&mut source).await;
        assert!(dir.path().join("pier_01_safe_0.00.png").exists());
    }

    #[tokio::test]
    async fn test_cancelled_session_processes_nothing() {
        let mut vision = node(1);
        vision.cancel_token.cancel();
        let mut source = Scripted {
            frames: VecDeque::from(vec![Ok(frame([255, 0, 0]))]),
        };
        vision.run_session(&mut source).await;
        assert_eq!(vision.stats().frames, 0);
    }
}
