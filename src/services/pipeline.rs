//! Alert pipeline - the capture/detect/alert/cleanup cycle
//!
//! The pipeline is the central orchestrator: it waits for motion, captures a
//! still, runs the classifier, and either fires the alert burst, purges the
//! evidence, or silently retains it. Exactly one cycle is in flight at a
//! time; every external call is awaited inline, and the pipeline re-arms
//! only after the sensor reports motion stopped.
//!
//! Policy notes:
//! - A detection qualifies when its confidence is strictly above the
//!   threshold AND its class matches the target. Each qualifying detection
//!   triggers a full burst to every recipient, with no deduplication within
//!   one image.
//! - Evidence is purged only when the detection sequence is literally
//!   empty. A non-empty sequence with no qualifying detection retains the
//!   artifacts and sends nothing. Intentional asymmetry; do not collapse
//!   the two cases.

use crate::domain::types::{ClassId, Detection, MotionEvent};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::camera::CameraCapture;
use crate::io::modem::{log_send_failed, AlertSender};
use crate::services::detector::ObjectDetector;
use crate::services::evidence::EvidenceStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How a cycle ended, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Capture command failed; detection skipped
    CaptureFailed,
    /// Empty detection sequence; evidence deleted
    Purged,
    /// Detections present but none qualifying; evidence kept, no alert
    Retained,
    /// At least one qualifying detection; alert bursts sent
    Alerted { bursts: usize },
}

impl CycleOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            CycleOutcome::CaptureFailed => "capture_failed",
            CycleOutcome::Purged => "purged",
            CycleOutcome::Retained => "retained",
            CycleOutcome::Alerted { .. } => "alerted",
        }
    }
}

/// Central orchestrator for the motion-to-alert cycle
pub struct AlertPipeline {
    camera: CameraCapture,
    detector: Box<dyn ObjectDetector>,
    alerter: Box<dyn AlertSender>,
    evidence: EvidenceStore,
    recipients: Vec<String>,
    alert_message: String,
    target_class: ClassId,
    confidence_threshold: f32,
    metrics: Arc<Metrics>,
}

impl AlertPipeline {
    pub fn new(
        config: &Config,
        camera: CameraCapture,
        detector: Box<dyn ObjectDetector>,
        alerter: Box<dyn AlertSender>,
        evidence: EvidenceStore,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            camera,
            detector,
            alerter,
            evidence,
            recipients: config.recipients().to_vec(),
            alert_message: config.alert_message().to_string(),
            target_class: config.target_class(),
            confidence_threshold: config.confidence_threshold(),
            metrics,
        }
    }

    /// Run the pipeline, consuming motion events until the channel closes
    pub async fn run(&mut self, mut event_rx: mpsc::Receiver<MotionEvent>) {
        info!(
            recipients = %self.recipients.len(),
            target_class = %self.target_class,
            confidence_threshold = %self.confidence_threshold,
            "alert_pipeline_started"
        );

        loop {
            // IDLE until the sensor reports motion
            if Self::wait_for(&mut event_rx, MotionEvent::Started).await.is_none() {
                break;
            }
            info!("motion_detected");

            let cycle_start = Instant::now();
            let outcome = self.run_cycle().await;
            let elapsed_ms = cycle_start.elapsed().as_millis() as u64;
            self.metrics.record_cycle(elapsed_ms);
            info!(outcome = %outcome.as_str(), elapsed_ms = %elapsed_ms, "cycle_complete");

            // Re-arm only after motion has ceased
            if Self::wait_for(&mut event_rx, MotionEvent::Stopped).await.is_none() {
                break;
            }
            info!("motion_stopped");
        }

        info!("alert_pipeline_stopped");
    }

    /// Wait for a specific motion transition, ignoring any other event.
    /// Returns None when the channel has closed (monitor shut down).
    async fn wait_for(
        event_rx: &mut mpsc::Receiver<MotionEvent>,
        want: MotionEvent,
    ) -> Option<()> {
        loop {
            match event_rx.recv().await? {
                event if event == want => return Some(()),
                event => {
                    debug!(event = %event.as_str(), "motion_event_ignored");
                }
            }
        }
    }

    /// One capture-detect-act cycle
    async fn run_cycle(&mut self) -> CycleOutcome {
        let image = match self.camera.capture().await {
            Ok(image) => {
                self.metrics.record_capture_ok();
                image
            }
            Err(e) => {
                self.metrics.record_capture_failed();
                warn!(error = %e, "capture_failed_skipping_detection");
                return CycleOutcome::CaptureFailed;
            }
        };

        // A classifier failure is indistinguishable from "nothing found"
        // downstream; both take the cleanup path
        let detections = match self.detector.infer(&image).await {
            Ok(detections) => {
                self.metrics.record_detector_run(detections.len() as u64);
                detections
            }
            Err(e) => {
                self.metrics.record_detector_failure();
                warn!(error = %e, "classifier_failed_treating_as_empty");
                Vec::new()
            }
        };

        if detections.is_empty() {
            info!(image = %image.path().display(), "no_detections_purging_evidence");
            if self.evidence.purge(&image) {
                self.metrics.record_purge();
            } else {
                self.metrics.record_purge_failure();
            }
            return CycleOutcome::Purged;
        }

        let qualifying: Vec<Detection> = detections
            .iter()
            .filter(|d| d.qualifies(self.confidence_threshold, self.target_class))
            .cloned()
            .collect();

        if qualifying.is_empty() {
            // Sub-threshold or wrong class: nothing is sent and nothing is
            // cleaned up; the artifacts stay on disk for inspection
            info!(detections = %detections.len(), "no_qualifying_detection_evidence_retained");
            return CycleOutcome::Retained;
        }

        for detection in &qualifying {
            info!(
                confidence = %detection.confidence,
                class = %detection.class,
                "qualifying_detection"
            );
            self.send_burst().await;
        }

        CycleOutcome::Alerted { bursts: qualifying.len() }
    }

    /// Send the alert message to every recipient in list order.
    /// A transport failure is logged and does not block the rest of the
    /// burst; there is no retry and no delivery verification.
    async fn send_burst(&mut self) {
        self.metrics.record_alert_burst();

        let recipients = self.recipients.clone();
        let message = self.alert_message.clone();

        for recipient in &recipients {
            match self.alerter.send(recipient, &message).await {
                Ok(()) => self.metrics.record_sms_sent(),
                Err(e) => {
                    self.metrics.record_sms_failed();
                    log_send_failed(recipient, &e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{BoundingBox, CapturedImage};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::time::{timeout, Duration};

    /// Detector stub returning a fixed result (or failing when `result` is None)
    struct StubDetector {
        result: Option<Vec<Detection>>,
        invocations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ObjectDetector for StubDetector {
        async fn infer(&self, _image: &CapturedImage) -> anyhow::Result<Vec<Detection>> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Some(detections) => Ok(detections.clone()),
                None => anyhow::bail!("classifier crashed"),
            }
        }
    }

    /// Alert sink recording sends; fails the attempt at `fail_attempt` (1-based)
    struct RecordingAlerter {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        attempts: Arc<AtomicUsize>,
        fail_attempt: Option<usize>,
    }

    #[async_trait]
    impl AlertSender for RecordingAlerter {
        async fn send(&mut self, recipient: &str, message: &str) -> anyhow::Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_attempt == Some(attempt) {
                anyhow::bail!("modem transport error");
            }
            self.sent.lock().unwrap().push((recipient.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn detection(confidence: f32, class: u32) -> Detection {
        Detection {
            bbox: BoundingBox { x1: 0.0, y1: 0.0, x2: 100.0, y2: 100.0 },
            confidence,
            class: ClassId(class),
        }
    }

    struct TestHarness {
        pipeline: AlertPipeline,
        sent: Arc<Mutex<Vec<(String, String)>>>,
        attempts: Arc<AtomicUsize>,
        detector_invocations: Arc<AtomicUsize>,
        metrics: Arc<Metrics>,
        image_path: std::path::PathBuf,
        latest_run: std::path::PathBuf,
        #[allow(dead_code)]
        dir: TempDir,
    }

    fn harness(
        config: Config,
        capture_ok: bool,
        detector_result: Option<Vec<Detection>>,
        fail_attempt: Option<usize>,
    ) -> TestHarness {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("capture.jpg");
        let runs_dir = dir.path().join("runs");
        let latest_run = runs_dir.join("exp");
        fs::create_dir_all(&latest_run).unwrap();
        fs::write(&image_path, "jpeg").unwrap();

        let config = config
            .with_camera_command(if capture_ok { "true" } else { "false" })
            .with_camera_output(&image_path.display().to_string())
            .with_detector_runs_dir(&runs_dir.display().to_string());

        let sent = Arc::new(Mutex::new(Vec::new()));
        let attempts = Arc::new(AtomicUsize::new(0));
        let detector_invocations = Arc::new(AtomicUsize::new(0));

        let detector = Box::new(StubDetector {
            result: detector_result,
            invocations: detector_invocations.clone(),
        });
        let alerter = Box::new(RecordingAlerter {
            sent: sent.clone(),
            attempts: attempts.clone(),
            fail_attempt,
        });

        let metrics = Arc::new(Metrics::new());
        let pipeline = AlertPipeline::new(
            &config,
            CameraCapture::new(&config),
            detector,
            alerter,
            EvidenceStore::new(&config),
            metrics.clone(),
        );

        TestHarness {
            pipeline,
            sent,
            attempts,
            detector_invocations,
            metrics,
            image_path,
            latest_run,
            dir,
        }
    }

    #[tokio::test]
    async fn test_qualifying_detection_sends_burst_to_all_recipients() {
        let mut h = harness(Config::default(), true, Some(vec![detection(0.9, 0)]), None);

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Alerted { bursts: 1 });
        let sent = h.sent.lock().unwrap();
        assert_eq!(sent.len(), 6);
        // Recipient-list order, one message each
        assert_eq!(sent[0].0, "+9779869990884");
        assert_eq!(sent[5].0, "+9779851210554");
        assert!(sent.iter().all(|(_, m)| m == "Leopard detected at the site no.1 in Dadagaun"));
        // Evidence is retained on the alert path
        assert!(h.image_path.exists());
        assert!(h.latest_run.exists());
    }

    #[tokio::test]
    async fn test_each_qualifying_detection_triggers_its_own_burst() {
        let config = Config::default()
            .with_recipients(vec!["+100".to_string(), "+200".to_string()]);
        let mut h = harness(config, true, Some(vec![detection(0.9, 0), detection(0.7, 0)]), None);

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Alerted { bursts: 2 });
        let sent = h.sent.lock().unwrap();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].0, "+100");
        assert_eq!(sent[1].0, "+200");
        assert_eq!(sent[2].0, "+100");
        assert_eq!(sent[3].0, "+200");
    }

    #[tokio::test]
    async fn test_empty_detections_purge_evidence_and_send_nothing() {
        let mut h = harness(Config::default(), true, Some(vec![]), None);

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Purged);
        assert!(h.sent.lock().unwrap().is_empty());
        assert!(!h.image_path.exists());
        assert!(!h.latest_run.exists());
    }

    #[tokio::test]
    async fn test_sub_threshold_detections_are_retained_without_alert() {
        // Non-empty but nothing qualifying: wrong class and low confidence
        let mut h = harness(
            Config::default(),
            true,
            Some(vec![detection(0.4, 0), detection(0.9, 5)]),
            None,
        );

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Retained);
        assert!(h.sent.lock().unwrap().is_empty());
        // No cleanup either - the asymmetry is deliberate
        assert!(h.image_path.exists());
        assert!(h.latest_run.exists());
    }

    #[tokio::test]
    async fn test_capture_failure_skips_detection_entirely() {
        let mut h = harness(Config::default(), false, Some(vec![detection(0.9, 0)]), None);

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::CaptureFailed);
        assert_eq!(h.detector_invocations.load(Ordering::SeqCst), 0);
        assert!(h.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_failure_takes_cleanup_path() {
        let mut h = harness(Config::default(), true, None, None);

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Purged);
        assert!(h.sent.lock().unwrap().is_empty());
        assert!(!h.image_path.exists());
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_block_rest_of_burst() {
        let config = Config::default().with_recipients(vec![
            "+100".to_string(),
            "+200".to_string(),
            "+300".to_string(),
        ]);
        let mut h = harness(config, true, Some(vec![detection(0.9, 0)]), Some(1));

        let outcome = h.pipeline.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Alerted { bursts: 1 });
        // First attempt failed, remaining two still went out
        assert_eq!(h.attempts.load(Ordering::SeqCst), 3);
        let sent = h.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "+200");
        assert_eq!(sent[1].0, "+300");
    }

    #[tokio::test]
    async fn test_run_consumes_one_cycle_per_motion_window() {
        let h = harness(Config::default(), true, Some(vec![]), None);
        let invocations = h.detector_invocations.clone();
        let metrics = h.metrics.clone();
        let mut pipeline = h.pipeline;

        let (event_tx, event_rx) = mpsc::channel(16);

        // A redundant Started arrives mid-window; the pipeline must not
        // start a second capture before the window closes
        event_tx.send(MotionEvent::Started).await.unwrap();
        event_tx.send(MotionEvent::Started).await.unwrap();
        event_tx.send(MotionEvent::Stopped).await.unwrap();
        drop(event_tx);

        timeout(Duration::from_secs(10), pipeline.run(event_rx)).await.unwrap();

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.report().cycles, 1);
    }

    #[tokio::test]
    async fn test_run_re_arms_after_capture_failure() {
        let h = harness(Config::default(), false, Some(vec![]), None);
        let invocations = h.detector_invocations.clone();
        let metrics = h.metrics.clone();
        let mut pipeline = h.pipeline;

        let (event_tx, event_rx) = mpsc::channel(16);

        // Failed cycle, then a fresh motion window runs a second cycle
        event_tx.send(MotionEvent::Started).await.unwrap();
        event_tx.send(MotionEvent::Stopped).await.unwrap();
        event_tx.send(MotionEvent::Started).await.unwrap();
        event_tx.send(MotionEvent::Stopped).await.unwrap();
        drop(event_tx);

        timeout(Duration::from_secs(10), pipeline.run(event_rx)).await.unwrap();

        // Capture fails both times, so the classifier never runs, but the
        // loop itself kept re-arming
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        let summary = metrics.report();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.captures_failed, 2);
    }
}
