//! Object detection via the external classifier process
//!
//! The classifier is an opaque oracle: it consumes one image path and the
//! model weights, prints a JSON array of detections as the final line of
//! stdout, and writes an annotated run directory under the configured runs
//! root as a side artifact. The model is loaded by the subprocess on every
//! invocation; amortizing that cost would not change observable behavior.

use crate::domain::types::{CapturedImage, Detection};
use crate::infra::config::Config;
use anyhow::Context;
use async_trait::async_trait;
use std::time::Instant;
use tokio::process::Command;
use tracing::info;

/// Capability interface for the detection oracle.
///
/// Must be idempotent for the same image and model version. An empty vector
/// means nothing was found; the pipeline maps errors to the same outcome.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn infer(&self, image: &CapturedImage) -> anyhow::Result<Vec<Detection>>;
}

/// Runs the YOLO-style classifier as a subprocess per invocation
pub struct YoloProcessDetector {
    command: String,
    script: String,
    weights: String,
    image_size: u32,
}

impl YoloProcessDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            command: config.detector_command().to_string(),
            script: config.detector_script().to_string(),
            weights: config.detector_weights().to_string(),
            image_size: config.detector_image_size(),
        }
    }
}

/// Parse the detection array from classifier stdout.
///
/// The classifier may print progress noise first; the detection array is the
/// final non-empty line.
fn parse_detections(stdout: &str) -> anyhow::Result<Vec<Detection>> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .context("Classifier produced no output")?;

    serde_json::from_str(line)
        .with_context(|| format!("Classifier output was not a JSON detection array: {}", line))
}

#[async_trait]
impl ObjectDetector for YoloProcessDetector {
    async fn infer(&self, image: &CapturedImage) -> anyhow::Result<Vec<Detection>> {
        let start = Instant::now();

        let output = Command::new(&self.command)
            .arg(&self.script)
            .arg("--weights")
            .arg(&self.weights)
            .arg("--source")
            .arg(image.path())
            .arg("--img-size")
            .arg(self.image_size.to_string())
            .output()
            .await
            .with_context(|| format!("Failed to run classifier {}", self.command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Classifier exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let detections = parse_detections(&String::from_utf8_lossy(&output.stdout))?;

        info!(
            image = %image.path().display(),
            detections = %detections.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "classifier_inference_complete"
        );

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ClassId;
    use std::io::Write;

    #[test]
    fn test_parse_detections_final_line() {
        let stdout = "loading model best.pt\nimage 1/1: 640x480\n[{\"bbox\":{\"x1\":0.0,\"y1\":0.0,\"x2\":50.0,\"y2\":80.0},\"confidence\":0.91,\"class\":0}]\n";
        let detections = parse_detections(stdout).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, ClassId(0));
    }

    #[test]
    fn test_parse_detections_empty_array() {
        let detections = parse_detections("model loaded\n[]\n").unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_parse_detections_rejects_noise() {
        assert!(parse_detections("no detections today\n").is_err());
        assert!(parse_detections("").is_err());
    }

    #[tokio::test]
    async fn test_infer_via_stub_script() {
        // Stand-in classifier: a shell script that prints noise then the array
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake_detect.sh");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "echo 'loading model'").unwrap();
        writeln!(
            file,
            "echo '[{{\"bbox\":{{\"x1\":1.0,\"y1\":2.0,\"x2\":3.0,\"y2\":4.0}},\"confidence\":0.8,\"class\":0}}]'"
        )
        .unwrap();
        drop(file);

        let config = Config::default()
            .with_detector_command("sh")
            .with_detector_script(&script.display().to_string());
        let detector = YoloProcessDetector::new(&config);

        let detections =
            detector.infer(&CapturedImage::new("capture.jpg")).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, ClassId(0));
    }

    #[tokio::test]
    async fn test_infer_failure_on_nonzero_exit() {
        let config = Config::default().with_detector_command("false");
        let detector = YoloProcessDetector::new(&config);

        assert!(detector.infer(&CapturedImage::new("capture.jpg")).await.is_err());
    }
}
