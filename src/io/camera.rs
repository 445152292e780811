//! Still-image capture via the external camera command
//!
//! Invokes a libcamera-jpeg style binary once per cycle:
//! `<command> -o <output> -t <ms> --width <w> --height <h>`
//! Zero exit status is the success contract; the output path is overwritten
//! on every capture, so at most one image artifact exists at a time.

use crate::domain::types::CapturedImage;
use crate::infra::config::Config;
use anyhow::Context;
use std::path::PathBuf;
use std::time::Instant;
use tokio::process::Command;
use tracing::info;

pub struct CameraCapture {
    command: String,
    output: PathBuf,
    timeout_ms: u64,
    width: u32,
    height: u32,
}

impl CameraCapture {
    pub fn new(config: &Config) -> Self {
        Self {
            command: config.camera_command().to_string(),
            output: PathBuf::from(config.camera_output()),
            timeout_ms: config.camera_timeout_ms(),
            width: config.camera_width(),
            height: config.camera_height(),
        }
    }

    /// Capture one still image.
    ///
    /// Returns a handle to the artifact on success. A non-zero exit or a
    /// spawn fault is an error; the caller skips detection for the cycle
    /// but must still re-arm on motion-stop.
    pub async fn capture(&self) -> anyhow::Result<CapturedImage> {
        let start = Instant::now();

        let status = Command::new(&self.command)
            .arg("-o")
            .arg(&self.output)
            .arg("-t")
            .arg(self.timeout_ms.to_string())
            .arg("--width")
            .arg(self.width.to_string())
            .arg("--height")
            .arg(self.height.to_string())
            .status()
            .await
            .with_context(|| format!("Failed to run capture command {}", self.command))?;

        if !status.success() {
            anyhow::bail!("Capture command {} exited with {}", self.command, status);
        }

        info!(
            path = %self.output.display(),
            elapsed_ms = %start.elapsed().as_millis(),
            "camera_capture_ok"
        );

        Ok(CapturedImage::new(&self.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_success_on_zero_exit() {
        // `true` ignores the capture arguments and exits zero
        let config = Config::default().with_camera_command("true").with_camera_output("img.jpg");
        let camera = CameraCapture::new(&config);

        let image = camera.capture().await.unwrap();
        assert_eq!(image.path(), std::path::Path::new("img.jpg"));
    }

    #[tokio::test]
    async fn test_capture_failure_on_nonzero_exit() {
        let config = Config::default().with_camera_command("false");
        let camera = CameraCapture::new(&config);

        assert!(camera.capture().await.is_err());
    }

    #[tokio::test]
    async fn test_capture_failure_on_missing_binary() {
        let config = Config::default().with_camera_command("/nonexistent/capture-binary");
        let camera = CameraCapture::new(&config);

        assert!(camera.capture().await.is_err());
    }
}
