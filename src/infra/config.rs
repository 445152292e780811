//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument; a missing
//! or unparseable file falls back to built-in defaults that mirror the
//! deployed device.

use crate::domain::types::ClassId;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Unique site identifier (e.g., "dadagaun-1")
    #[serde(default = "default_site_id")]
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { id: default_site_id() }
    }
}

fn default_site_id() -> String {
    "dadagaun-1".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// BCM pin number the PIR sensor data line is wired to
    #[serde(default = "default_sensor_pin")]
    pub gpio_pin: u8,
    /// How often the interrupt wait wakes up to check for shutdown
    #[serde(default = "default_sensor_poll_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { gpio_pin: default_sensor_pin(), poll_interval_ms: default_sensor_poll_ms() }
    }
}

fn default_sensor_pin() -> u8 {
    23
}

fn default_sensor_poll_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Still-capture command (invoked once per cycle)
    #[serde(default = "default_camera_command")]
    pub command: String,
    /// Output path for the captured image; overwritten every cycle
    #[serde(default = "default_camera_output")]
    pub output: String,
    /// Capture duration in milliseconds (-t flag)
    #[serde(default = "default_camera_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: default_camera_command(),
            output: default_camera_output(),
            timeout_ms: default_camera_timeout_ms(),
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

fn default_camera_command() -> String {
    "libcamera-jpeg".to_string()
}

fn default_camera_output() -> String {
    "capture.jpg".to_string()
}

fn default_camera_timeout_ms() -> u64 {
    1
}

fn default_camera_width() -> u32 {
    640
}

fn default_camera_height() -> u32 {
    480
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Interpreter or binary that runs the classifier
    #[serde(default = "default_detector_command")]
    pub command: String,
    /// Classifier entry script, passed as the first argument
    #[serde(default = "default_detector_script")]
    pub script: String,
    /// Model weights path (--weights)
    #[serde(default = "default_detector_weights")]
    pub weights: String,
    /// Inference image size (--img-size)
    #[serde(default = "default_detector_image_size")]
    pub image_size: u32,
    /// Root directory the classifier writes its run artifacts under
    #[serde(default = "default_detector_runs_dir")]
    pub runs_dir: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: default_detector_command(),
            script: default_detector_script(),
            weights: default_detector_weights(),
            image_size: default_detector_image_size(),
            runs_dir: default_detector_runs_dir(),
        }
    }
}

fn default_detector_command() -> String {
    "python3".to_string()
}

fn default_detector_script() -> String {
    "detect.py".to_string()
}

fn default_detector_weights() -> String {
    "best.pt".to_string()
}

fn default_detector_image_size() -> u32 {
    640
}

fn default_detector_runs_dir() -> String {
    "runs/detect".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModemConfig {
    /// Serial device the GSM modem is attached to
    #[serde(default = "default_modem_device")]
    pub device: String,
    #[serde(default = "default_modem_baud")]
    pub baud: u32,
    /// Settle delay after each handshake step (modem turnaround time)
    #[serde(default = "default_modem_settle_ms")]
    pub settle_ms: u64,
    /// Settle delay after the Ctrl+Z terminator while the modem transmits
    #[serde(default = "default_modem_send_settle_ms")]
    pub send_settle_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            device: default_modem_device(),
            baud: default_modem_baud(),
            settle_ms: default_modem_settle_ms(),
            send_settle_ms: default_modem_send_settle_ms(),
        }
    }
}

fn default_modem_device() -> String {
    "/dev/serial0".to_string()
}

fn default_modem_baud() -> u32 {
    9600
}

fn default_modem_settle_ms() -> u64 {
    1000
}

fn default_modem_send_settle_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Phone numbers to notify, in send order
    #[serde(default = "default_recipients")]
    pub recipients: Vec<String>,
    /// Fixed alert message body
    #[serde(default = "default_alert_message")]
    pub message: String,
    /// Classifier class that triggers an alert
    #[serde(default = "default_target_class")]
    pub target_class: u32,
    /// Strict lower bound on detection confidence
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            recipients: default_recipients(),
            message: default_alert_message(),
            target_class: default_target_class(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_recipients() -> Vec<String> {
    vec![
        "+9779869990884".to_string(),
        "+9779856022265".to_string(),
        "+9779847717958".to_string(),
        "+9779816698048".to_string(),
        "+9779856063692".to_string(),
        "+9779851210554".to_string(),
    ]
}

fn default_alert_message() -> String {
    "Leopard detected at the site no.1 in Dadagaun".to_string()
}

fn default_target_class() -> u32 {
    0
}

fn default_confidence_threshold() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub modem: ModemConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    sensor_gpio_pin: u8,
    sensor_poll_interval_ms: u64,
    camera_command: String,
    camera_output: String,
    camera_timeout_ms: u64,
    camera_width: u32,
    camera_height: u32,
    detector_command: String,
    detector_script: String,
    detector_weights: String,
    detector_image_size: u32,
    detector_runs_dir: String,
    modem_device: String,
    modem_baud: u32,
    modem_settle_ms: u64,
    modem_send_settle_ms: u64,
    recipients: Vec<String>,
    alert_message: String,
    target_class: ClassId,
    confidence_threshold: f32,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        Self {
            site_id: toml_config.site.id,
            sensor_gpio_pin: toml_config.sensor.gpio_pin,
            sensor_poll_interval_ms: toml_config.sensor.poll_interval_ms,
            camera_command: toml_config.camera.command,
            camera_output: toml_config.camera.output,
            camera_timeout_ms: toml_config.camera.timeout_ms,
            camera_width: toml_config.camera.width,
            camera_height: toml_config.camera.height,
            detector_command: toml_config.detector.command,
            detector_script: toml_config.detector.script,
            detector_weights: toml_config.detector.weights,
            detector_image_size: toml_config.detector.image_size,
            detector_runs_dir: toml_config.detector.runs_dir,
            modem_device: toml_config.modem.device,
            modem_baud: toml_config.modem.baud,
            modem_settle_ms: toml_config.modem.settle_ms,
            modem_send_settle_ms: toml_config.modem.send_settle_ms,
            recipients: toml_config.alert.recipients,
            alert_message: toml_config.alert.message,
            target_class: ClassId(toml_config.alert.target_class),
            confidence_threshold: toml_config.alert.confidence_threshold,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn sensor_gpio_pin(&self) -> u8 {
        self.sensor_gpio_pin
    }

    pub fn sensor_poll_interval_ms(&self) -> u64 {
        self.sensor_poll_interval_ms
    }

    pub fn camera_command(&self) -> &str {
        &self.camera_command
    }

    pub fn camera_output(&self) -> &str {
        &self.camera_output
    }

    pub fn camera_timeout_ms(&self) -> u64 {
        self.camera_timeout_ms
    }

    pub fn camera_width(&self) -> u32 {
        self.camera_width
    }

    pub fn camera_height(&self) -> u32 {
        self.camera_height
    }

    pub fn detector_command(&self) -> &str {
        &self.detector_command
    }

    pub fn detector_script(&self) -> &str {
        &self.detector_script
    }

    pub fn detector_weights(&self) -> &str {
        &self.detector_weights
    }

    pub fn detector_image_size(&self) -> u32 {
        self.detector_image_size
    }

    pub fn detector_runs_dir(&self) -> &str {
        &self.detector_runs_dir
    }

    pub fn modem_device(&self) -> &str {
        &self.modem_device
    }

    pub fn modem_baud(&self) -> u32 {
        self.modem_baud
    }

    pub fn modem_settle_ms(&self) -> u64 {
        self.modem_settle_ms
    }

    pub fn modem_send_settle_ms(&self) -> u64 {
        self.modem_send_settle_ms
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn alert_message(&self) -> &str {
        &self.alert_message
    }

    pub fn target_class(&self) -> ClassId {
        self.target_class
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the capture command
    #[cfg(test)]
    pub fn with_camera_command(mut self, command: &str) -> Self {
        self.camera_command = command.to_string();
        self
    }

    /// Builder method for tests to set the capture output path
    #[cfg(test)]
    pub fn with_camera_output(mut self, output: &str) -> Self {
        self.camera_output = output.to_string();
        self
    }

    /// Builder method for tests to set the runs directory
    #[cfg(test)]
    pub fn with_detector_runs_dir(mut self, dir: &str) -> Self {
        self.detector_runs_dir = dir.to_string();
        self
    }

    /// Builder method for tests to set the classifier command
    #[cfg(test)]
    pub fn with_detector_command(mut self, command: &str) -> Self {
        self.detector_command = command.to_string();
        self
    }

    /// Builder method for tests to set the classifier script
    #[cfg(test)]
    pub fn with_detector_script(mut self, script: &str) -> Self {
        self.detector_script = script.to_string();
        self
    }

    /// Builder method for tests to set the recipient list
    #[cfg(test)]
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sensor_gpio_pin(), 23);
        assert_eq!(config.camera_command(), "libcamera-jpeg");
        assert_eq!(config.camera_width(), 640);
        assert_eq!(config.camera_height(), 480);
        assert_eq!(config.camera_timeout_ms(), 1);
        assert_eq!(config.modem_device(), "/dev/serial0");
        assert_eq!(config.modem_baud(), 9600);
        assert_eq!(config.target_class(), ClassId(0));
        assert_eq!(config.confidence_threshold(), 0.5);
        assert_eq!(config.detector_runs_dir(), "runs/detect");
    }

    #[test]
    fn test_default_recipient_list() {
        let config = Config::default();
        assert_eq!(config.recipients().len(), 6);
        assert_eq!(config.recipients()[0], "+9779869990884");
        assert_eq!(config.recipients()[5], "+9779851210554");
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [alert]
            recipients = ["+100"]
            confidence_threshold = 0.8
            "#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "test");
        assert_eq!(config.recipients(), &["+100".to_string()]);
        assert_eq!(config.confidence_threshold(), 0.8);
        // Untouched sections keep their defaults
        assert_eq!(config.modem_baud(), 9600);
        assert_eq!(config.alert_message(), "Leopard detected at the site no.1 in Dadagaun");
    }
}
