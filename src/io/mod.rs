//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `motion` - GPIO monitoring of the PIR motion sensor
//! - `camera` - still capture via the external camera command
//! - `modem` - SMS delivery over the serial GSM modem

pub mod camera;
pub mod modem;
pub mod motion;

// Re-export commonly used types
pub use camera::CameraCapture;
pub use modem::{AlertSender, SmsModem};
pub use motion::MotionMonitor;
