//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `pipeline` - Central capture/detect/alert/cleanup orchestrator
//! - `detector` - Classifier capability interface and subprocess runner
//! - `evidence` - Cleanup of per-cycle artifacts

pub mod detector;
pub mod evidence;
pub mod pipeline;

// Re-export commonly used types
pub use detector::{ObjectDetector, YoloProcessDetector};
pub use evidence::EvidenceStore;
pub use pipeline::{AlertPipeline, CycleOutcome};
