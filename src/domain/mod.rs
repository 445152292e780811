//! Domain models - core types shared across the pipeline
//!
//! This module contains the canonical data types used throughout the system:
//! - `MotionEvent` - sensor transitions from the PIR monitor
//! - `CapturedImage` - handle to the current cycle's image artifact
//! - `Detection` - one classifier detection (box, confidence, class)

pub mod types;

// Re-export commonly used types at module level
pub use types::{BoundingBox, CapturedImage, ClassId, Detection, MotionEvent};
