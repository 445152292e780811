//! Shared types for the wildguard pipeline

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Newtype wrapper for classifier class IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[repr(transparent)]
pub struct ClassId(pub u32);

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Motion sensor transition, produced by the PIR monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    Started,
    Stopped,
}

impl MotionEvent {
    pub fn as_str(&self) -> &str {
        match self {
            MotionEvent::Started => "started",
            MotionEvent::Stopped => "stopped",
        }
    }
}

/// Handle to the image artifact captured for the current cycle.
///
/// The capture command writes to a fixed path, so at most one image exists
/// at a time; each cycle's capture overwrites the previous one.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    path: PathBuf,
}

impl CapturedImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Axis-aligned bounding box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One classifier detection for a captured image
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: ClassId,
}

impl Detection {
    /// Whether this detection triggers an alert burst.
    ///
    /// Evaluated independently per detection: strictly above the confidence
    /// threshold and exactly the target class.
    pub fn qualifies(&self, threshold: f32, target: ClassId) -> bool {
        self.confidence > threshold && self.class == target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(confidence: f32, class: u32) -> Detection {
        Detection {
            bbox: BoundingBox { x1: 10.0, y1: 20.0, x2: 110.0, y2: 220.0 },
            confidence,
            class: ClassId(class),
        }
    }

    #[test]
    fn test_qualifies_above_threshold_target_class() {
        assert!(detection(0.9, 0).qualifies(0.5, ClassId(0)));
    }

    #[test]
    fn test_qualifies_threshold_is_strict() {
        // Exactly at the threshold does not qualify
        assert!(!detection(0.5, 0).qualifies(0.5, ClassId(0)));
        assert!(detection(0.500001, 0).qualifies(0.5, ClassId(0)));
    }

    #[test]
    fn test_qualifies_wrong_class() {
        assert!(!detection(0.9, 3).qualifies(0.5, ClassId(0)));
    }

    #[test]
    fn test_detection_from_classifier_json() {
        let json = r#"{"bbox":{"x1":1.0,"y1":2.0,"x2":3.0,"y2":4.0},"confidence":0.87,"class":0}"#;
        let d: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(d.class, ClassId(0));
        assert!((d.confidence - 0.87).abs() < f32::EPSILON);
        assert_eq!(d.bbox.x2, 3.0);
    }

    #[test]
    fn test_motion_event_as_str() {
        assert_eq!(MotionEvent::Started.as_str(), "started");
        assert_eq!(MotionEvent::Stopped.as_str(), "stopped");
    }
}
