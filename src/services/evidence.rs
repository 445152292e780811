//! Evidence cleanup for cycles with no detections
//!
//! A cycle leaves two artifacts on disk: the captured image and the
//! classifier's run directory. When the classifier finds nothing, both are
//! purged; the run directory is identified as the most-recently-modified
//! entry under the runs root. Both deletions are best-effort - a failure is
//! logged and never aborts the cycle.

use crate::domain::types::CapturedImage;
use crate::infra::config::Config;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{error, info};

pub struct EvidenceStore {
    runs_dir: PathBuf,
}

impl EvidenceStore {
    pub fn new(config: &Config) -> Self {
        Self { runs_dir: PathBuf::from(config.detector_runs_dir()) }
    }

    /// Delete the cycle's image artifact and latest run directory.
    /// Returns false if either deletion actually failed (a missing runs
    /// root is a no-op, not a failure).
    pub fn purge(&self, image: &CapturedImage) -> bool {
        let image_ok = self.delete_image(image.path());
        let run_ok = self.delete_latest_run();
        image_ok && run_ok
    }

    fn delete_image(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "evidence_image_deleted");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "evidence_image_delete_failed");
                false
            }
        }
    }

    /// Remove the most-recently-modified entry under the runs root.
    /// The classifier appends a new run directory per invocation, so the
    /// latest entry belongs to the current cycle.
    fn delete_latest_run(&self) -> bool {
        let entries = match fs::read_dir(&self.runs_dir) {
            Ok(entries) => entries,
            Err(_) => {
                info!(runs_dir = %self.runs_dir.display(), "no_detection_runs_found");
                return true;
            }
        };

        let latest = entries
            .flatten()
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((entry.path(), modified))
            })
            .max_by_key(|(_, modified)| *modified);

        let Some((run_dir, modified)) = latest else {
            info!(runs_dir = %self.runs_dir.display(), "no_detection_runs_found");
            return true;
        };

        let age_secs = SystemTime::now()
            .duration_since(modified)
            .map(|age| age.as_secs())
            .unwrap_or(0);

        match fs::remove_dir_all(&run_dir) {
            Ok(()) => {
                info!(run_dir = %run_dir.display(), age_secs = %age_secs, "detection_run_deleted");
                true
            }
            Err(e) => {
                error!(run_dir = %run_dir.display(), error = %e, "detection_run_delete_failed");
                false
            }
        }
    }
}
