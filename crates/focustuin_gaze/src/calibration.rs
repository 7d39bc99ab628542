//! Last-calibration cache.
//!
//! A single JSON record: screen size, gaze offset, accuracy and when it was
//! taken. It is only reused on a screen of (nearly) the same size.

use anyhow::{Context, Result};
use focustuin_core::Viewport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Failed to read calibration cache: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid calibration cache: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "Calibration taken on {cached_width}x{cached_height}, current screen is {width}x{height}"
    )]
    ScreenMismatch {
        cached_width: f64,
        cached_height: f64,
        width: f64,
        height: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub screen_width: f64,
    pub screen_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Mean residual error of the calibration, in pixels.
    pub accuracy_px: f64,
    /// Unix milliseconds.
    pub timestamp_ms: i64,
}

impl CalibrationRecord {
    pub fn new(viewport: Viewport, offset_x: f64, offset_y: f64, accuracy_px: f64) -> Self {
        Self {
            screen_width: viewport.width,
            screen_height: viewport.height,
            offset_x,
            offset_y,
            accuracy_px,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Summed width and height difference stays under `tolerance_px`.
    pub fn matches(&self, viewport: &Viewport, tolerance_px: f64) -> bool {
        let diff = (self.screen_width - viewport.width).abs()
            + (self.screen_height - viewport.height).abs();
        diff < tolerance_px
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationCache {
    path: PathBuf,
    tolerance_px: f64,
}

impl CalibrationCache {
    pub fn new<P: Into<PathBuf>>(path: P, tolerance_px: f64) -> Self {
        Self {
            path: path.into(),
            tolerance_px,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a finished calibration. The CLI's `--calibrate` writes through here.
    pub fn store(&self, record: &CalibrationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write calibration cache: {}", self.path.display()))?;
        tracing::info!(
            "Calibration stored ({:.1}px accuracy) at {}",
            record.accuracy_px,
            self.path.display()
        );
        Ok(())
    }

    /// Load the record if it was taken on a screen matching `viewport`.
    pub fn load_for(&self, viewport: &Viewport) -> Result<CalibrationRecord, CalibrationError> {
        let content = std::fs::read_to_string(&self.path)?;
        let record: CalibrationRecord = serde_json::from_str(&content)?;
        if !record.matches(viewport, self.tolerance_px) {
            return Err(CalibrationError::ScreenMismatch {
                cached_width: record.screen_width,
                cached_height: record.screen_height,
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(record)
    }

    /// Like [`load_for`](Self::load_for), but a missing, corrupt or stale
    /// cache simply yields `None`.
    pub fn load_valid(&self, viewport: &Viewport) -> Option<CalibrationRecord> {
        match self.load_for(viewport) {
            Ok(record) => {
                tracing::info!(
                    "Loaded cached calibration: offset=({:.1}, {:.1}), accuracy={:.1}px",
                    record.offset_x,
                    record.offset_y,
                    record.accuracy_px
                );
                Some(record)
            }
            Err(CalibrationError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Discarding calibration cache: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("nested/calibration.json"), 100.0);
        let vp = Viewport::new(1920.0, 1080.0);
        let record = CalibrationRecord::new(vp, 12.0, -8.0, 23.5);
        cache.store(&record).unwrap();

        let loaded = cache.load_for(&vp).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_small_resize_still_matches() {
        let record = CalibrationRecord::new(Viewport::new(1920.0, 1080.0), 0.0, 0.0, 10.0);
        assert!(record.matches(&Viewport::new(1900.0, 1040.0), 100.0));
        assert!(!record.matches(&Viewport::new(1860.0, 1040.0), 100.0));
    }

    #[test]
    fn test_mismatched_screen_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CalibrationCache::new(dir.path().join("calibration.json"), 100.0);
        cache
            .store(&CalibrationRecord::new(Viewport::new(1920.0, 1080.0), 1.0, 1.0, 5.0))
            .unwrap();

        let small = Viewport::new(1280.0, 720.0);
        assert!(matches!(
            cache.load_for(&small),
            Err(CalibrationError::ScreenMismatch { .. })
        ));
        assert!(cache.load_valid(&small).is_none());
    }

    #[test]
    fn test_missing_and_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let cache = CalibrationCache::new(&path, 100.0);
        assert!(cache.load_valid(&Viewport::default()).is_none());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            cache.load_for(&Viewport::default()),
            Err(CalibrationError::Parse(_))
        ));
        assert!(cache.load_valid(&Viewport::default()).is_none());
    }
}
