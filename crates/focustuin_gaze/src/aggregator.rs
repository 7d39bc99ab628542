//! Trailing-window gaze smoother.

use focustuin_core::{GazeSample, SmoothedPosition, Viewport};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct WindowedSample {
    x: f64,
    y: f64,
    weight: f64,
    timestamp: u64,
}

/// Confidence-weighted moving average over the last `window_ms` of samples.
///
/// Invariant: after every accepted sample the window only holds entries with
/// `incoming.timestamp - entry.timestamp < window_ms`.
#[derive(Debug, Clone)]
pub struct GazeAggregator {
    window: VecDeque<WindowedSample>,
    window_ms: u64,
    viewport: Viewport,
    /// Calibration offset added before clamping.
    offset: (f64, f64),
    latest: Option<SmoothedPosition>,
}

impl GazeAggregator {
    pub fn new(window_ms: u64, viewport: Viewport) -> Self {
        Self {
            window: VecDeque::with_capacity(64),
            window_ms,
            viewport,
            offset: (0.0, 0.0),
            latest: None,
        }
    }

    /// Feed one sample and get the smoothed position back.
    ///
    /// Precondition: both coordinates are finite. A malformed sample is
    /// ignored (returns `None`, window untouched) because gaze sources drop
    /// out routinely and that must not disturb the pipeline.
    pub fn ingest(&mut self, sample: &GazeSample) -> Option<SmoothedPosition> {
        if !sample.is_well_formed() {
            tracing::trace!("Dropping malformed gaze sample at {}ms", sample.timestamp);
            return None;
        }

        let (x, y) = self
            .viewport
            .clamp(sample.x + self.offset.0, sample.y + self.offset.1);
        let weight = sample.weight();
        let now = sample.timestamp;

        self.window.push_back(WindowedSample {
            x,
            y,
            weight,
            timestamp: now,
        });
        let window_ms = self.window_ms;
        self.window
            .retain(|s| now.saturating_sub(s.timestamp) < window_ms);

        let smoothed = self
            .weighted_average()
            .unwrap_or_else(|| SmoothedPosition::new(x, y, weight));
        self.latest = Some(smoothed);
        Some(smoothed)
    }

    fn weighted_average(&self) -> Option<SmoothedPosition> {
        if self.window.is_empty() {
            return None;
        }
        let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
        for s in &self.window {
            sx += s.x * s.weight;
            sy += s.y * s.weight;
            sw += s.weight;
        }
        if sw <= 0.0 {
            return None;
        }
        Some(SmoothedPosition::new(
            sx / sw,
            sy / sw,
            sw / self.window.len() as f64,
        ))
    }

    /// Most recent smoothed position, if any sample was accepted yet.
    pub fn latest(&self) -> Option<SmoothedPosition> {
        self.latest
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// New bounds apply to samples accepted from now on.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_offset(&mut self, offset_x: f64, offset_y: f64) {
        self.offset = (offset_x, offset_y);
    }

    pub fn offset(&self) -> (f64, f64) {
        self.offset
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg() -> GazeAggregator {
        GazeAggregator::new(300, Viewport::new(1000.0, 800.0))
    }

    #[test]
    fn test_first_sample_passes_through() {
        let mut a = agg();
        let p = a.ingest(&GazeSample::new(120.0, 80.0, 0).with_confidence(0.5)).unwrap();
        assert_eq!((p.x, p.y), (120.0, 80.0));
        assert!((p.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_average() {
        let mut a = agg();
        a.ingest(&GazeSample::new(100.0, 100.0, 0).with_confidence(1.0));
        let p = a
            .ingest(&GazeSample::new(200.0, 300.0, 100).with_confidence(0.25))
            .unwrap();
        // x = (100*1 + 200*0.25) / 1.25 = 120
        assert!((p.x - 120.0).abs() < 1e-9);
        // y = (100*1 + 300*0.25) / 1.25 = 140
        assert!((p.y - 140.0).abs() < 1e-9);
        assert!((p.confidence - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_old_samples_evicted() {
        let mut a = agg();
        a.ingest(&GazeSample::new(0.0, 0.0, 0));
        a.ingest(&GazeSample::new(10.0, 10.0, 100));
        let p = a.ingest(&GazeSample::new(500.0, 500.0, 300)).unwrap();
        // Sample at t=0 is exactly 300ms old and must be gone.
        assert_eq!(a.len(), 2);
        assert!((p.x - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_bounds_clamped() {
        let mut a = agg();
        let p = a.ingest(&GazeSample::new(-40.0, 9000.0, 0)).unwrap();
        assert_eq!((p.x, p.y), (0.0, 800.0));
    }

    #[test]
    fn test_malformed_sample_ignored() {
        let mut a = agg();
        a.ingest(&GazeSample::new(10.0, 10.0, 0));
        assert!(a.ingest(&GazeSample::new(f64::NAN, 10.0, 10)).is_none());
        assert_eq!(a.len(), 1);
        assert_eq!(a.latest().unwrap().x, 10.0);
    }

    #[test]
    fn test_offset_applied_before_clamp() {
        let mut a = agg();
        a.set_offset(-20.0, 15.0);
        let p = a.ingest(&GazeSample::new(10.0, 100.0, 0)).unwrap();
        assert_eq!((p.x, p.y), (0.0, 115.0));
    }

    #[test]
    fn test_zero_window_returns_raw_clamped() {
        let mut a = GazeAggregator::new(0, Viewport::new(100.0, 100.0));
        let p = a.ingest(&GazeSample::new(150.0, 40.0, 7)).unwrap();
        assert_eq!((p.x, p.y), (100.0, 40.0));
        assert!(a.is_empty());
    }
}
