//! Gaze geometry shared by every stage of the pipeline.

use serde::{Deserialize, Serialize};

/// A raw gaze estimate pushed by an external source (camera backend or
/// pointer fallback), in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    /// Estimator confidence in `[0, 1]`. Missing or non-positive values weigh as 1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Milliseconds on the session clock.
    pub timestamp: u64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, timestamp: u64) -> Self {
        Self {
            x,
            y,
            confidence: None,
            timestamp,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Both coordinates are real numbers. Sources emit NaN when the
    /// estimator loses the eyes; such samples must be dropped, not clamped.
    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Weight used by the smoothing window.
    pub fn weight(&self) -> f64 {
        match self.confidence {
            Some(c) if c.is_finite() && c > 0.0 => c.min(1.0),
            _ => 1.0,
        }
    }
}

/// Confidence-weighted average over the smoothing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPosition {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl SmoothedPosition {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// Euclidean distance to an arbitrary point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Screen dimensions in pixels. Re-read on every resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Clamp a point into `[0, width] × [0, height]`.
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    pub fn distance_from_center(&self, position: &SmoothedPosition) -> f64 {
        let (cx, cy) = self.center();
        position.distance_to(cx, cy)
    }
}

/// A position expressed as percentages of the viewport (0–100 on each axis).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPercent {
    pub x: f64,
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_defaults_to_one() {
        let s = GazeSample::new(1.0, 2.0, 0);
        assert_eq!(s.weight(), 1.0);
        assert_eq!(s.with_confidence(0.0).weight(), 1.0);
        assert_eq!(s.with_confidence(f64::NAN).weight(), 1.0);
        assert!((s.with_confidence(0.4).weight() - 0.4).abs() < 1e-12);
        assert_eq!(s.with_confidence(3.0).weight(), 1.0);
    }

    #[test]
    fn test_malformed_sample_detected() {
        assert!(!GazeSample::new(f64::NAN, 0.0, 0).is_well_formed());
        assert!(!GazeSample::new(0.0, f64::INFINITY, 0).is_well_formed());
        assert!(GazeSample::new(-50.0, 5000.0, 0).is_well_formed());
    }

    #[test]
    fn test_viewport_clamp_and_center() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.center(), (400.0, 300.0));
        assert_eq!(vp.clamp(-10.0, 700.0), (0.0, 600.0));
        assert_eq!(vp.clamp(100.0, 100.0), (100.0, 100.0));
    }

    #[test]
    fn test_sample_deserializes_without_confidence() {
        let s: GazeSample = serde_json::from_str(r#"{"x": 10.0, "y": 20.0, "timestamp": 5}"#).unwrap();
        assert_eq!(s.confidence, None);
        assert_eq!(s.timestamp, 5);
    }
}
