//! Property-based tests for focustuin_core geometry and threshold config.

use focustuin_core::{FocusZoneConfig, SmoothedPosition, Viewport};
use proptest::prelude::*;

proptest! {
    /// Clamping always lands inside the viewport and is idempotent.
    #[test]
    fn clamp_stays_inside_viewport(
        w in 1.0f64..4000.0,
        h in 1.0f64..4000.0,
        x in -10_000.0f64..10_000.0,
        y in -10_000.0f64..10_000.0,
    ) {
        let vp = Viewport::new(w, h);
        let (cx, cy) = vp.clamp(x, y);
        prop_assert!((0.0..=w).contains(&cx));
        prop_assert!((0.0..=h).contains(&cy));
        prop_assert_eq!(vp.clamp(cx, cy), (cx, cy));
    }

    /// The enter threshold never exceeds the exit threshold, whatever the band.
    #[test]
    fn enter_threshold_not_above_exit(
        base in 1.0f64..200.0,
        ring in 0.5f64..3.0,
        tolerance in 0.5f64..3.0,
        hysteresis in 0.0f64..50.0,
    ) {
        let cfg = FocusZoneConfig {
            base_radius_px: base,
            ring_multiplier: ring,
            tolerance_multiplier: tolerance,
            hysteresis_px: hysteresis,
            ..FocusZoneConfig::default()
        };
        prop_assert!(cfg.enter_threshold() <= cfg.exit_threshold());
        prop_assert!(cfg.enter_threshold() >= 0.0);
    }

    /// Distance from center is symmetric under reflection through the center.
    #[test]
    fn distance_from_center_symmetric(
        dx in -500.0f64..500.0,
        dy in -500.0f64..500.0,
    ) {
        let vp = Viewport::new(1000.0, 1000.0);
        let a = SmoothedPosition::new(500.0 + dx, 500.0 + dy, 1.0);
        let b = SmoothedPosition::new(500.0 - dx, 500.0 - dy, 1.0);
        prop_assert!((vp.distance_from_center(&a) - vp.distance_from_center(&b)).abs() < 1e-9);
    }
}
