//! Property-based tests for scheduler timing and the balance feedback loop.
//!
//! Covers the interval floor under arbitrary tuning, the time-boxed
//! dampening pulse, and the bounds on the very first popup delay.

use focustuin_core::{DistractionConfig, FocusQuery};
use focustuin_distraction::{BalanceMonitor, DistractionScheduler, InteractionKind};
use proptest::prelude::*;

/// A visitor who has not focused yet.
struct NeverFocused;

impl FocusQuery for NeverFocused {
    fn is_focused(&self) -> bool {
        false
    }
    fn last_focus_started_at(&self) -> Option<u64> {
        None
    }
    fn current_focus_duration_ms(&self, _now_ms: u64) -> u64 {
        0
    }
    fn total_focus_ms(&self, _now_ms: u64) -> u64 {
        0
    }
}

fn press_buttons(scheduler: &mut DistractionScheduler, count: usize, now: u64) {
    for _ in 0..count {
        scheduler.record_interaction(
            InteractionKind::PseudoControl {
                label: "PRIVACY MODE".into(),
            },
            now,
        );
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

// ============================================================================
// Strategies
// ============================================================================

fn arb_config() -> impl Strategy<Value = DistractionConfig> {
    (
        0.01f64..20.0,
        0.01f64..20.0,
        1_000.0f64..60_000.0,
    )
        .prop_map(|(master, popup, min_interval)| {
            let mut config = DistractionConfig::default();
            config.intensity.master = master;
            config.intensity.popup = popup;
            config.timing.popup_min_interval_ms = min_interval;
            config
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Whatever the tuning, the delay never undercuts the floor.
    #[test]
    fn interval_never_below_floor(
        config in arb_config(),
        focus_ms in 0u64..600_000,
        session_ms in 0u64..3_600_000,
        jitter in 0.0f64..2_000.0,
    ) {
        let scheduler = DistractionScheduler::new(&config, 1, 0);
        let plan = scheduler.compute_plan(focus_ms, session_ms, jitter);
        let floor = config.timing.popup_min_interval_ms
            * DistractionScheduler::difficulty_multiplier(focus_ms as f64 / 1000.0);

        prop_assert!(plan.safe_ms >= floor);
        prop_assert!(plan.delay_ms() as f64 + 0.5 >= floor);
    }

    /// The pulse is divided back out after the cooldown even while the
    /// visitor is still overwhelmed.
    #[test]
    fn dampening_pulse_reverts_after_cooldown(
        master in 0.2f64..3.0,
        min_interval in 1_000.0f64..20_000.0,
        presses in 19usize..60,
        checks in 0u64..4,
    ) {
        let mut config = DistractionConfig::default();
        config.balance.adaptive_scaling = false;
        config.intensity.master = master;
        config.timing.popup_min_interval_ms = min_interval;

        let mut scheduler = DistractionScheduler::new(&config, 3, 0);
        let mut monitor = BalanceMonitor::new(&config.balance);
        press_buttons(&mut scheduler, presses, 0);

        let pulse = monitor.check_and_adjust(&mut scheduler, 0).pulse;
        prop_assert!(pulse.is_some());
        prop_assert!(!close(scheduler.config().intensity.master, master));

        // Keep the overwhelm going through further checks
        for i in 1..=checks {
            let now = i * 15_000;
            press_buttons(&mut scheduler, presses, now);
            let report = monitor.check_and_adjust(&mut scheduler, now);
            prop_assert!(report.overwhelmed);
            prop_assert!(report.pulse.is_none());
        }

        press_buttons(&mut scheduler, presses, 60_000);
        prop_assert_eq!(monitor.revert_due(&mut scheduler, 60_000), 1);
        prop_assert!(monitor.check_and_adjust(&mut scheduler, 60_000).overwhelmed);
        prop_assert!(close(scheduler.config().intensity.master, master));
        prop_assert!(close(scheduler.config().timing.popup_min_interval_ms, min_interval));
    }

    /// With no focus history the first delay sits between the minimum
    /// interval and the session-scaled interval plus full jitter.
    #[test]
    fn first_popup_within_bounds(seed in any::<u64>(), now in 0u64..300_000) {
        let mut scheduler = DistractionScheduler::new(&DistractionConfig::default(), seed, 0);
        let plan = scheduler.plan_next(&NeverFocused, now);
        let session_multiplier = 1.0 + now as f64 / 300_000.0;

        prop_assert!(plan.delay_ms() >= 3_000);
        prop_assert!(plan.delay_ms() as f64 <= 3_000.0 * session_multiplier + 2_000.0 + 0.5);
    }
}
