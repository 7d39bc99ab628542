//! Debounced focus/unfocus state machine.
//!
//! ```text
//!              d <= enter for >= stabilization
//!   Unfocused ─────────────────────────────────▶ Focused
//!       ▲                                           │
//!       └────────────────── d > exit ───────────────┘   (immediate)
//! ```
//!
//! `enter = R - hysteresis`, `exit = R + hysteresis`, where `R` is the
//! tolerance radius from [`FocusZoneConfig`]. Leaving the enter threshold
//! while stabilizing discards the dwell completely.

use focustuin_core::{FocusQuery, FocusTransition, FocusZoneConfig, SmoothedPosition, Viewport};
use serde::Serialize;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusPhase {
    Unfocused,
    Focused,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusEvaluation {
    /// Present only when the phase actually changed.
    pub transition: Option<FocusTransition>,
    pub focused: bool,
    pub distance: f64,
    /// The threshold that applied to this evaluation.
    pub threshold: f64,
}

impl FocusEvaluation {
    pub fn transitioned(&self) -> bool {
        self.transition.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct FocusStateMachine {
    config: FocusZoneConfig,
    viewport: Viewport,
    phase: FocusPhase,
    /// Set while unfocused and inside the enter threshold.
    entering_since: Option<u64>,
    /// Start of the ongoing streak.
    streak_started_at: Option<u64>,
    last_focus_started_at: Option<u64>,
    /// Sum of completed streaks.
    completed_focus_ms: u64,
    last_streak_ms: u64,
}

impl FocusStateMachine {
    pub fn new(config: FocusZoneConfig, viewport: Viewport) -> Self {
        Self {
            config,
            viewport,
            phase: FocusPhase::Unfocused,
            entering_since: None,
            streak_started_at: None,
            last_focus_started_at: None,
            completed_focus_ms: 0,
            last_streak_ms: 0,
        }
    }

    pub fn evaluate(&mut self, position: &SmoothedPosition, now: u64) -> FocusEvaluation {
        let distance = self.viewport.distance_from_center(position);

        match self.phase {
            FocusPhase::Unfocused => {
                let threshold = self.config.enter_threshold();
                let mut transition = None;

                if distance <= threshold {
                    let since = *self.entering_since.get_or_insert(now);
                    if now.saturating_sub(since) >= self.config.stabilization_delay_ms {
                        self.phase = FocusPhase::Focused;
                        self.entering_since = None;
                        self.streak_started_at = Some(now);
                        self.last_focus_started_at = Some(now);
                        debug!(
                            "Focus entered: distance={:.1}px <= {:.1}px after {}ms",
                            distance,
                            threshold,
                            now.saturating_sub(since)
                        );
                        transition = Some(self.transition(true, position, distance, now));
                    }
                } else if self.entering_since.take().is_some() {
                    trace!(
                        "Stabilization reset: distance={:.1}px > {:.1}px",
                        distance,
                        threshold
                    );
                }

                FocusEvaluation {
                    transition,
                    focused: self.phase == FocusPhase::Focused,
                    distance,
                    threshold,
                }
            }
            FocusPhase::Focused => {
                let threshold = self.config.exit_threshold();
                let mut transition = None;

                if distance > threshold {
                    self.phase = FocusPhase::Unfocused;
                    self.entering_since = None;
                    if let Some(start) = self.streak_started_at.take() {
                        self.last_streak_ms = now.saturating_sub(start);
                        self.completed_focus_ms += self.last_streak_ms;
                    }
                    debug!(
                        "Focus lost: distance={:.1}px > {:.1}px",
                        distance, threshold
                    );
                    transition = Some(self.transition(false, position, distance, now));
                }

                FocusEvaluation {
                    transition,
                    focused: self.phase == FocusPhase::Focused,
                    distance,
                    threshold,
                }
            }
        }
    }

    fn transition(
        &self,
        focused: bool,
        position: &SmoothedPosition,
        distance: f64,
        now: u64,
    ) -> FocusTransition {
        FocusTransition {
            focused,
            position: *position,
            distance,
            accuracy: self.accuracy(distance),
            timestamp: now,
        }
    }

    /// `max(0, 1 - distance / accuracy_reference_px)`.
    pub fn accuracy(&self, distance: f64) -> f64 {
        if self.config.accuracy_reference_px <= 0.0 {
            return 0.0;
        }
        (1.0 - distance / self.config.accuracy_reference_px).max(0.0)
    }

    pub fn phase(&self) -> FocusPhase {
        self.phase
    }

    pub fn entering_since(&self) -> Option<u64> {
        self.entering_since
    }

    /// Length of the most recently completed streak.
    pub fn last_streak_ms(&self) -> u64 {
        self.last_streak_ms
    }

    pub fn config(&self) -> &FocusZoneConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Back to the initial state; accumulated focus time is discarded.
    pub fn reset(&mut self) {
        self.phase = FocusPhase::Unfocused;
        self.entering_since = None;
        self.streak_started_at = None;
        self.last_focus_started_at = None;
        self.completed_focus_ms = 0;
        self.last_streak_ms = 0;
    }
}

impl FocusQuery for FocusStateMachine {
    fn is_focused(&self) -> bool {
        self.phase == FocusPhase::Focused
    }

    fn last_focus_started_at(&self) -> Option<u64> {
        self.last_focus_started_at
    }

    fn current_focus_duration_ms(&self, now_ms: u64) -> u64 {
        self.streak_started_at
            .map(|start| now_ms.saturating_sub(start))
            .unwrap_or(0)
    }

    fn total_focus_ms(&self, now_ms: u64) -> u64 {
        self.completed_focus_ms + self.current_focus_duration_ms(now_ms)
    }
}
