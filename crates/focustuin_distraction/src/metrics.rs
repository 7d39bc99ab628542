//! Rolling performance windows.

use focustuin_core::PopupCategory;
use serde::Serialize;
use std::collections::VecDeque;

/// Completed focus streaks kept for the average.
pub const MAX_FOCUS_HISTORY: usize = 20;
pub const MAX_INTERACTION_HISTORY: usize = 30;
/// Age after which an event no longer counts toward density.
pub const RECENT_EVENT_HORIZON_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionKind {
    /// Click on a popup body.
    PopupClick { category: PopupCategory },
    /// Click on one of the fake "take back control" buttons.
    PseudoControl { label: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub timestamp: u64,
}

/// Running focus quality against the level it is judged by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Performance {
    pub current: f64,
    pub baseline: f64,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            current: 1.0,
            baseline: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    /// Timestamps of popups fired and interactions made.
    recent_events: VecDeque<u64>,
    /// Completed streak lengths in seconds.
    focus_history: VecDeque<f64>,
    /// Focus intensity samples in `[0, 1]`.
    focus_quality: VecDeque<f64>,
    interaction_history: VecDeque<Interaction>,
    performance: Performance,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, now: u64) {
        self.recent_events.push_back(now);
        self.prune(now);
    }

    /// Drop events older than [`RECENT_EVENT_HORIZON_MS`].
    pub fn prune(&mut self, now: u64) {
        self.recent_events
            .retain(|ts| now.saturating_sub(*ts) < RECENT_EVENT_HORIZON_MS);
    }

    /// Events still inside the horizon as of the last prune.
    pub fn recent_event_count(&self) -> usize {
        self.recent_events.len()
    }

    pub fn record_focus_streak(&mut self, seconds: f64) {
        push_bounded(&mut self.focus_history, seconds, MAX_FOCUS_HISTORY);
    }

    /// Feed one intensity sample; `performance.current` tracks their mean.
    pub fn record_focus_quality(&mut self, intensity: f64) {
        push_bounded(
            &mut self.focus_quality,
            intensity.clamp(0.0, 1.0),
            MAX_FOCUS_HISTORY,
        );
        self.performance.current =
            self.focus_quality.iter().sum::<f64>() / self.focus_quality.len() as f64;
    }

    pub fn record_interaction(&mut self, kind: InteractionKind, now: u64) {
        push_bounded(
            &mut self.interaction_history,
            Interaction {
                kind,
                timestamp: now,
            },
            MAX_INTERACTION_HISTORY,
        );
        self.record_event(now);
    }

    /// Mean completed streak in seconds, `None` before the first one.
    pub fn average_focus_seconds(&self) -> Option<f64> {
        if self.focus_history.is_empty() {
            return None;
        }
        Some(self.focus_history.iter().sum::<f64>() / self.focus_history.len() as f64)
    }

    pub fn focus_history(&self) -> impl Iterator<Item = &f64> {
        self.focus_history.iter()
    }

    pub fn interaction_count(&self) -> usize {
        self.interaction_history.len()
    }

    pub fn interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.interaction_history.iter()
    }

    pub fn performance(&self) -> Performance {
        self.performance
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, cap: usize) {
    buf.push_back(value);
    while buf.len() > cap {
        buf.pop_front();
    }
}
