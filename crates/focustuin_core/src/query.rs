//! Read-only views components expose to each other.
//!
//! The scheduler never reaches into the focus machine's fields; it asks
//! through these traits.

pub trait FocusQuery {
    fn is_focused(&self) -> bool;

    /// Start of the current (or most recent) confirmed focus streak.
    fn last_focus_started_at(&self) -> Option<u64>;

    /// Length of the ongoing streak, 0 while unfocused.
    fn current_focus_duration_ms(&self, now_ms: u64) -> u64;

    /// Completed streaks plus the ongoing one.
    fn total_focus_ms(&self, now_ms: u64) -> u64;
}

pub trait LifeQuery {
    fn remaining_lives(&self) -> u32;
    fn is_dead(&self) -> bool;
}
