//! # Focus Tuin Distraction
//!
//! Decides when the visitor gets interrupted, and how hard.
//!
//! - [`DistractionScheduler`]: interval computation, popup gating and firing,
//!   interaction tracking and the surveillance counters
//! - [`BalanceMonitor`]: periodic overwhelm check with temporary dampening
//!   and optional adaptive retuning
//! - [`PerformanceMetrics`]: rolling windows both of the above read from
//!
//! Nothing in this crate owns a timer. The session runtime calls in with the
//! current session time and schedules whatever delay comes back.

mod balance;
mod metrics;
mod popup;
mod scheduler;

pub use balance::{auto_adjust, check_overwhelm, BalanceMonitor, BalanceReport, DampeningPulse};
pub use metrics::{
    Interaction, InteractionKind, Performance, PerformanceMetrics, MAX_FOCUS_HISTORY,
    MAX_INTERACTION_HISTORY, RECENT_EVENT_HORIZON_MS,
};
pub use popup::{PopupCatalogue, PopupReply, PSEUDO_CONTROL_LABELS};
pub use scheduler::{
    BlockReason, DistractionScheduler, InteractionOutcome, IntervalPlan, PopupDecision,
    SurveillanceReading, ABSOLUTE_MIN_POPUP_INTERVAL_MS, MAX_INTENSITY, MIN_INTENSITY,
};
