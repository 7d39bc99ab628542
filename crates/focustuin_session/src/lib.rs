//! # Focus Tuin Session
//!
//! The live session: one [`SessionCoordinator`] holding every stateful
//! component behind a single lock, driven by incoming gaze samples and by
//! four cancellable timer loops (popups, balance, surveillance, focus stats).
//!
//! Each sample is processed to completion (smoothing → focus → lives →
//! scheduler) and its events published before anything else may touch the
//! session. Restart, stop and death abort every pending timer; timers that
//! were already past their abort point find a newer generation and do nothing.

mod coordinator;
mod runtime;
mod tasks;

pub use coordinator::{BalanceOutcome, SessionCoordinator, SessionPhase};
pub use runtime::Session;
pub use tasks::TaskSet;
