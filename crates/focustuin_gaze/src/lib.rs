//! # Focus Tuin Gaze
//!
//! The fast half of the installation: turns noisy gaze estimates into a
//! stable focus signal and charges a life for every lost focus.
//!
//! ## Pipeline
//!
//! 1. [`GazeAggregator`] clamps each sample into the viewport and keeps a
//!    confidence-weighted trailing window (default 300ms)
//! 2. [`FocusStateMachine`] applies asymmetric enter/exit thresholds and a
//!    stabilization dwell before confirming focus; exit is immediate
//! 3. [`LifeTracker`] decrements the life counter on every focus exit
//!
//! The last calibration offset can be cached on disk with [`CalibrationCache`].

mod aggregator;
mod calibration;
mod focus;
mod lives;

pub use aggregator::GazeAggregator;
pub use calibration::{CalibrationCache, CalibrationError, CalibrationRecord};
pub use focus::{FocusEvaluation, FocusPhase, FocusStateMachine};
pub use lives::{LifeEvent, LifeTracker, LivesCounter};
