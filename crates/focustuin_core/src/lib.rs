//! # Focus Tuin Core
//!
//! Shared vocabulary for the installation's attention pipeline:
//!
//! - **Geometry**: gaze samples, smoothed positions and the viewport
//! - **Events**: the typed notifications every stage publishes
//! - **Clock**: the millisecond session clock all stages agree on
//! - **Queries**: read-only views one component exposes to another
//! - **Config**: TOML configuration with environment overrides
//!
//! ## Data flow
//!
//! raw samples → smoothed position → focus state → life / distraction reactions,
//! with the distraction scheduler and balance monitor feeding back onto
//! their own tuning parameters.

pub mod clock;
pub mod config;
pub mod event;
pub mod query;
pub mod types;

pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{
    BalanceConfig, CalibrationConfig, DistractionConfig, DistractionPreset, FocusTuinConfig,
    FocusZoneConfig, IntensityConfig, MessageWeights, SessionConfig, SurveillanceConfig,
    TimingConfig,
};
pub use event::{EventBus, FocusTransition, PopupCategory, PopupNotice, SessionEvent};
pub use query::{FocusQuery, LifeQuery};
pub use types::{GazeSample, ScreenPercent, SmoothedPosition, Viewport};
