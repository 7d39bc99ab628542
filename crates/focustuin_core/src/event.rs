//! Typed session notifications and the in-process bus that fans them out.
//!
//! Every listener gets its own receiver; there is no ordering guarantee
//! between listeners, only within one receiver.

use crate::types::{ScreenPercent, SmoothedPosition, Viewport};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Payload of a focus-entered / focus-exited notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusTransition {
    pub focused: bool,
    pub position: SmoothedPosition,
    /// Distance from screen center in pixels.
    pub distance: f64,
    /// `max(0, 1 - distance / reference radius)`.
    pub accuracy: f64,
    pub timestamp: u64,
}

/// The five thematic popup families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupCategory {
    AttentionHarvesting,
    SystemNotice,
    FalseWarning,
    CognitiveDebt,
    PseudoControl,
}

impl PopupCategory {
    pub const ALL: [PopupCategory; 5] = [
        PopupCategory::AttentionHarvesting,
        PopupCategory::SystemNotice,
        PopupCategory::FalseWarning,
        PopupCategory::CognitiveDebt,
        PopupCategory::PseudoControl,
    ];

    /// Whether the rendered popup reacts to clicks.
    pub fn is_clickable(&self) -> bool {
        matches!(
            self,
            PopupCategory::AttentionHarvesting | PopupCategory::PseudoControl
        )
    }
}

/// A popup the rendering layer should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupNotice {
    pub id: u64,
    pub category: PopupCategory,
    pub screen_position_percent: ScreenPercent,
    pub lifetime_ms: u64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Continuous, high-frequency gaze cursor feed.
    PositionUpdated {
        position: SmoothedPosition,
        confidence: f64,
        timestamp: u64,
    },
    FocusEntered(FocusTransition),
    FocusExited(FocusTransition),
    LifeLost {
        remaining_lives: u32,
    },
    UserDead {
        total_focus_ms: u64,
    },
    PopupFired(PopupNotice),
    PopupDismissed {
        id: u64,
    },
    Escalation {
        difficulty: f64,
        attention_debt: u32,
    },
    OverwhelmChanged {
        overwhelmed: bool,
    },
    FocusTimeUpdate {
        total_focus_ms: u64,
        current_streak_ms: u64,
    },
    SurveillanceUpdate {
        difficulty: f64,
        focus_seconds: f64,
        cognitive_harvest: f64,
    },
    ViewportResized {
        viewport: Viewport,
    },
    SessionRestarted,
    SessionStopped,
}

impl SessionEvent {
    /// Short stable name, used for log lines and filtering.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PositionUpdated { .. } => "position_updated",
            SessionEvent::FocusEntered(_) => "focus_entered",
            SessionEvent::FocusExited(_) => "focus_exited",
            SessionEvent::LifeLost { .. } => "life_lost",
            SessionEvent::UserDead { .. } => "user_dead",
            SessionEvent::PopupFired(_) => "popup_fired",
            SessionEvent::PopupDismissed { .. } => "popup_dismissed",
            SessionEvent::Escalation { .. } => "escalation",
            SessionEvent::OverwhelmChanged { .. } => "overwhelm_changed",
            SessionEvent::FocusTimeUpdate { .. } => "focus_time_update",
            SessionEvent::SurveillanceUpdate { .. } => "surveillance_update",
            SessionEvent::ViewportResized { .. } => "viewport_resized",
            SessionEvent::SessionRestarted => "session_restarted",
            SessionEvent::SessionStopped => "session_stopped",
        }
    }
}

/// Default number of events a slow listener may lag behind before it
/// starts missing the oldest ones.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Multi-listener event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current listener. Having no listeners is not an error.
    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!("event: {}", event.name());
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
