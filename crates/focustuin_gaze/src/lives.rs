//! Life counter charged on every lost focus.

use focustuin_core::{LifeQuery, SessionEvent};
use serde::Serialize;
use tracing::info;

pub const DEFAULT_LIVES: u32 = 2;

/// Invariant: `is_dead == (remaining == 0)`, and once dead the counter is
/// frozen until [`LifeTracker::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivesCounter {
    pub remaining: u32,
    pub is_dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeEvent {
    LifeLost { remaining_lives: u32 },
    UserDead { total_focus_ms: u64 },
}

impl From<LifeEvent> for SessionEvent {
    fn from(event: LifeEvent) -> Self {
        match event {
            LifeEvent::LifeLost { remaining_lives } => SessionEvent::LifeLost { remaining_lives },
            LifeEvent::UserDead { total_focus_ms } => SessionEvent::UserDead { total_focus_ms },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifeTracker {
    counter: LivesCounter,
    initial_lives: u32,
}

impl Default for LifeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LIVES)
    }
}

impl LifeTracker {
    /// At least one life is always granted.
    pub fn new(initial_lives: u32) -> Self {
        let initial_lives = initial_lives.max(1);
        Self {
            counter: LivesCounter {
                remaining: initial_lives,
                is_dead: false,
            },
            initial_lives,
        }
    }

    /// Charge one life. Returns the events to publish, in order; empty once dead.
    pub fn on_focus_exited(&mut self, total_focus_ms: u64) -> Vec<LifeEvent> {
        if self.counter.is_dead {
            return Vec::new();
        }

        self.counter.remaining = self.counter.remaining.saturating_sub(1);
        let mut events = vec![LifeEvent::LifeLost {
            remaining_lives: self.counter.remaining,
        }];
        info!("Life lost, {} remaining", self.counter.remaining);

        if self.counter.remaining == 0 {
            self.counter.is_dead = true;
            info!("User dead after {}ms of total focus", total_focus_ms);
            events.push(LifeEvent::UserDead { total_focus_ms });
        }
        events
    }

    /// Only called on an explicit session restart.
    pub fn reset(&mut self) {
        self.counter = LivesCounter {
            remaining: self.initial_lives,
            is_dead: false,
        };
    }

    pub fn counter(&self) -> LivesCounter {
        self.counter
    }
}

impl LifeQuery for LifeTracker {
    fn remaining_lives(&self) -> u32 {
        self.counter.remaining
    }

    fn is_dead(&self) -> bool {
        self.counter.is_dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_lives_then_dead() {
        let mut lives = LifeTracker::default();
        assert_eq!(lives.remaining_lives(), 2);

        let events = lives.on_focus_exited(500);
        assert_eq!(events, vec![LifeEvent::LifeLost { remaining_lives: 1 }]);
        assert!(!lives.is_dead());

        let events = lives.on_focus_exited(1200);
        assert_eq!(
            events,
            vec![
                LifeEvent::LifeLost { remaining_lives: 0 },
                LifeEvent::UserDead { total_focus_ms: 1200 },
            ]
        );
        assert!(lives.is_dead());
    }

    #[test]
    fn test_no_op_when_dead() {
        let mut lives = LifeTracker::new(1);
        lives.on_focus_exited(0);
        assert!(lives.on_focus_exited(0).is_empty());
        assert_eq!(lives.counter(), LivesCounter { remaining: 0, is_dead: true });
    }

    #[test]
    fn test_reset_restores_initial() {
        let mut lives = LifeTracker::new(3);
        lives.on_focus_exited(0);
        lives.reset();
        assert_eq!(lives.counter(), LivesCounter { remaining: 3, is_dead: false });
    }

    #[test]
    fn test_zero_initial_lives_grants_one() {
        let lives = LifeTracker::new(0);
        assert_eq!(lives.remaining_lives(), 1);
        assert!(!lives.is_dead());
    }

    #[test]
    fn test_into_session_event() {
        let e: SessionEvent = LifeEvent::UserDead { total_focus_ms: 9 }.into();
        assert_eq!(e, SessionEvent::UserDead { total_focus_ms: 9 });
    }
}
