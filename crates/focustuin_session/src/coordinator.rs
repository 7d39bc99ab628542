//! Synchronous session core.
//!
//! Every method runs to completion and returns the events it produced, in
//! publication order. The async runtime only decides *when* to call in.

use focustuin_core::{
    FocusQuery, FocusTuinConfig, GazeSample, LifeQuery, PopupNotice, SessionEvent, Viewport,
};
use focustuin_distraction::{
    BalanceMonitor, DampeningPulse, DistractionScheduler, InteractionKind, InteractionOutcome,
    IntervalPlan,
};
use focustuin_gaze::{CalibrationRecord, FocusStateMachine, GazeAggregator, LifeEvent, LifeTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running,
    /// Out of lives; only a restart brings the session back.
    Dead,
    Stopped,
}

/// Result of one periodic balance check.
#[derive(Debug, Clone, Default)]
pub struct BalanceOutcome {
    pub events: Vec<SessionEvent>,
    /// Newly applied pulse; the caller schedules its revert.
    pub pulse: Option<DampeningPulse>,
}

pub struct SessionCoordinator {
    config: FocusTuinConfig,
    viewport: Viewport,
    aggregator: GazeAggregator,
    focus: FocusStateMachine,
    lives: LifeTracker,
    scheduler: DistractionScheduler,
    balance: BalanceMonitor,
    phase: SessionPhase,
    /// Bumped on every restart; timers compare it to detect staleness.
    generation: u64,
}

impl SessionCoordinator {
    pub fn new(config: FocusTuinConfig, seed: u64, now: u64) -> Self {
        let viewport = config.session.viewport;
        let scheduler = DistractionScheduler::new(&config.distraction, seed, now);
        Self {
            aggregator: GazeAggregator::new(config.focus.smoothing_window_ms, viewport),
            focus: FocusStateMachine::new(config.focus.clone(), viewport),
            lives: LifeTracker::new(config.session.initial_lives),
            balance: BalanceMonitor::new(&scheduler.config().balance),
            scheduler,
            viewport,
            config,
            phase: SessionPhase::Running,
            generation: 0,
        }
    }

    /// Use a cached calibration offset for every following sample.
    pub fn apply_calibration(&mut self, record: &CalibrationRecord) {
        self.aggregator.set_offset(record.offset_x, record.offset_y);
    }

    // ------------------------------------------------------------------
    // Gaze pipeline
    // ------------------------------------------------------------------

    /// Smooth, evaluate focus, charge lives, feed the scheduler.
    ///
    /// Malformed samples and samples arriving outside a running session
    /// produce nothing.
    pub fn ingest(&mut self, sample: &GazeSample) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::Running {
            return Vec::new();
        }
        let Some(position) = self.aggregator.ingest(sample) else {
            return Vec::new();
        };
        let now = sample.timestamp;

        let mut events = vec![SessionEvent::PositionUpdated {
            position,
            confidence: position.confidence,
            timestamp: now,
        }];

        let Some(transition) = self.focus.evaluate(&position, now).transition else {
            return events;
        };

        if transition.focused {
            self.scheduler.record_focus_entered(transition.distance);
            events.push(SessionEvent::FocusEntered(transition));
            return events;
        }

        let life_events = self.lives.on_focus_exited(self.focus.total_focus_ms(now));
        self.scheduler
            .record_focus_exited(self.focus.last_streak_ms());
        events.push(SessionEvent::FocusExited(transition));

        for event in life_events {
            match event {
                LifeEvent::LifeLost { .. } => self.scheduler.on_life_lost(),
                LifeEvent::UserDead { total_focus_ms } => {
                    self.phase = SessionPhase::Dead;
                    self.scheduler.deactivate();
                    tracing::info!("Session over after {}ms of focus", total_focus_ms);
                }
            }
            events.push(event.into());
        }
        events
    }

    // ------------------------------------------------------------------
    // Timer callbacks
    // ------------------------------------------------------------------

    pub fn plan_popup(&mut self, now: u64) -> IntervalPlan {
        self.scheduler.plan_next(&self.focus, now)
    }

    /// Popup timer fired: gate, then maybe fire.
    pub fn popup_due(&mut self, now: u64) -> Option<PopupNotice> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        self.scheduler.try_fire(&self.focus, &self.lives, now)
    }

    pub fn dismiss_popup(&mut self, id: u64) -> Option<SessionEvent> {
        self.scheduler
            .dismiss_popup(id)
            .then_some(SessionEvent::PopupDismissed { id })
    }

    pub fn balance_check(&mut self, now: u64) -> BalanceOutcome {
        if self.phase != SessionPhase::Running {
            return BalanceOutcome::default();
        }
        let report = self.balance.check_and_adjust(&mut self.scheduler, now);
        let mut outcome = BalanceOutcome {
            pulse: report.pulse,
            ..BalanceOutcome::default()
        };
        if report.overwhelm_changed {
            outcome.events.push(SessionEvent::OverwhelmChanged {
                overwhelmed: report.overwhelmed,
            });
        }
        outcome
    }

    pub fn revert_pulse(&mut self, pulse_id: u64) -> bool {
        self.balance.revert_pulse(&mut self.scheduler, pulse_id)
    }

    pub fn surveillance_update(&mut self, now: u64) -> Option<SessionEvent> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        let reading = self.scheduler.surveillance_tick(&self.focus, now);
        Some(SessionEvent::SurveillanceUpdate {
            difficulty: reading.difficulty,
            focus_seconds: reading.focus_seconds,
            cognitive_harvest: reading.cognitive_harvest,
        })
    }

    /// Focus-time statistics; only while focused.
    pub fn focus_stats(&self, now: u64) -> Option<SessionEvent> {
        if self.phase != SessionPhase::Running || !self.focus.is_focused() {
            return None;
        }
        Some(SessionEvent::FocusTimeUpdate {
            total_focus_ms: self.focus.total_focus_ms(now),
            current_streak_ms: self.focus.current_focus_duration_ms(now),
        })
    }

    // ------------------------------------------------------------------
    // External signals
    // ------------------------------------------------------------------

    pub fn record_interaction(
        &mut self,
        kind: InteractionKind,
        now: u64,
    ) -> (InteractionOutcome, Vec<SessionEvent>) {
        let outcome = self.scheduler.record_interaction(kind, now);
        let events = outcome
            .escalation
            .map(|difficulty| SessionEvent::Escalation {
                difficulty,
                attention_debt: outcome.attention_debt,
            })
            .into_iter()
            .collect();
        (outcome, events)
    }

    pub fn resize(&mut self, viewport: Viewport) -> SessionEvent {
        self.viewport = viewport;
        self.aggregator.set_viewport(viewport);
        self.focus.set_viewport(viewport);
        tracing::debug!("Viewport resized to {}x{}", viewport.width, viewport.height);
        SessionEvent::ViewportResized { viewport }
    }

    /// Fresh lives, fresh focus state, configured tuning. Calibration and
    /// viewport survive.
    pub fn restart(&mut self, now: u64) -> SessionEvent {
        self.generation += 1;
        self.aggregator.reset();
        self.focus.reset();
        self.lives.reset();
        self.scheduler.reset(now);
        self.balance.reset();
        self.phase = SessionPhase::Running;
        tracing::info!("Session restarted (generation {})", self.generation);
        SessionEvent::SessionRestarted
    }

    pub fn stop(&mut self) -> SessionEvent {
        self.phase = SessionPhase::Stopped;
        self.scheduler.deactivate();
        SessionEvent::SessionStopped
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Running and not superseded by a restart.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.phase == SessionPhase::Running
    }

    pub fn config(&self) -> &FocusTuinConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn calibration_offset(&self) -> (f64, f64) {
        self.aggregator.offset()
    }

    pub fn focus(&self) -> &FocusStateMachine {
        &self.focus
    }

    pub fn lives(&self) -> &LifeTracker {
        &self.lives
    }

    pub fn scheduler(&self) -> &DistractionScheduler {
        &self.scheduler
    }

    pub fn remaining_lives(&self) -> u32 {
        self.lives.remaining_lives()
    }
}
