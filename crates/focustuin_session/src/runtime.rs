use crate::coordinator::{SessionCoordinator, SessionPhase};
use crate::tasks::TaskSet;
use focustuin_core::{
    Clock, EventBus, FocusTuinConfig, GazeSample, SessionEvent, TokioClock, Viewport,
};
use focustuin_distraction::{InteractionKind, InteractionOutcome};
use focustuin_gaze::CalibrationCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{Instant, MissedTickBehavior};

// ============================================================================
// Session
// ============================================================================

/// Handle to a live session. Cheap to clone; all clones drive the same state.
///
/// Events are published while the session lock is held, so every listener
/// sees them in processing order.
#[derive(Clone)]
pub struct Session {
    core: Arc<Mutex<SessionCoordinator>>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    tasks: Arc<TaskSet>,
    /// Generation + 1 of the last armed timer set, 0 before the first start.
    /// Only touched under the session lock.
    armed: Arc<AtomicU64>,
}

impl Session {
    /// Build a session on the tokio clock. Must be called inside a runtime.
    pub fn new(config: FocusTuinConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(config: FocusTuinConfig, clock: Arc<dyn Clock>) -> Self {
        let seed = config.session.seed.unwrap_or_else(rand::random);
        let calibration = config.calibration.cache_path.as_ref().and_then(|path| {
            CalibrationCache::new(path, config.calibration.dimension_tolerance_px)
                .load_valid(&config.session.viewport)
        });

        let mut core = SessionCoordinator::new(config, seed, clock.now_ms());
        if let Some(record) = calibration {
            core.apply_calibration(&record);
        }
        tracing::debug!("Session created (seed {})", seed);

        Self {
            core: Arc::new(Mutex::new(core)),
            bus: EventBus::default(),
            clock,
            tasks: Arc::new(TaskSet::new()),
            armed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Current session time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// A sample stamped with the session clock.
    pub fn sample(&self, x: f64, y: f64, confidence: Option<f64>) -> GazeSample {
        GazeSample {
            x,
            y,
            confidence,
            timestamp: self.now_ms(),
        }
    }

    /// Arm the popup, balance, surveillance and statistics timers. A no-op
    /// when they are already armed for the current run.
    pub async fn start(&self) {
        let core = self.core.lock().await;
        if core.phase() != SessionPhase::Running {
            tracing::warn!("Session not running, timers not armed");
            return;
        }
        if self.armed.load(Ordering::SeqCst) == core.generation() + 1 {
            tracing::warn!("Session already started, timers left as they are");
            return;
        }
        self.arm_timers(&core);
        tracing::info!("Session started");
    }

    /// Feed one gaze sample through the whole pipeline.
    pub async fn ingest(&self, sample: GazeSample) {
        let mut core = self.core.lock().await;
        let events = core.ingest(&sample);
        for event in events {
            self.bus.publish(event);
        }
        if core.phase() == SessionPhase::Dead {
            let cancelled = self.tasks.cancel_all();
            if cancelled > 0 {
                tracing::info!("Visitor is out of lives, {} timers cancelled", cancelled);
            }
        }
    }

    pub async fn record_interaction(&self, kind: InteractionKind) -> InteractionOutcome {
        let mut core = self.core.lock().await;
        let (outcome, events) = core.record_interaction(kind, self.clock.now_ms());
        for event in events {
            self.bus.publish(event);
        }
        outcome
    }

    pub async fn resize(&self, viewport: Viewport) {
        let mut core = self.core.lock().await;
        let event = core.resize(viewport);
        self.bus.publish(event);
    }

    /// Full reset: lives, focus, tuning and timers.
    pub async fn restart(&self) {
        self.tasks.cancel_all();
        let mut core = self.core.lock().await;
        let event = core.restart(self.clock.now_ms());
        self.bus.publish(event);
        self.arm_timers(&core);
    }

    pub async fn stop(&self) {
        let cancelled = self.tasks.cancel_all();
        let mut core = self.core.lock().await;
        let event = core.stop();
        self.bus.publish(event);
        tracing::info!("Session stopped ({} timers cancelled)", cancelled);
    }

    pub async fn phase(&self) -> SessionPhase {
        self.core.lock().await.phase()
    }

    pub async fn remaining_lives(&self) -> u32 {
        self.core.lock().await.remaining_lives()
    }

    pub async fn calibration_offset(&self) -> (f64, f64) {
        self.core.lock().await.calibration_offset()
    }

    /// Run `f` against the coordinator under the session lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&SessionCoordinator) -> R) -> R {
        let core = self.core.lock().await;
        f(&core)
    }

    /// Timers currently scheduled.
    pub fn active_timers(&self) -> usize {
        self.tasks.active()
    }

    fn arm_timers(&self, core: &SessionCoordinator) {
        self.armed.store(core.generation() + 1, Ordering::SeqCst);
        let ctx = TimerContext {
            core: Arc::clone(&self.core),
            bus: self.bus.clone(),
            clock: Arc::clone(&self.clock),
            tasks: Arc::downgrade(&self.tasks),
            generation: core.generation(),
        };
        let config = core.config();
        let balance_every = period(config.distraction.balance.check_interval_ms);
        let stats_every = period(config.session.stats_interval_ms);

        self.tasks.spawn(ctx.clone().popup_loop());
        self.tasks.spawn(ctx.clone().balance_loop(balance_every));
        if config.distraction.surveillance.enabled {
            let every = period(config.distraction.surveillance.update_interval_ms);
            self.tasks.spawn(ctx.clone().surveillance_loop(every));
        }
        self.tasks.spawn(ctx.stats_loop(stats_every));
    }
}

fn period(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

fn ticker(every: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

// ============================================================================
// Timer loops
// ============================================================================

/// What a timer task needs. Holds the task set weakly so dropping the last
/// [`Session`] handle still aborts every timer.
#[derive(Clone)]
struct TimerContext {
    core: Arc<Mutex<SessionCoordinator>>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    tasks: Weak<TaskSet>,
    generation: u64,
}

impl TimerContext {
    async fn popup_loop(self) {
        loop {
            let delay = {
                let mut core = self.core.lock().await;
                if !core.is_current(self.generation) {
                    return;
                }
                core.plan_popup(self.clock.now_ms()).delay()
            };
            tokio::time::sleep(delay).await;

            let mut core = self.core.lock().await;
            if !core.is_current(self.generation) {
                return;
            }
            if let Some(notice) = core.popup_due(self.clock.now_ms()) {
                let (id, lifetime) = (notice.id, notice.lifetime_ms);
                self.bus.publish(SessionEvent::PopupFired(notice));
                if let Some(tasks) = self.tasks.upgrade() {
                    tasks.spawn(self.clone().dismiss_after(id, Duration::from_millis(lifetime)));
                }
            }
        }
    }

    async fn dismiss_after(self, id: u64, lifetime: Duration) {
        tokio::time::sleep(lifetime).await;
        let mut core = self.core.lock().await;
        if core.generation() != self.generation {
            return;
        }
        if let Some(event) = core.dismiss_popup(id) {
            self.bus.publish(event);
        }
    }

    async fn balance_loop(self, every: Duration) {
        let mut interval = ticker(every);
        loop {
            interval.tick().await;
            let mut core = self.core.lock().await;
            if !core.is_current(self.generation) {
                return;
            }
            let now = self.clock.now_ms();
            let outcome = core.balance_check(now);
            for event in outcome.events {
                self.bus.publish(event);
            }
            if let Some(pulse) = outcome.pulse {
                let wait = Duration::from_millis(pulse.revert_at.saturating_sub(now));
                if let Some(tasks) = self.tasks.upgrade() {
                    tasks.spawn(self.clone().revert_after(pulse.id, wait));
                }
            }
        }
    }

    async fn revert_after(self, pulse_id: u64, wait: Duration) {
        tokio::time::sleep(wait).await;
        let mut core = self.core.lock().await;
        if core.generation() == self.generation {
            core.revert_pulse(pulse_id);
        }
    }

    async fn surveillance_loop(self, every: Duration) {
        let mut interval = ticker(every);
        loop {
            interval.tick().await;
            let mut core = self.core.lock().await;
            if !core.is_current(self.generation) {
                return;
            }
            if let Some(event) = core.surveillance_update(self.clock.now_ms()) {
                self.bus.publish(event);
            }
        }
    }

    async fn stats_loop(self, every: Duration) {
        let mut interval = ticker(every);
        loop {
            interval.tick().await;
            let core = self.core.lock().await;
            if !core.is_current(self.generation) {
                return;
            }
            if let Some(event) = core.focus_stats(self.clock.now_ms()) {
                self.bus.publish(event);
            }
        }
    }
}
