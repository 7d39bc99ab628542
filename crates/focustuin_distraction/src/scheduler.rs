//! Adaptive distraction scheduler.
//!
//! Owns the live tuning values, the performance windows and the popup RNG.
//! Every method takes the current session time so the caller decides what
//! "now" is; nothing here sleeps.

use crate::metrics::{InteractionKind, PerformanceMetrics};
use crate::popup::{random_lifetime, random_position, PopupCatalogue, PopupReply};
use focustuin_core::{DistractionConfig, FocusQuery, LifeQuery, PopupCategory, PopupNotice};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;

/// No popup interval is ever computed from a minimum below this.
pub const ABSOLUTE_MIN_POPUP_INTERVAL_MS: f64 = 1_000.0;
pub const MIN_INTENSITY: f64 = 0.1;
pub const MAX_INTENSITY: f64 = 5.0;

/// Session length over which the session multiplier ramps from 1 to 2.
const SESSION_RAMP_MS: f64 = 300_000.0;
/// Chance that a popup still gets through while overwhelmed.
const OVERWHELMED_PASS_CHANCE: f64 = 0.3;
const MAX_DIFFICULTY: f64 = 5.0;
const COGNITIVE_DEBT_PER_POPUP: u32 = 10;
const COGNITIVE_DEBT_PER_CONTROL_CLICK: u32 = 25;
/// Expired popups nobody dismissed are forgotten after this long.
const STALE_POPUP_GRACE_MS: u64 = 60_000;

/// Every factor that went into one popup delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalPlan {
    pub difficulty_multiplier: f64,
    pub session_multiplier: f64,
    pub focus_multiplier: f64,
    pub interaction_multiplier: f64,
    /// Effective minimum interval the plan started from.
    pub baseline_ms: f64,
    pub optimal_ms: f64,
    /// `optimal / master / popup * difficulty`, before bounding.
    pub final_ms: f64,
    /// `final_ms`, raised to the floor when it undercuts it.
    pub safe_ms: f64,
    pub jitter_ms: f64,
}

impl IntervalPlan {
    /// `baseline_ms * difficulty_multiplier`; `safe_ms` never drops below it.
    pub fn floor_ms(&self) -> f64 {
        self.baseline_ms * self.difficulty_multiplier
    }

    pub fn delay_ms(&self) -> u64 {
        (self.safe_ms + self.jitter_ms).round().max(0.0) as u64
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The session is stopped or the visitor is dead.
    Inactive,
    Dead,
    FocusTooShort,
    TooManyPopups,
    /// Overwhelmed, and the 30% pass roll failed.
    Overwhelmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PopupDecision {
    Show,
    Blocked(BlockReason),
}

impl PopupDecision {
    pub fn is_show(&self) -> bool {
        matches!(self, PopupDecision::Show)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionOutcome {
    pub reply: Option<PopupReply>,
    /// Difficulty level when the interaction escalated the session.
    pub escalation: Option<f64>,
    pub attention_debt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurveillanceReading {
    pub difficulty: f64,
    pub focus_seconds: f64,
    pub cognitive_harvest: f64,
}

#[derive(Debug, Clone, Copy)]
struct VisiblePopup {
    id: u64,
    expires_at: u64,
}

pub struct DistractionScheduler {
    /// Tuning as configured, restored on reset.
    base_config: DistractionConfig,
    /// Live tuning the balance logic scales in place.
    config: DistractionConfig,
    catalogue: PopupCatalogue,
    metrics: PerformanceMetrics,
    rng: StdRng,
    session_started_at: u64,
    active: bool,
    overwhelmed: bool,
    attention_debt: u32,
    cognitive_harvest: f64,
    visible: Vec<VisiblePopup>,
    next_popup_id: u64,
}

impl DistractionScheduler {
    /// Build from config; a preset in the config is applied here.
    pub fn new(config: &DistractionConfig, seed: u64, now: u64) -> Self {
        let resolved = config.resolved();
        Self {
            catalogue: PopupCatalogue::new(&resolved.message_weights),
            base_config: resolved.clone(),
            config: resolved,
            metrics: PerformanceMetrics::new(),
            rng: StdRng::seed_from_u64(seed),
            session_started_at: now,
            active: true,
            overwhelmed: false,
            attention_debt: 0,
            cognitive_harvest: 0.0,
            visible: Vec::new(),
            next_popup_id: 1,
        }
    }

    // ------------------------------------------------------------------
    // Effective values
    // ------------------------------------------------------------------

    /// Master intensity as used by the interval formula.
    pub fn effective_master(&self) -> f64 {
        clamp_intensity(self.config.intensity.master)
    }

    pub fn effective_popup_intensity(&self) -> f64 {
        clamp_intensity(self.config.intensity.popup)
    }

    pub fn effective_min_interval_ms(&self) -> f64 {
        let raw = self.config.timing.popup_min_interval_ms;
        if raw.is_finite() {
            raw.max(ABSOLUTE_MIN_POPUP_INTERVAL_MS)
        } else {
            ABSOLUTE_MIN_POPUP_INTERVAL_MS
        }
    }

    // ------------------------------------------------------------------
    // Interval computation
    // ------------------------------------------------------------------

    /// Shorter intervals the longer the current streak runs.
    pub fn difficulty_multiplier(focus_seconds: f64) -> f64 {
        (1.0 - 0.05 * focus_seconds).max(0.1)
    }

    /// Plan the delay until the next popup attempt.
    pub fn plan_next(&mut self, focus: &dyn FocusQuery, now: u64) -> IntervalPlan {
        let focus_ms = focus.current_focus_duration_ms(now);
        let session_ms = now.saturating_sub(self.session_started_at);
        let jitter_max = self.config.timing.popup_jitter_ms;
        let jitter = if jitter_max.is_finite() && jitter_max > 0.0 {
            self.rng.gen_range(0.0..jitter_max)
        } else {
            0.0
        };
        let plan = self.compute_plan(focus_ms, session_ms, jitter);
        tracing::debug!(
            "Next popup in {}ms (safe {:.0}ms, difficulty x{:.2})",
            plan.delay_ms(),
            plan.safe_ms,
            plan.difficulty_multiplier
        );
        plan
    }

    /// Deterministic part of [`plan_next`](Self::plan_next).
    pub fn compute_plan(&self, focus_ms: u64, session_ms: u64, jitter_ms: f64) -> IntervalPlan {
        let baseline = self.effective_min_interval_ms();
        let difficulty = Self::difficulty_multiplier(focus_ms as f64 / 1000.0);

        let session_multiplier = (1.0 + session_ms as f64 / SESSION_RAMP_MS).min(2.0);
        let focus_multiplier = match self.metrics.average_focus_seconds() {
            Some(avg) if avg > 10.0 => 0.8,
            _ => 1.0,
        };
        let interaction_multiplier = if self.metrics.interaction_count() > 5 {
            0.9
        } else {
            1.0
        };

        let optimal = (baseline * session_multiplier * focus_multiplier * interaction_multiplier)
            .max(baseline * 0.5);
        let final_ms =
            optimal / self.effective_master() / self.effective_popup_intensity() * difficulty;

        let safe_ms = final_ms.max(baseline * difficulty);

        IntervalPlan {
            difficulty_multiplier: difficulty,
            session_multiplier,
            focus_multiplier,
            interaction_multiplier,
            baseline_ms: baseline,
            optimal_ms: optimal,
            final_ms,
            safe_ms,
            jitter_ms,
        }
    }

    // ------------------------------------------------------------------
    // Popups
    // ------------------------------------------------------------------

    pub fn should_show_popup(
        &mut self,
        focus: &dyn FocusQuery,
        lives: &dyn LifeQuery,
        now: u64,
    ) -> PopupDecision {
        if !self.active {
            return PopupDecision::Blocked(BlockReason::Inactive);
        }
        if lives.is_dead() {
            return PopupDecision::Blocked(BlockReason::Dead);
        }

        let since_focus = now.saturating_sub(
            focus
                .last_focus_started_at()
                .unwrap_or(self.session_started_at),
        );
        if since_focus < self.config.balance.min_focus_time_for_distractions_ms {
            return PopupDecision::Blocked(BlockReason::FocusTooShort);
        }

        let cap = self.config.balance.max_simultaneous_popups;
        if cap > 0 && self.visible_popups(now) >= cap {
            return PopupDecision::Blocked(BlockReason::TooManyPopups);
        }

        if self.overwhelmed && self.rng.gen::<f64>() >= OVERWHELMED_PASS_CHANCE {
            return PopupDecision::Blocked(BlockReason::Overwhelmed);
        }
        PopupDecision::Show
    }

    /// Draw and register a popup. Call after the gate said [`PopupDecision::Show`].
    pub fn fire_popup(&mut self, now: u64) -> PopupNotice {
        let category = self.catalogue.pick_category(&mut self.rng);
        if category == PopupCategory::CognitiveDebt {
            self.attention_debt += COGNITIVE_DEBT_PER_POPUP;
        }
        let (title, body) = PopupCatalogue::compose(category, self.attention_debt);
        let lifetime_ms = random_lifetime(
            &mut self.rng,
            self.config.timing.popup_lifetime_min_ms,
            self.config.timing.popup_lifetime_max_ms,
        );

        let id = self.next_popup_id;
        self.next_popup_id += 1;
        self.visible
            .retain(|p| p.expires_at + STALE_POPUP_GRACE_MS > now);
        self.visible.push(VisiblePopup {
            id,
            expires_at: now + lifetime_ms,
        });
        self.metrics.record_event(now);

        tracing::info!("Popup #{} fired: {:?} for {}ms", id, category, lifetime_ms);
        PopupNotice {
            id,
            category,
            screen_position_percent: random_position(&mut self.rng),
            lifetime_ms,
            title,
            body,
        }
    }

    /// Gate and fire in one step.
    pub fn try_fire(
        &mut self,
        focus: &dyn FocusQuery,
        lives: &dyn LifeQuery,
        now: u64,
    ) -> Option<PopupNotice> {
        match self.should_show_popup(focus, lives, now) {
            PopupDecision::Show => Some(self.fire_popup(now)),
            PopupDecision::Blocked(reason) => {
                tracing::debug!("Popup suppressed: {:?}", reason);
                None
            }
        }
    }

    /// Remove a popup; returns false if it was already gone.
    pub fn dismiss_popup(&mut self, id: u64) -> bool {
        let before = self.visible.len();
        self.visible.retain(|p| p.id != id);
        self.visible.len() != before
    }

    /// Popups whose lifetime has not run out at `now`.
    pub fn visible_popups(&self, now: u64) -> usize {
        self.visible.iter().filter(|p| p.expires_at > now).count()
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    /// Escalate after the visitor lost a life.
    pub fn on_life_lost(&mut self) {
        let intensity = &mut self.config.intensity;
        if self.config.balance.reduce_on_life_loss {
            intensity.master *= 1.05;
        } else {
            intensity.master *= 1.2;
            intensity.popup *= 1.1;
        }
        tracing::info!(
            "Escalated after life loss: master {:.3}, popup {:.3}",
            intensity.master,
            intensity.popup
        );
    }

    /// Focus was confirmed at `distance` px from center.
    pub fn record_focus_entered(&mut self, distance: f64) {
        self.metrics
            .record_focus_quality((1.0 - distance / 100.0).max(0.0));
    }

    /// Focus was lost after a streak of `streak_ms`.
    pub fn record_focus_exited(&mut self, streak_ms: u64) {
        self.metrics.record_focus_quality(0.0);
        self.metrics.record_focus_streak(streak_ms as f64 / 1000.0);
    }

    pub fn record_interaction(&mut self, kind: InteractionKind, now: u64) -> InteractionOutcome {
        self.metrics.record_interaction(kind.clone(), now);

        let (reply, escalation) = match &kind {
            InteractionKind::PopupClick { category } => {
                (PopupCatalogue::click_reply(*category, &mut self.rng), None)
            }
            InteractionKind::PseudoControl { label } => {
                self.attention_debt += COGNITIVE_DEBT_PER_CONTROL_CLICK;
                let difficulty =
                    (1.0 + self.session_minutes(now) * 0.3).min(MAX_DIFFICULTY);
                tracing::info!(
                    "Control button '{}' pressed, debt now {}",
                    label,
                    self.attention_debt
                );
                (
                    Some(PopupCatalogue::control_reply(label, &mut self.rng)),
                    Some(difficulty),
                )
            }
        };

        InteractionOutcome {
            reply,
            escalation,
            attention_debt: self.attention_debt,
        }
    }

    /// Advance the surveillance counters by one update.
    pub fn surveillance_tick(&mut self, focus: &dyn FocusQuery, now: u64) -> SurveillanceReading {
        self.cognitive_harvest += self.rng.gen::<f64>() * 0.5 + self.session_minutes(now) * 0.1;
        let focus_seconds = focus.current_focus_duration_ms(now) as f64 / 1000.0;
        SurveillanceReading {
            difficulty: (1.0 + focus_seconds * 0.1).min(MAX_DIFFICULTY),
            focus_seconds,
            cognitive_harvest: self.cognitive_harvest,
        }
    }

    fn session_minutes(&self, now: u64) -> f64 {
        now.saturating_sub(self.session_started_at) as f64 / 60_000.0
    }

    // ------------------------------------------------------------------
    // Lifecycle & accessors
    // ------------------------------------------------------------------

    /// Stop firing; the gate blocks until [`reset`](Self::reset).
    pub fn deactivate(&mut self) {
        self.active = false;
        self.visible.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Back to the configured tuning with empty windows.
    pub fn reset(&mut self, now: u64) {
        self.config = self.base_config.clone();
        self.metrics.reset();
        self.session_started_at = now;
        self.active = true;
        self.overwhelmed = false;
        self.attention_debt = 0;
        self.cognitive_harvest = 0.0;
        self.visible.clear();
    }

    pub fn config(&self) -> &DistractionConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut DistractionConfig {
        &mut self.config
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut PerformanceMetrics {
        &mut self.metrics
    }

    pub fn is_overwhelmed(&self) -> bool {
        self.overwhelmed
    }

    pub(crate) fn set_overwhelmed(&mut self, overwhelmed: bool) {
        self.overwhelmed = overwhelmed;
    }

    pub fn attention_debt(&self) -> u32 {
        self.attention_debt
    }

    pub fn cognitive_harvest(&self) -> f64 {
        self.cognitive_harvest
    }

    pub fn session_started_at(&self) -> u64 {
        self.session_started_at
    }
}

fn clamp_intensity(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(MIN_INTENSITY, MAX_INTENSITY)
    } else {
        1.0
    }
}
