//! Balance monitor: overwhelm detection and the dampening feedback loop.
//!
//! A check runs every `check_interval_ms`. On the transition into overwhelm a
//! dampening pulse lowers master intensity and lengthens the minimum
//! interval; the pulse is divided back out after `dampening_cooldown_ms`.
//! With adaptive scaling on, each check additionally retunes the live
//! values permanently.

use crate::metrics::PerformanceMetrics;
use crate::scheduler::DistractionScheduler;
use focustuin_core::{BalanceConfig, DistractionConfig};
use serde::Serialize;

const PULSE_MASTER_FACTOR: f64 = 0.7;
const PULSE_INTERVAL_FACTOR: f64 = 1.5;
/// Overwhelmed when performance falls under this share of its baseline.
const PERFORMANCE_FLOOR_RATIO: f64 = 0.6;

/// One temporary intensity reduction awaiting its revert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DampeningPulse {
    pub id: u64,
    pub master_factor: f64,
    pub interval_factor: f64,
    pub applied_at: u64,
    pub revert_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BalanceReport {
    pub overwhelmed: bool,
    /// The overwhelm flag flipped during this check.
    pub overwhelm_changed: bool,
    pub pulse: Option<DampeningPulse>,
    pub auto_adjusted: bool,
}

/// Density over the last minute above the configured maximum, or
/// performance under 60% of its baseline.
pub fn check_overwhelm(metrics: &PerformanceMetrics, max_density: f64) -> bool {
    let density = metrics.recent_event_count() as f64 / 60.0;
    let performance = metrics.performance();
    density > max_density || performance.current < performance.baseline * PERFORMANCE_FLOOR_RATIO
}

/// Permanent retune. Returns whether anything changed.
pub fn auto_adjust(
    config: &mut DistractionConfig,
    overwhelmed: bool,
    average_focus_seconds: Option<f64>,
) -> bool {
    let mut changed = false;
    if overwhelmed {
        config.intensity.master *= 0.8;
        config.timing.popup_min_interval_ms *= 1.3;
        changed = true;
    }
    if average_focus_seconds.is_some_and(|avg| avg > 30.0) {
        config.intensity.master *= 1.1;
        config.timing.popup_min_interval_ms *= 0.9;
        changed = true;
    }
    changed
}

#[derive(Debug, Clone)]
pub struct BalanceMonitor {
    cooldown_ms: u64,
    pending: Vec<DampeningPulse>,
    next_pulse_id: u64,
}

impl BalanceMonitor {
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            cooldown_ms: config.dampening_cooldown_ms,
            pending: Vec::new(),
            next_pulse_id: 1,
        }
    }

    /// One periodic balance check.
    pub fn check_and_adjust(
        &mut self,
        scheduler: &mut DistractionScheduler,
        now: u64,
    ) -> BalanceReport {
        scheduler.metrics_mut().prune(now);
        let max_density = scheduler.config().balance.max_distraction_density;
        let overwhelmed = check_overwhelm(scheduler.metrics(), max_density);

        let mut report = BalanceReport {
            overwhelmed,
            ..BalanceReport::default()
        };

        if overwhelmed && !scheduler.is_overwhelmed() {
            scheduler.set_overwhelmed(true);
            report.overwhelm_changed = true;
            report.pulse = Some(self.apply_pulse(scheduler, now));
            tracing::warn!(
                "Overwhelm detected ({} events/min), intensity dampened",
                scheduler.metrics().recent_event_count()
            );
        } else if !overwhelmed && scheduler.is_overwhelmed() {
            scheduler.set_overwhelmed(false);
            report.overwhelm_changed = true;
            tracing::info!("Balance restored");
        }

        if scheduler.config().balance.adaptive_scaling {
            let average = scheduler.metrics().average_focus_seconds();
            report.auto_adjusted = auto_adjust(scheduler.config_mut(), overwhelmed, average);
            if report.auto_adjusted {
                tracing::debug!(
                    "Auto-adjusted: master {:.3}, min interval {:.0}ms",
                    scheduler.config().intensity.master,
                    scheduler.config().timing.popup_min_interval_ms
                );
            }
        }
        report
    }

    fn apply_pulse(&mut self, scheduler: &mut DistractionScheduler, now: u64) -> DampeningPulse {
        let config = scheduler.config_mut();
        config.intensity.master *= PULSE_MASTER_FACTOR;
        config.timing.popup_min_interval_ms *= PULSE_INTERVAL_FACTOR;

        let pulse = DampeningPulse {
            id: self.next_pulse_id,
            master_factor: PULSE_MASTER_FACTOR,
            interval_factor: PULSE_INTERVAL_FACTOR,
            applied_at: now,
            revert_at: now + self.cooldown_ms,
        };
        self.next_pulse_id += 1;
        self.pending.push(pulse);
        pulse
    }

    /// Divide a pulse back out. Unknown or already reverted ids are ignored.
    pub fn revert_pulse(&mut self, scheduler: &mut DistractionScheduler, pulse_id: u64) -> bool {
        let Some(idx) = self.pending.iter().position(|p| p.id == pulse_id) else {
            return false;
        };
        let pulse = self.pending.remove(idx);
        let config = scheduler.config_mut();
        config.intensity.master /= pulse.master_factor;
        config.timing.popup_min_interval_ms /= pulse.interval_factor;
        tracing::debug!("Dampening pulse #{} reverted", pulse.id);
        true
    }

    /// Revert every pulse whose cooldown has elapsed.
    pub fn revert_due(&mut self, scheduler: &mut DistractionScheduler, now: u64) -> usize {
        let due: Vec<u64> = self
            .pending
            .iter()
            .filter(|p| p.revert_at <= now)
            .map(|p| p.id)
            .collect();
        due.into_iter()
            .filter(|id| self.revert_pulse(scheduler, *id))
            .count()
    }

    pub fn pending_pulses(&self) -> &[DampeningPulse] {
        &self.pending
    }

    /// Forget pending pulses without reverting them; used when the
    /// scheduler's tuning is reset wholesale.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
