use crate::types::Viewport;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FocusTuinConfig {
    pub focus: FocusZoneConfig,
    pub distraction: DistractionConfig,
    pub session: SessionConfig,
    pub calibration: CalibrationConfig,
}

impl FocusTuinConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: FocusTuinConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FOCUSTUIN_PRESET") {
            match DistractionPreset::from_name(&v) {
                Some(preset) => self.distraction.preset = Some(preset),
                None => tracing::warn!("Unknown FOCUSTUIN_PRESET '{}', ignoring", v),
            }
        }
        if let Ok(v) = std::env::var("FOCUSTUIN_LIVES") {
            if let Ok(n) = v.parse() {
                self.session.initial_lives = n;
            }
        }
        if let Ok(v) = std::env::var("FOCUSTUIN_STABILIZATION_MS") {
            if let Ok(n) = v.parse() {
                self.focus.stabilization_delay_ms = n;
            }
        }
        if let Ok(v) = std::env::var("FOCUSTUIN_POPUP_MIN_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.distraction.timing.popup_min_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("FOCUSTUIN_CALIBRATION_CACHE") {
            self.calibration.cache_path = Some(PathBuf::from(v));
        }
    }
}

// ============================================================================
// Focus zone
// ============================================================================

/// The one place that defines when gaze counts as "in focus".
///
/// The tolerance radius is `base_radius_px * ring_multiplier * tolerance_multiplier`;
/// the hysteresis band shrinks it for entering and widens it for leaving.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FocusZoneConfig {
    /// Radius of the inner visual ring.
    pub base_radius_px: f64,
    /// Outer ring relative to the base radius; crossing it costs a life.
    pub ring_multiplier: f64,
    /// Extra room for natural eye movement beyond the outer ring.
    pub tolerance_multiplier: f64,
    pub hysteresis_px: f64,
    /// Dwell required inside the enter threshold before focus is confirmed.
    pub stabilization_delay_ms: u64,
    /// Trailing window of the gaze smoother.
    pub smoothing_window_ms: u64,
    /// Distance at which reported accuracy drops to zero.
    pub accuracy_reference_px: f64,
}

impl Default for FocusZoneConfig {
    fn default() -> Self {
        Self {
            base_radius_px: 20.0,
            ring_multiplier: 1.4,
            tolerance_multiplier: 1.4,
            hysteresis_px: 6.0,
            stabilization_delay_ms: 300,
            smoothing_window_ms: 300,
            accuracy_reference_px: 20.0,
        }
    }
}

impl FocusZoneConfig {
    pub fn tolerance_radius(&self) -> f64 {
        self.base_radius_px * self.ring_multiplier * self.tolerance_multiplier
    }

    pub fn enter_threshold(&self) -> f64 {
        (self.tolerance_radius() - self.hysteresis_px).max(0.0)
    }

    pub fn exit_threshold(&self) -> f64 {
        self.tolerance_radius() + self.hysteresis_px
    }
}

// ============================================================================
// Distraction tuning
// ============================================================================

/// Mutable tuning bag owned by the distraction scheduler.
///
/// Intervals are stored as `f64` milliseconds because the balance logic
/// scales them by fractional factors and later divides the factors back out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DistractionConfig {
    /// Applied over the other fields when the scheduler is built.
    pub preset: Option<DistractionPreset>,
    pub intensity: IntensityConfig,
    pub timing: TimingConfig,
    pub balance: BalanceConfig,
    pub message_weights: MessageWeights,
    pub surveillance: SurveillanceConfig,
}

impl DistractionConfig {
    /// Copy the preset's values into this config.
    pub fn apply_preset(&mut self, preset: DistractionPreset) {
        let (master, popup, min_interval, density) = match preset {
            DistractionPreset::Subtle => (0.6, 0.7, 20_000.0, 0.2),
            DistractionPreset::Standard => (1.0, 1.0, 3_000.0, 0.3),
            DistractionPreset::Intense => (1.4, 1.3, 8_000.0, 0.5),
            DistractionPreset::Experimental => (1.8, 1.5, 5_000.0, 0.7),
        };
        self.intensity.master = master;
        self.intensity.popup = popup;
        self.timing.popup_min_interval_ms = min_interval;
        self.balance.max_distraction_density = density;
        if preset == DistractionPreset::Standard {
            self.balance.min_focus_time_for_distractions_ms = 1_000;
        }
        self.preset = Some(preset);
    }

    /// This config with its preset (if any) applied.
    pub fn resolved(&self) -> Self {
        let mut cfg = self.clone();
        if let Some(preset) = self.preset {
            cfg.apply_preset(preset);
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionPreset {
    /// For sensitive visitors.
    Subtle,
    Standard,
    Intense,
    Experimental,
}

impl DistractionPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "subtle" => Some(Self::Subtle),
            "standard" => Some(Self::Standard),
            "intense" => Some(Self::Intense),
            "experimental" => Some(Self::Experimental),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntensityConfig {
    /// Global multiplier for every distraction.
    pub master: f64,
    /// Popup frequency multiplier.
    pub popup: f64,
}

impl Default for IntensityConfig {
    fn default() -> Self {
        Self {
            master: 1.0,
            popup: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub popup_min_interval_ms: f64,
    /// Upper bound of the uniform jitter added to every popup delay.
    pub popup_jitter_ms: f64,
    pub popup_lifetime_min_ms: u64,
    pub popup_lifetime_max_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            popup_min_interval_ms: 3_000.0,
            popup_jitter_ms: 2_000.0,
            popup_lifetime_min_ms: 3_000,
            popup_lifetime_max_ms: 7_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Focus required before popups may interrupt it.
    pub min_focus_time_for_distractions_ms: u64,
    /// Events per minute, divided by 60, above which the visitor is overwhelmed.
    pub max_distraction_density: f64,
    pub adaptive_scaling: bool,
    /// Gentler escalation after a lost life.
    pub reduce_on_life_loss: bool,
    pub max_simultaneous_popups: usize,
    pub check_interval_ms: u64,
    /// Lifetime of one dampening pulse.
    pub dampening_cooldown_ms: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            min_focus_time_for_distractions_ms: 1_000,
            max_distraction_density: 0.3,
            adaptive_scaling: true,
            reduce_on_life_loss: true,
            max_simultaneous_popups: 2,
            check_interval_ms: 15_000,
            dampening_cooldown_ms: 60_000,
        }
    }
}

/// Relative draw weights of the popup categories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageWeights {
    pub attention_harvesting: f64,
    pub system_notice: f64,
    pub false_warning: f64,
    pub cognitive_debt: f64,
    pub pseudo_control: f64,
}

impl Default for MessageWeights {
    fn default() -> Self {
        Self {
            attention_harvesting: 0.25,
            system_notice: 0.20,
            false_warning: 0.15,
            cognitive_debt: 0.20,
            pseudo_control: 0.20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurveillanceConfig {
    pub enabled: bool,
    pub update_interval_ms: u64,
}

impl Default for SurveillanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval_ms: 2_000,
        }
    }
}

// ============================================================================
// Session & calibration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub initial_lives: u32,
    /// How often focus-time statistics are published while focused.
    pub stats_interval_ms: u64,
    pub viewport: Viewport,
    /// Fixed RNG seed; a fresh one is drawn per session when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_lives: 2,
            stats_interval_ms: 3_000,
            viewport: Viewport::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub cache_path: Option<PathBuf>,
    /// Summed width+height difference under which a cached calibration is reused.
    pub dimension_tolerance_px: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            dimension_tolerance_px: 100.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = FocusTuinConfig::default();
        assert_eq!(cfg.session.initial_lives, 2);
        assert_eq!(cfg.focus.stabilization_delay_ms, 300);
        assert_eq!(cfg.distraction.timing.popup_min_interval_ms, 3_000.0);
        assert!(cfg.distraction.preset.is_none());
        assert!(cfg.calibration.cache_path.is_none());
    }

    #[test]
    fn test_default_thresholds() {
        let focus = FocusZoneConfig::default();
        assert!((focus.tolerance_radius() - 39.2).abs() < 1e-9);
        assert!((focus.enter_threshold() - 33.2).abs() < 1e-9);
        assert!((focus.exit_threshold() - 45.2).abs() < 1e-9);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[focus]
hysteresis_px = 10.0

[session]
initial_lives = 3
"#;
        let cfg: FocusTuinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.focus.hysteresis_px, 10.0);
        assert_eq!(cfg.session.initial_lives, 3);
        // Defaults for unspecified fields
        assert_eq!(cfg.focus.base_radius_px, 20.0);
        assert_eq!(cfg.distraction.balance.check_interval_ms, 15_000);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[focus]
base_radius_px = 30.0
ring_multiplier = 1.2
tolerance_multiplier = 1.0
hysteresis_px = 4.0
stabilization_delay_ms = 250
smoothing_window_ms = 200
accuracy_reference_px = 65.0

[distraction]
preset = "intense"

[distraction.intensity]
master = 1.5
popup = 0.5

[distraction.timing]
popup_min_interval_ms = 4000.0

[distraction.balance]
adaptive_scaling = false
reduce_on_life_loss = false

[distraction.surveillance]
enabled = false

[session]
initial_lives = 5
viewport = { width = 1280.0, height = 720.0 }
seed = 42

[calibration]
cache_path = "/tmp/focustuin-calibration.json"
"#;
        let cfg: FocusTuinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.focus.stabilization_delay_ms, 250);
        assert_eq!(cfg.distraction.preset, Some(DistractionPreset::Intense));
        assert_eq!(cfg.distraction.intensity.master, 1.5);
        assert!(!cfg.distraction.balance.adaptive_scaling);
        assert!(!cfg.distraction.surveillance.enabled);
        assert_eq!(cfg.session.viewport, Viewport::new(1280.0, 720.0));
        assert_eq!(cfg.session.seed, Some(42));
        assert_eq!(
            cfg.calibration.cache_path,
            Some(PathBuf::from("/tmp/focustuin-calibration.json"))
        );
    }

    #[test]
    fn test_preset_resolution_overrides_fields() {
        let mut cfg = DistractionConfig::default();
        cfg.intensity.master = 0.9;
        cfg.preset = Some(DistractionPreset::Experimental);
        let resolved = cfg.resolved();
        assert_eq!(resolved.intensity.master, 1.8);
        assert_eq!(resolved.timing.popup_min_interval_ms, 5_000.0);
        assert_eq!(resolved.balance.max_distraction_density, 0.7);
        // No preset: untouched
        cfg.preset = None;
        assert_eq!(cfg.resolved().intensity.master, 0.9);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(DistractionPreset::from_name("Subtle"), Some(DistractionPreset::Subtle));
        assert_eq!(DistractionPreset::from_name(" intense "), Some(DistractionPreset::Intense));
        assert_eq!(DistractionPreset::from_name("nightmare"), None);
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("FOCUSTUIN_LIVES", "4");
        std::env::set_var("FOCUSTUIN_PRESET", "subtle");

        let mut cfg = FocusTuinConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.session.initial_lives, 4);
        assert_eq!(cfg.distraction.preset, Some(DistractionPreset::Subtle));

        // Clean up env vars before testing defaults
        std::env::remove_var("FOCUSTUIN_LIVES");
        std::env::remove_var("FOCUSTUIN_PRESET");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = FocusTuinConfig::load_or_default("/nonexistent/focustuin.toml");
        assert_eq!(cfg.session.initial_lives, 2);
    }
}
