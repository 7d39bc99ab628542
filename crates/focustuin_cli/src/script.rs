//! Gaze sources for headless runs: a JSON-lines script or a simulated visitor.

use anyhow::{Context, Result};
use focustuin_core::Viewport;
use focustuin_distraction::PSEUDO_CONTROL_LABELS;
use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Default gap between scripted lines, roughly a 30 Hz tracker.
const DEFAULT_STEP_MS: u64 = 33;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Gaze {
        x: f64,
        y: f64,
        confidence: Option<f64>,
    },
    /// Visitor pressed one of the fake control buttons.
    Control(String),
    Resize(Viewport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedStep {
    /// Wait before performing the step.
    pub delay: Duration,
    pub step: Step,
}

/// One script line. Shapes:
/// `{"x": 960, "y": 540, "confidence": 0.9, "delay_ms": 33}`,
/// `{"control": "STOP EXTRACTION"}`, `{"width": 1280, "height": 720}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptLine {
    Gaze {
        x: f64,
        y: f64,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
    Control {
        control: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
    Resize {
        width: f64,
        height: f64,
        #[serde(default)]
        delay_ms: Option<u64>,
    },
}

impl From<ScriptLine> for TimedStep {
    fn from(line: ScriptLine) -> Self {
        let (delay_ms, step) = match line {
            ScriptLine::Gaze {
                x,
                y,
                confidence,
                delay_ms,
            } => (delay_ms, Step::Gaze { x, y, confidence }),
            ScriptLine::Control { control, delay_ms } => (delay_ms, Step::Control(control)),
            ScriptLine::Resize {
                width,
                height,
                delay_ms,
            } => (delay_ms, Step::Resize(Viewport::new(width, height))),
        };
        TimedStep {
            delay: Duration::from_millis(delay_ms.unwrap_or(DEFAULT_STEP_MS)),
            step,
        }
    }
}

/// Parse a script. Blank lines and `#` comments are skipped; lines that do
/// not parse are logged and dropped.
pub fn parse_script(content: &str) -> Vec<TimedStep> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(n, line)| match serde_json::from_str::<ScriptLine>(line) {
            Ok(parsed) => Some(parsed.into()),
            Err(e) => {
                tracing::warn!("Skipping script line {}: {}", n + 1, e);
                None
            }
        })
        .collect()
}

/// Read a script from a file, or from stdin when `path` is `-`.
pub fn load_script(path: &Path) -> Result<Vec<TimedStep>> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read script from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?
    };
    let steps = parse_script(&content);
    tracing::info!("Loaded {} script steps", steps.len());
    Ok(steps)
}

// ============================================================================
// Simulated visitor
// ============================================================================

/// Endless stream of a visitor who mostly stares at the center, sometimes
/// glances away, now and then loses the tracker, and rarely tries one of the
/// fake control buttons.
pub struct Wanderer {
    rng: StdRng,
    viewport: Viewport,
    /// Remaining samples of the current glance and where it goes.
    glance: Option<(u32, f64, f64)>,
}

impl Wanderer {
    pub fn new(seed: u64, viewport: Viewport) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            viewport,
            glance: None,
        }
    }
}

impl Iterator for Wanderer {
    type Item = TimedStep;

    fn next(&mut self) -> Option<TimedStep> {
        let delay = Duration::from_millis(DEFAULT_STEP_MS);

        if self.rng.gen_bool(0.01) {
            return Some(TimedStep {
                delay,
                step: Step::Gaze {
                    x: f64::NAN,
                    y: f64::NAN,
                    confidence: None,
                },
            });
        }

        if self.rng.gen_bool(0.002) {
            if let Some(label) = PSEUDO_CONTROL_LABELS.choose(&mut self.rng) {
                return Some(TimedStep {
                    delay,
                    step: Step::Control(label.to_string()),
                });
            }
        }

        if self.glance.is_none() && self.rng.gen_bool(0.005) {
            let x = self.rng.gen_range(0.0..=self.viewport.width);
            let y = self.rng.gen_range(0.0..=self.viewport.height);
            self.glance = Some((self.rng.gen_range(10..40), x, y));
        }

        let (tx, ty) = match self.glance.take() {
            Some((left, x, y)) => {
                if left > 1 {
                    self.glance = Some((left - 1, x, y));
                }
                (x, y)
            }
            None => self.viewport.center(),
        };

        Some(TimedStep {
            delay,
            step: Step::Gaze {
                x: tx + self.rng.gen_range(-12.0..12.0),
                y: ty + self.rng.gen_range(-12.0..12.0),
                confidence: Some(self.rng.gen_range(0.5..1.0)),
            },
        })
    }
}
