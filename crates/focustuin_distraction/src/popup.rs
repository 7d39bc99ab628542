//! Popup catalogue: category draw, copy, placement and click replies.

use focustuin_core::{MessageWeights, PopupCategory, ScreenPercent};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::Serialize;

/// Popups stay this far (in percent) from every screen edge.
const SAFE_MARGIN_PERCENT: f64 = 10.0;

/// A clicked popup is replaced by its reply for this long.
pub const REPLY_LIFETIME_MS: u64 = 2_000;

/// Labels of the fake control buttons the rendering layer offers.
pub const PSEUDO_CONTROL_LABELS: [&str; 4] =
    ["STOP EXTRACTION", "PRIVACY MODE", "END SESSION", "BLOCK ACCESS"];

const MISLEADING_RESPONSES: [&str; 5] = [
    "ACCESS DENIED",
    "FUNCTION DISABLED",
    "INSUFFICIENT PRIVILEGES",
    "CONTRACTUAL RESTRICTION",
    "MONITORING MANDATORY",
];

/// What replaces a clicked popup or button.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupReply {
    pub title: String,
    pub body: String,
    pub lifetime_ms: u64,
}

#[derive(Debug, Clone)]
pub struct PopupCatalogue {
    /// `None` when every configured weight is zero or invalid.
    weighted: Option<WeightedIndex<f64>>,
}

impl PopupCatalogue {
    pub fn new(weights: &MessageWeights) -> Self {
        let raw = [
            weights.attention_harvesting,
            weights.system_notice,
            weights.false_warning,
            weights.cognitive_debt,
            weights.pseudo_control,
        ]
        .map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });

        let weighted = match WeightedIndex::new(raw) {
            Ok(dist) => Some(dist),
            Err(e) => {
                tracing::warn!("Unusable popup weights ({}), drawing uniformly", e);
                None
            }
        };
        Self { weighted }
    }

    pub fn pick_category<R: Rng + ?Sized>(&self, rng: &mut R) -> PopupCategory {
        let idx = match &self.weighted {
            Some(dist) => dist.sample(rng),
            None => rng.gen_range(0..PopupCategory::ALL.len()),
        };
        PopupCategory::ALL[idx]
    }

    /// Title and body for a popup. `attention_debt` is the debt after the
    /// popup's own contribution.
    pub fn compose(category: PopupCategory, attention_debt: u32) -> (String, String) {
        let (title, body) = match category {
            PopupCategory::AttentionHarvesting => (
                "ATTENTION MONITORING ACTIVE".to_string(),
                "Your gaze is recorded anonymously for research into usage load and wellbeing. \
                 RESISTANCE IS FUTILE"
                    .to_string(),
            ),
            PopupCategory::SystemNotice => (
                "YOU ARE BEING WATCHED".to_string(),
                "Small movements are being analysed. \
                 This helps models predict responses to pressure and stress."
                    .to_string(),
            ),
            PopupCategory::FalseWarning => (
                "\u{26a0} WARNING".to_string(),
                "Abnormal attention profile detected. Stay calm if you can.".to_string(),
            ),
            PopupCategory::CognitiveDebt => (
                "ATTENTION TAKEN".to_string(),
                format!("+10 FOCUS UNITS EXTRACTED. Debt: {} units", attention_debt),
            ),
            PopupCategory::PseudoControl => (
                "ESCAPE ATTEMPT DETECTED".to_string(),
                "You cannot stop looking. FEED US DATA".to_string(),
            ),
        };
        (title, body)
    }

    /// Reply shown when a clickable popup is clicked.
    pub fn click_reply<R: Rng + ?Sized>(
        category: PopupCategory,
        rng: &mut R,
    ) -> Option<PopupReply> {
        match category {
            PopupCategory::AttentionHarvesting => Some(PopupReply {
                title: "ACCESS DENIED".into(),
                body: format!(
                    "Classification: SUBJECT_{}. Monitoring continues.",
                    rng.gen_range(0..9999)
                ),
                lifetime_ms: REPLY_LIFETIME_MS,
            }),
            PopupCategory::PseudoControl => Some(PopupReply {
                title: "OPTION UNAVAILABLE".into(),
                body: "Contractual obligations. Session continues.".into(),
                lifetime_ms: REPLY_LIFETIME_MS,
            }),
            _ => None,
        }
    }

    /// Every control button "works" the same way.
    pub fn control_reply<R: Rng + ?Sized>(label: &str, rng: &mut R) -> PopupReply {
        let response = MISLEADING_RESPONSES[rng.gen_range(0..MISLEADING_RESPONSES.len())];
        PopupReply {
            title: response.to_string(),
            body: format!("'{}' is not available to you.", label),
            lifetime_ms: REPLY_LIFETIME_MS,
        }
    }
}

/// Uniform position inside the safe margins.
pub fn random_position<R: Rng + ?Sized>(rng: &mut R) -> ScreenPercent {
    let range = 100.0 - SAFE_MARGIN_PERCENT * 2.0;
    ScreenPercent {
        x: SAFE_MARGIN_PERCENT + rng.gen::<f64>() * range,
        y: SAFE_MARGIN_PERCENT + rng.gen::<f64>() * range,
    }
}

pub fn random_lifetime<R: Rng + ?Sized>(rng: &mut R, min_ms: u64, max_ms: u64) -> u64 {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    rng.gen_range(lo..=hi)
}
