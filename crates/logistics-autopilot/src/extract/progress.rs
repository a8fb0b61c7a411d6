//! Parser for the inline `new ProgressBar(id, min, max, current)` calls the
//! game renders next to gauges (fuel, condition, tire condition).
//!
//! This is the only place that knows the script convention. If the upstream
//! format changes, only `PROGRESS_BAR_RE` needs to follow.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const PROGRESS_BAR_RE: &str = r#"new\s+ProgressBar\(\s*['"]?([^,'"\s]*)['"]?\s*,\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*\)"#;

fn progress_bar_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PROGRESS_BAR_RE).expect("progress bar regex is valid"))
}

/// Arguments of one progress-bar constructor call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBar {
    pub element_id: String,
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

impl ProgressBar {
    /// `(current - min) / (max - min) * 100`, clamped to `[0, 100]`.
    ///
    /// `None` for a degenerate range (`max <= min`).
    pub fn percentage(&self) -> Option<f64> {
        let span = self.max - self.min;
        if span <= 0.0 {
            return None;
        }
        Some(((self.current - self.min) / span * 100.0).clamp(0.0, 100.0))
    }

    /// Percentage rounded down to a whole number, so 99.6 still reads below 100.
    pub fn whole_percentage(&self) -> Option<u8> {
        self.percentage().map(|p| p.floor() as u8)
    }
}

/// Every progress bar call in `text`, in source order.
pub fn progress_bars(text: &str) -> Vec<ProgressBar> {
    progress_bar_re()
        .captures_iter(text)
        .filter_map(|cap| {
            Some(ProgressBar {
                element_id: cap.get(1)?.as_str().to_string(),
                min: cap.get(2)?.as_str().parse().ok()?,
                max: cap.get(3)?.as_str().parse().ok()?,
                current: cap.get(4)?.as_str().parse().ok()?,
            })
        })
        .collect()
}

/// First progress bar in `text`, whatever its element id.
pub fn first_progress_bar(text: &str) -> Option<ProgressBar> {
    progress_bars(text).into_iter().next()
}

/// Progress bar whose element id equals `element_id`.
pub fn progress_bar_by_id(text: &str, element_id: &str) -> Option<ProgressBar> {
    progress_bars(text)
        .into_iter()
        .find(|bar| bar.element_id == element_id)
}

/// Fuel level of a gauge. An unreadable gauge counts as full so a page we
/// cannot parse never triggers a refuel.
pub fn fuel_percentage(gauge: Option<&ProgressBar>) -> f64 {
    gauge.and_then(ProgressBar::percentage).unwrap_or(100.0)
}
