//! Tunable thresholds and layout shared by every panel.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::band::{Band, BandSet, GlycemicThresholds};
use crate::chart::{Canvas, DomainMargins};
use crate::visit::DEFAULT_VISIT_WARNING_DAYS;

/// Configuration for the glucose, summary and HbA1c panels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CarelineConfig {
    /// Hypo/hyper thresholds for the latest-reading badge.
    pub thresholds: GlycemicThresholds,
    /// Target bands per reading kind.
    pub bands: BandSet,
    pub hba1c_band: Band,
    /// HbA1c charts keep a tighter domain than glucose charts.
    pub hba1c_margins: DomainMargins,
    /// Changes within this many mg/dL count as flat.
    pub trend_epsilon: f64,
    pub canvas: Canvas,
    /// Lookback applied when the caller does not pick one; `None` is all time.
    pub default_window_days: Option<u32>,
    pub visit_warning_days: i64,
    /// Lab tests surfaced in the summary, in display order.
    pub important_labs: Vec<String>,
    /// How many recent consultations the HbA1c history walks.
    pub max_lab_consultations: usize,
    /// Quiet period before a patient lookup is sent.
    pub lookup_debounce_ms: u64,
    /// Offset of the clock chart labels are shown in, in minutes east of
    /// UTC. Unset labels in UTC.
    pub utc_offset_minutes: Option<i32>,
}

impl CarelineConfig {
    /// Offset for display dates; out-of-range values fall back to UTC.
    pub fn display_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for CarelineConfig {
    fn default() -> Self {
        Self {
            thresholds: GlycemicThresholds::default(),
            bands: BandSet::default(),
            hba1c_band: Band::new(4.0, 7.0, 9.0),
            hba1c_margins: DomainMargins {
                below: 0.0,
                above: 1.0,
            },
            trend_epsilon: 0.0,
            canvas: Canvas::default(),
            default_window_days: Some(30),
            visit_warning_days: DEFAULT_VISIT_WARNING_DAYS,
            important_labs: ["HbA1c", "Glucosa ayunas", "Creatinina", "TFG", "UACR"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_lab_consultations: 12,
            lookup_debounce_ms: 400,
            utc_offset_minutes: None,
        }
    }
}
