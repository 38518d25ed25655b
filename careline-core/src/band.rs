//! Clinical reference bands and the two glycemic classification modes.
//!
//! Point classification looks at one value against the global hypo/hyper
//! thresholds. Adherence classification looks at a whole window and asks
//! which share of it stayed inside the target band.

use serde::{Deserialize, Serialize};

use crate::model::{Reading, ReadingKind};

/// Share of in-target values at or above which adherence is `Ok`.
pub const ADHERENCE_OK_RATIO: f64 = 0.7;
/// Share of in-target values at or above which adherence is `Warn`.
pub const ADHERENCE_WARN_RATIO: f64 = 0.4;

/// Per-kind threshold triple.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Band {
    pub target_min: f64,
    pub target_max: f64,
    pub elevated_max: f64,
}

impl Band {
    pub const fn new(target_min: f64, target_max: f64, elevated_max: f64) -> Self {
        Self {
            target_min,
            target_max,
            elevated_max,
        }
    }

    pub fn in_target(&self, value: f64) -> bool {
        value.is_finite() && value >= self.target_min && value <= self.target_max
    }

    /// Zone a value falls in; `None` for non-finite values.
    pub fn zone(&self, value: f64) -> Option<Zone> {
        if !value.is_finite() {
            return None;
        }
        let zone = if value < self.target_min {
            Zone::Low
        } else if value <= self.target_max {
            Zone::Target
        } else if value <= self.elevated_max {
            Zone::Elevated
        } else {
            Zone::High
        };
        Some(zone)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Low,
    Target,
    Elevated,
    High,
}

/// Bands for every reading kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BandSet {
    pub fasting: Band,
    pub postprandial: Band,
    pub unspecified: Band,
}

impl Default for BandSet {
    fn default() -> Self {
        Self {
            fasting: Band::new(70.0, 130.0, 180.0),
            postprandial: Band::new(70.0, 180.0, 240.0),
            unspecified: Band::new(70.0, 180.0, 240.0),
        }
    }
}

impl BandSet {
    pub fn for_kind(&self, kind: ReadingKind) -> &Band {
        match kind {
            ReadingKind::Fasting => &self.fasting,
            ReadingKind::Postprandial => &self.postprandial,
            ReadingKind::Unspecified => &self.unspecified,
        }
    }

    /// Band for a mixed series: the shared kind's band, else the unspecified one.
    pub fn for_series(&self, readings: &[Reading]) -> &Band {
        let mut kinds = readings.iter().map(|reading| reading.kind);
        match kinds.next() {
            Some(first) if kinds.all(|kind| kind == first) => self.for_kind(first),
            _ => &self.unspecified,
        }
    }
}

/// Global hypo/hyperglycemia alert thresholds (mg/dL).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlycemicThresholds {
    pub hypo: f64,
    pub hyper: f64,
}

impl Default for GlycemicThresholds {
    fn default() -> Self {
        Self {
            hypo: 70.0,
            hyper: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    Low,
    Normal,
    High,
}

impl PointStatus {
    pub fn label(self) -> &'static str {
        match self {
            PointStatus::Low => "Hypoglycemia",
            PointStatus::Normal => "Normal",
            PointStatus::High => "Hyperglycemia",
        }
    }
}

/// Classify a single value; independent of the reading kind.
pub fn classify_point(value: f64, thresholds: &GlycemicThresholds) -> Option<PointStatus> {
    if !value.is_finite() {
        return None;
    }
    let status = if value < thresholds.hypo {
        PointStatus::Low
    } else if value >= thresholds.hyper {
        PointStatus::High
    } else {
        PointStatus::Normal
    };
    Some(status)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceStatus {
    Ok,
    Warn,
    High,
    NoData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AdherenceSummary {
    pub in_target: usize,
    pub total: usize,
    pub ratio: Option<f64>,
    pub status: AdherenceStatus,
}

impl AdherenceSummary {
    pub fn no_data() -> Self {
        Self {
            in_target: 0,
            total: 0,
            ratio: None,
            status: AdherenceStatus::NoData,
        }
    }

    fn from_counts(in_target: usize, total: usize) -> Self {
        if total == 0 {
            return Self::no_data();
        }
        let ratio = in_target as f64 / total as f64;
        Self {
            in_target,
            total,
            ratio: Some(ratio),
            status: classify_ratio(ratio),
        }
    }
}

pub fn classify_ratio(ratio: f64) -> AdherenceStatus {
    if !ratio.is_finite() {
        AdherenceStatus::NoData
    } else if ratio >= ADHERENCE_OK_RATIO {
        AdherenceStatus::Ok
    } else if ratio >= ADHERENCE_WARN_RATIO {
        AdherenceStatus::Warn
    } else {
        AdherenceStatus::High
    }
}

/// Adherence of a single-band series. Non-finite values are ignored.
pub fn adherence<I>(values: I, band: &Band) -> AdherenceSummary
where
    I: IntoIterator<Item = f64>,
{
    let (in_target, total) = values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold((0, 0), |(hits, total), value| {
            (hits + usize::from(band.in_target(value)), total + 1)
        });
    AdherenceSummary::from_counts(in_target, total)
}

/// Adherence of a reading series, each reading judged against its own kind's band.
pub fn reading_adherence(readings: &[Reading], bands: &BandSet) -> AdherenceSummary {
    let (in_target, total) = readings
        .iter()
        .filter(|reading| reading.has_finite_value())
        .fold((0, 0), |(hits, total), reading| {
            let hit = bands.for_kind(reading.kind).in_target(reading.value);
            (hits + usize::from(hit), total + 1)
        });
    AdherenceSummary::from_counts(in_target, total)
}
