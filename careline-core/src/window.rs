//! Lookback windowing over timestamped series.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Reading;

/// Anything that can be placed on a time axis.
pub trait Timestamped {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Timestamped for Reading {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }
}

/// How far back from "now" a series is kept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "unit", content = "amount")]
pub enum Lookback {
    All,
    Days(u32),
    Months(u32),
}

impl Lookback {
    pub fn from_days(days: Option<u32>) -> Self {
        days.map_or(Lookback::All, Lookback::Days)
    }

    /// Inclusive lower bound, or `None` for "all time".
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Lookback::All => None,
            Lookback::Days(days) => Some(
                now.checked_sub_signed(Duration::days(i64::from(days)))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
            Lookback::Months(months) => Some(
                now.checked_sub_months(Months::new(months))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
        }
    }
}

/// The window choices offered on the glucose history screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowPreset {
    Last7Days,
    Last30Days,
    Last90Days,
    AllTime,
}

impl WindowPreset {
    pub const ALL: [WindowPreset; 4] = [
        WindowPreset::Last7Days,
        WindowPreset::Last30Days,
        WindowPreset::Last90Days,
        WindowPreset::AllTime,
    ];

    pub fn days(self) -> Option<u32> {
        match self {
            WindowPreset::Last7Days => Some(7),
            WindowPreset::Last30Days => Some(30),
            WindowPreset::Last90Days => Some(90),
            WindowPreset::AllTime => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            WindowPreset::Last7Days => "7",
            WindowPreset::Last30Days => "30",
            WindowPreset::Last90Days => "90",
            WindowPreset::AllTime => "all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WindowPreset::Last7Days => "Last 7 days",
            WindowPreset::Last30Days => "Last 30 days",
            WindowPreset::Last90Days => "Last 90 days",
            WindowPreset::AllTime => "All",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.key().eq_ignore_ascii_case(key.trim()))
    }
}

/// Keep the entries taken within the last `window_days` days (inclusive).
///
/// `None` means all time and returns the input unchanged. Entries without a
/// usable timestamp are dropped whenever a window applies.
pub fn filter_window<T: Timestamped + Clone>(
    items: &[T],
    window_days: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<T> {
    filter_lookback(items, Lookback::from_days(window_days), now)
}

pub fn filter_lookback<T: Timestamped + Clone>(
    items: &[T],
    lookback: Lookback,
    now: DateTime<Utc>,
) -> Vec<T> {
    let Some(cutoff) = lookback.cutoff(now) else {
        return items.to_vec();
    };

    items
        .iter()
        .filter(|item| matches!(item.timestamp(), Some(ts) if ts >= cutoff))
        .cloned()
        .collect()
}

/// Stable newest-first ordering; undated entries go last.
pub fn order_newest_first<T: Timestamped>(items: &mut [T]) {
    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}
