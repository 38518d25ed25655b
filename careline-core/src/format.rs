//! Display helpers shared by the panels.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::model::{Medication, Reading};

/// At most two decimals, with trailing zeros and a bare point dropped.
pub fn format_numeric(value: f64) -> String {
    let fixed = format!("{:.2}", (value * 100.0).round() / 100.0);
    match fixed.trim_end_matches('0').trim_end_matches('.') {
        "-0" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

pub fn format_glucose(value: f64) -> String {
    if value.is_finite() {
        format!("{} mg/dL", format_numeric(value))
    } else {
        "No value".to_string()
    }
}

/// HbA1c rounded to one decimal, integers shown without decimals.
pub fn format_hba1c(value: f64) -> String {
    if !value.is_finite() {
        return "No result".to_string();
    }
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}%")
    } else {
        format!("{rounded:.1}%")
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Day and month as seen at `offset`.
pub fn format_short_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    timestamp.with_timezone(&offset).format("%d/%m").to_string()
}

/// Chart label for a reading: short local date and kind.
pub fn reading_label(reading: &Reading, offset: FixedOffset) -> String {
    match reading.taken_at {
        Some(taken_at) => format!(
            "{} - {}",
            format_short_date(taken_at, offset),
            reading.kind.label()
        ),
        None => reading.kind.label().to_string(),
    }
}

pub fn medication_dose(medication: &Medication) -> String {
    medication
        .quantity
        .map(|quantity| quantity.to_string())
        .unwrap_or_else(|| "No data".to_string())
}

pub fn medication_duration(medication: &Medication) -> Option<String> {
    medication.duration_days.map(|days| format!("{days} days"))
}
