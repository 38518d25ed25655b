//! View-models for one display update.
//!
//! Each builder recomputes its panel from the latest snapshot of records.
//! Nothing is carried over between updates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::band::{classify_point, reading_adherence, AdherenceSummary, PointStatus, Zone};
use crate::chart::{build_chart, build_chart_with_margins, ChartGeometry, ChartPoint};
use crate::config::CarelineConfig;
use crate::format::{format_short_date, reading_label};
use crate::labs::{lab_history, resolve_latest_labs, ConsultationLabs, LabPoint, LatestLab, HBA1C};
use crate::model::{Consultation, Reading};
use crate::treatment::current_treatment;
use crate::trend::{pairwise_trends, Trend};
use crate::visit::{advise_visit_with_window, VisitAdvice};
use crate::window::{filter_lookback, filter_window, order_newest_first, Lookback};

pub const NO_READINGS: &str = "No glucose readings recorded";
pub const NO_READINGS_IN_WINDOW: &str = "No readings in the selected window";
pub const NOT_ENOUGH_FOR_CHART: &str = "Not enough data for the chart";
pub const NO_CONSULTATIONS: &str = "No consultations recorded";
pub const NO_LABS: &str = "No lab results recorded";
pub const NO_HBA1C: &str = "No HbA1c results available";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingRow {
    pub reading: Reading,
    /// Change against the next older reading in the window.
    pub trend: Option<Trend>,
    pub zone: Option<Zone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestReading {
    pub reading: Reading,
    pub status: PointStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlucosePanel {
    pub window_days: Option<u32>,
    /// Newest first.
    pub readings: Vec<ReadingRow>,
    pub latest: Option<LatestReading>,
    pub adherence: AdherenceSummary,
    pub chart: Option<ChartGeometry>,
    pub message: Option<String>,
}

impl GlucosePanel {
    /// Panel for a patient with no usable readings.
    pub fn empty(window_days: Option<u32>) -> Self {
        Self {
            window_days,
            readings: Vec::new(),
            latest: None,
            adherence: AdherenceSummary::no_data(),
            chart: None,
            message: Some(NO_READINGS.to_string()),
        }
    }
}

pub fn build_glucose_panel(
    readings: &[Reading],
    config: &CarelineConfig,
    window_days: Option<u32>,
    now: DateTime<Utc>,
) -> GlucosePanel {
    let mut valid: Vec<Reading> = readings
        .iter()
        .filter(|reading| reading.has_finite_value())
        .cloned()
        .collect();
    if valid.len() != readings.len() {
        tracing::debug!(
            dropped = readings.len() - valid.len(),
            "ignoring readings without a finite value"
        );
    }
    if valid.is_empty() {
        return GlucosePanel::empty(window_days);
    }

    order_newest_first(&mut valid);
    let windowed = filter_window(&valid, window_days, now);

    let values: Vec<f64> = windowed.iter().map(|reading| reading.value).collect();
    let trends = pairwise_trends(&values, config.trend_epsilon);
    let rows: Vec<ReadingRow> = windowed
        .iter()
        .zip(trends)
        .map(|(reading, trend)| ReadingRow {
            zone: config.bands.for_kind(reading.kind).zone(reading.value),
            reading: reading.clone(),
            trend,
        })
        .collect();

    let latest = windowed.first().and_then(|reading| {
        classify_point(reading.value, &config.thresholds).map(|status| LatestReading {
            reading: reading.clone(),
            status,
        })
    });

    let adherence = reading_adherence(&windowed, &config.bands);

    let offset = config.display_offset();
    let chart_points: Vec<ChartPoint> = windowed
        .iter()
        .rev()
        .map(|reading| ChartPoint {
            value: reading.value,
            recorded_at: reading.taken_at,
            label: reading_label(reading, offset),
        })
        .collect();
    let chart = build_chart(&chart_points, config.bands.for_series(&windowed), &config.canvas);

    let message = if windowed.is_empty() {
        Some(NO_READINGS_IN_WINDOW.to_string())
    } else if chart.is_none() {
        Some(NOT_ENOUGH_FOR_CHART.to_string())
    } else {
        None
    };

    GlucosePanel {
        window_days,
        readings: rows,
        latest,
        adherence,
        chart,
        message,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryPanel {
    pub current_treatment: Option<Consultation>,
    pub latest_labs: Vec<LatestLab>,
    pub visit: VisitAdvice,
    pub message: Option<String>,
    pub labs_message: Option<String>,
}

pub fn build_summary_panel(
    consultations: &[Consultation],
    labs: &[ConsultationLabs],
    config: &CarelineConfig,
    today: NaiveDate,
) -> SummaryPanel {
    let current = current_treatment(consultations).cloned();
    let latest_labs = resolve_latest_labs(labs, &config.important_labs);
    let visit = advise_visit_with_window(
        current.as_ref().and_then(|consultation| consultation.next_visit_date),
        today,
        config.visit_warning_days,
    );

    SummaryPanel {
        message: current.is_none().then(|| NO_CONSULTATIONS.to_string()),
        labs_message: latest_labs.is_empty().then(|| NO_LABS.to_string()),
        current_treatment: current,
        latest_labs,
        visit,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hba1cHistory {
    /// Oldest first, restricted to the lookback.
    pub series: Vec<LabPoint>,
    /// Latest result regardless of the lookback.
    pub latest: Option<LabPoint>,
    pub chart: Option<ChartGeometry>,
    pub message: Option<String>,
}

pub fn build_hba1c_history(
    labs: &[ConsultationLabs],
    config: &CarelineConfig,
    lookback: Lookback,
    now: DateTime<Utc>,
) -> Hba1cHistory {
    let full = lab_history(labs, HBA1C, config.max_lab_consultations);
    if full.is_empty() {
        return Hba1cHistory {
            series: Vec::new(),
            latest: None,
            chart: None,
            message: Some(NO_HBA1C.to_string()),
        };
    }

    let latest = full
        .iter()
        .filter(|point| point.recorded_at.is_some())
        .max_by_key(|point| point.recorded_at)
        .or_else(|| full.last())
        .cloned();
    let series = filter_lookback(&full, lookback, now);

    let offset = config.display_offset();
    let chart_points: Vec<ChartPoint> = series
        .iter()
        .map(|point| ChartPoint {
            value: point.value,
            recorded_at: point.recorded_at,
            label: point
                .recorded_at
                .map(|at| format_short_date(at, offset))
                .unwrap_or_default(),
        })
        .collect();
    let chart = build_chart_with_margins(
        &chart_points,
        &config.hba1c_band,
        &config.canvas,
        config.hba1c_margins,
    )
    .map(|mut chart| {
        // only the treatment goal is shaded on HbA1c charts
        chart.zones.retain(|rect| rect.zone == Zone::Target);
        chart
    });

    let message = chart.is_none().then(|| NOT_ENOUGH_FOR_CHART.to_string());

    Hba1cHistory {
        series,
        latest,
        chart,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::AdherenceStatus;
    use crate::model::{LabResult, ReadingKind};
    use crate::visit::VisitStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn reading(id: &str, value: f64, days_ago: i64) -> Reading {
        Reading::new(id, value, ReadingKind::Fasting, now() - Duration::days(days_ago))
    }

    #[test]
    fn hypoglycemic_latest_reading_with_poor_adherence() {
        let config = CarelineConfig::default();
        let readings = vec![reading("old", 150.0, 5), reading("new", 65.0, 0)];

        let panel = build_glucose_panel(&readings, &config, None, now());

        let latest = panel.latest.unwrap();
        assert_eq!(latest.reading.id, "new");
        assert_eq!(latest.status, PointStatus::Low);
        assert_eq!(panel.adherence.in_target, 0);
        assert_eq!(panel.adherence.total, 2);
        assert_eq!(panel.adherence.status, AdherenceStatus::High);
        assert!(panel.chart.is_some());
        assert_eq!(panel.message, None);
    }

    #[test]
    fn rows_are_newest_first_with_trends() {
        let config = CarelineConfig::default();
        let readings = vec![
            reading("a", 110.0, 3),
            reading("c", 120.0, 1),
            reading("b", 120.0, 2),
        ];

        let panel = build_glucose_panel(&readings, &config, Some(30), now());
        let ids: Vec<&str> = panel.readings.iter().map(|row| row.reading.id.as_str()).collect();
        let trends: Vec<Option<Trend>> = panel.readings.iter().map(|row| row.trend).collect();

        assert_eq!(ids, ["c", "b", "a"]);
        assert_eq!(trends, vec![Some(Trend::Flat), Some(Trend::Up), None]);
        assert_eq!(panel.readings[0].zone, Some(Zone::Target));
    }

    #[test]
    fn chart_runs_oldest_to_newest() {
        let config = CarelineConfig::default();
        let readings = vec![reading("new", 100.0, 1), reading("old", 200.0, 2)];
        let chart = build_glucose_panel(&readings, &config, Some(7), now()).chart.unwrap();

        assert_eq!(chart.points[0].value, 200.0);
        assert_eq!(chart.points[1].value, 100.0);
    }

    #[test]
    fn explicit_empty_states() {
        let config = CarelineConfig::default();

        let none = build_glucose_panel(&[], &config, Some(30), now());
        assert_eq!(none.message.as_deref(), Some(NO_READINGS));

        let mut broken = reading("nan", 0.0, 1);
        broken.value = f64::NAN;
        let only_broken = build_glucose_panel(&[broken], &config, Some(30), now());
        assert_eq!(only_broken.message.as_deref(), Some(NO_READINGS));

        let stale = build_glucose_panel(&[reading("old", 100.0, 60)], &config, Some(30), now());
        assert_eq!(stale.message.as_deref(), Some(NO_READINGS_IN_WINDOW));
        assert_eq!(stale.adherence.status, AdherenceStatus::NoData);
        assert!(stale.latest.is_none());

        let single = build_glucose_panel(&[reading("one", 100.0, 1)], &config, Some(30), now());
        assert_eq!(single.message.as_deref(), Some(NOT_ENOUGH_FOR_CHART));
        assert!(single.chart.is_none());
        assert_eq!(single.readings.len(), 1);
    }

    #[test]
    fn summary_combines_treatment_labs_and_visit() {
        let config = CarelineConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut recent = Consultation::new("c2", now() - Duration::days(10));
        recent.next_visit_date = NaiveDate::from_ymd_opt(2024, 6, 21);
        let older = Consultation::new("c1", now() - Duration::days(100));
        let labs = vec![
            ConsultationLabs::new("c1", older.created_at, vec![LabResult::numeric("HbA1c", 8.0)]),
            ConsultationLabs::unavailable("c2", recent.created_at),
        ];

        let panel = build_summary_panel(&[older, recent], &labs, &config, today);

        assert_eq!(panel.current_treatment.unwrap().id, "c2");
        assert_eq!(panel.visit.status, VisitStatus::Warn);
        assert_eq!(panel.visit.days_delta, Some(20));
        assert_eq!(panel.latest_labs.len(), 1);
        assert_eq!(panel.message, None);
        assert_eq!(panel.labs_message, None);
    }

    #[test]
    fn summary_without_consultations() {
        let config = CarelineConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let panel = build_summary_panel(&[], &[], &config, today);

        assert!(panel.current_treatment.is_none());
        assert_eq!(panel.visit.status, VisitStatus::Neutral);
        assert_eq!(panel.message.as_deref(), Some(NO_CONSULTATIONS));
        assert_eq!(panel.labs_message.as_deref(), Some(NO_LABS));
    }

    #[test]
    fn hba1c_history_filters_by_months_but_keeps_latest() {
        let config = CarelineConfig::default();
        let labs = vec![
            ConsultationLabs::new("c1", Some(now() - Duration::days(400)), vec![LabResult::numeric("HbA1c", 9.1)]),
            ConsultationLabs::new("c2", Some(now() - Duration::days(120)), vec![LabResult::numeric("HbA1c", 8.0)]),
            ConsultationLabs::new("c3", Some(now() - Duration::days(30)), vec![LabResult::numeric("HbA1c", 7.2)]),
        ];

        let history = build_hba1c_history(&labs, &config, Lookback::Months(6), now());

        let values: Vec<f64> = history.series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![8.0, 7.2]);
        assert_eq!(history.latest.unwrap().consultation_id, "c3");
        let chart = history.chart.unwrap();
        assert_eq!(chart.chart_min, 4.0);
        assert_eq!(chart.chart_max, 10.0);
        let zones: Vec<Zone> = chart.zones.iter().map(|rect| rect.zone).collect();
        assert_eq!(zones, vec![Zone::Target]);
        assert_eq!(chart.zones[0].y, chart.value_to_y(7.0));
        assert_eq!(history.message, None);
    }

    #[test]
    fn chart_labels_use_the_display_offset() {
        let config = CarelineConfig {
            utc_offset_minutes: Some(-300),
            ..CarelineConfig::default()
        };
        let late = Reading::new(
            "late",
            110.0,
            ReadingKind::Fasting,
            Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap(),
        );
        let earlier = reading("earlier", 120.0, 2);

        let panel = build_glucose_panel(&[late, earlier], &config, Some(7), now());

        let labels: Vec<&str> = panel
            .chart
            .as_ref()
            .unwrap()
            .points
            .iter()
            .map(|point| point.label.as_str())
            .collect();
        assert_eq!(labels, vec!["30/05 - Fasting", "31/05 - Fasting"]);
    }

    #[test]
    fn hba1c_history_without_results() {
        let config = CarelineConfig::default();
        let labs = vec![ConsultationLabs::new("c1", Some(now()), vec![LabResult::numeric("TFG", 95.0)])];
        let history = build_hba1c_history(&labs, &config, Lookback::All, now());
        assert_eq!(history.message.as_deref(), Some(NO_HBA1C));
        assert!(history.latest.is_none());
    }
}
