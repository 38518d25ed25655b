//! Laboratory results across a consultation history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::LabResult;
use crate::window::Timestamped;

/// Alternative names under which the same test is recorded.
const LAB_ALIASES: [(&str, &str); 3] = [
    ("hemoglobina glicosilada", "hba1c"),
    ("hemoglobin a1c", "hba1c"),
    ("glycated hemoglobin", "hba1c"),
];

pub const HBA1C: &str = "HbA1c";

/// The labs fetched for one consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationLabs {
    pub consultation_id: String,
    pub consultation_date: Option<DateTime<Utc>>,
    pub labs: Vec<LabResult>,
}

impl ConsultationLabs {
    pub fn new(
        consultation_id: impl Into<String>,
        consultation_date: Option<DateTime<Utc>>,
        labs: Vec<LabResult>,
    ) -> Self {
        Self {
            consultation_id: consultation_id.into(),
            consultation_date,
            labs,
        }
    }

    /// A consultation whose lab fetch failed counts as having no labs.
    pub fn unavailable(
        consultation_id: impl Into<String>,
        consultation_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(consultation_id, consultation_date, Vec::new())
    }
}

/// The most recent result for one test, with the consultation it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestLab {
    pub result: LabResult,
    pub consultation_id: String,
    pub consultation_date: Option<DateTime<Utc>>,
}

impl LatestLab {
    /// The result's own date, else the consultation's.
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.result.observed_at.or(self.consultation_date)
    }
}

/// Lower-case and collapse whitespace.
pub fn normalize_lab_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Key under which a test is matched, folding known aliases together.
pub fn canonical_lab_key(name: &str) -> String {
    let normalized = normalize_lab_name(name);
    LAB_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(normalized)
}

fn newest_first(consultations: &[ConsultationLabs]) -> Vec<&ConsultationLabs> {
    let mut ordered: Vec<&ConsultationLabs> = consultations.iter().collect();
    ordered.sort_by(|a, b| b.consultation_date.cmp(&a.consultation_date));
    ordered
}

/// Most recent result per test name, returned in the order of `important`.
///
/// Names in `important` with no recorded result are omitted.
pub fn resolve_latest_labs(consultations: &[ConsultationLabs], important: &[String]) -> Vec<LatestLab> {
    let mut latest: HashMap<String, LatestLab> = HashMap::new();

    for consultation in newest_first(consultations) {
        for result in &consultation.labs {
            if result.test_name.trim().is_empty() {
                continue;
            }
            latest
                .entry(canonical_lab_key(&result.test_name))
                .or_insert_with(|| LatestLab {
                    result: result.clone(),
                    consultation_id: consultation.consultation_id.clone(),
                    consultation_date: consultation.consultation_date,
                });
        }
    }

    let mut seen = Vec::new();
    important
        .iter()
        .filter_map(|name| {
            let key = canonical_lab_key(name);
            if seen.contains(&key) {
                return None;
            }
            let found = latest.get(&key).cloned();
            seen.push(key);
            found
        })
        .collect()
}

/// One numeric lab value placed on the time axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabPoint {
    pub value: f64,
    pub recorded_at: Option<DateTime<Utc>>,
    pub consultation_id: String,
}

impl Timestamped for LabPoint {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.recorded_at
    }
}

/// Oldest-first series of one test across the most recent consultations.
///
/// At most `max_consultations` consultations are walked, newest first, and
/// each contributes its first finite result for the test.
pub fn lab_history(
    consultations: &[ConsultationLabs],
    test_name: &str,
    max_consultations: usize,
) -> Vec<LabPoint> {
    let key = canonical_lab_key(test_name);
    let mut series: Vec<LabPoint> = newest_first(consultations)
        .into_iter()
        .take(max_consultations)
        .filter_map(|consultation| {
            consultation
                .labs
                .iter()
                .filter(|result| canonical_lab_key(&result.test_name) == key)
                .find_map(|result| {
                    result.finite_value().map(|value| LabPoint {
                        value,
                        recorded_at: result.observed_at.or(consultation.consultation_date),
                        consultation_id: consultation.consultation_id.clone(),
                    })
                })
        })
        .collect();
    series.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
    series
}
