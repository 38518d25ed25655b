//! Clinical records as delivered by the collaborator API.
//!
//! These are read-only from the core's point of view: the panels derive
//! transient view-models from them and never write anything back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// When a glucose reading was taken relative to food intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Fasting,
    Postprandial,
    #[default]
    Unspecified,
}

impl ReadingKind {
    /// Short label used next to chart points and list rows.
    pub fn label(self) -> &'static str {
        match self {
            ReadingKind::Fasting => "Fasting",
            ReadingKind::Postprandial => "Post-meal",
            ReadingKind::Unspecified => "Unspecified",
        }
    }
}

/// One capillary glucose measurement in mg/dL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub id: String,
    pub patient_id: Option<String>,
    pub value: f64,
    pub kind: ReadingKind,
    /// `None` when the collaborator sent a timestamp we could not parse.
    pub taken_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl Reading {
    pub fn new(
        id: impl Into<String>,
        value: f64,
        kind: ReadingKind,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            patient_id: None,
            value,
            kind,
            taken_at: Some(taken_at),
            note: None,
        }
    }

    /// Only finite values take part in aggregations.
    pub fn has_finite_value(&self) -> bool {
        self.value.is_finite()
    }
}

/// A laboratory result attached to a consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LabResult {
    pub id: Option<String>,
    pub consultation_id: Option<String>,
    pub test_name: String,
    pub numeric_value: Option<f64>,
    pub text_value: Option<String>,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl LabResult {
    pub fn numeric(test_name: impl Into<String>, value: f64) -> Self {
        Self {
            test_name: test_name.into(),
            numeric_value: Some(value),
            ..Self::default()
        }
    }

    /// The numeric value, if present and finite.
    pub fn finite_value(&self) -> Option<f64> {
        self.numeric_value.filter(|value| value.is_finite())
    }

    /// Numeric value when available, falling back to the free-text result.
    pub fn display_value(&self) -> Option<String> {
        match self.finite_value() {
            Some(value) => Some(crate::format::format_numeric(value)),
            None => self
                .text_value
                .as_ref()
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
        }
    }
}

/// One prescribed drug inside a consultation's treatment plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Medication {
    pub drug_name: String,
    pub quantity: Option<u32>,
    pub description: Option<String>,
    pub duration_days: Option<u32>,
}

/// A clinical visit with its diagnosis and treatment plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Consultation {
    pub id: String,
    pub patient_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub diagnosis: Option<String>,
    pub indications: Option<String>,
    pub medications: Vec<Medication>,
    pub next_visit_date: Option<NaiveDate>,
}

impl Consultation {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: Some(created_at),
            ..Self::default()
        }
    }
}

/// Minimal patient handle returned by identifier lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRef {
    pub id: String,
    pub identifier: Option<String>,
    pub display_name: Option<String>,
}
