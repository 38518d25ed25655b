//! The clinic API seam: what the loaders need from the remote service.

use careline_core::{CarelineError, Consultation, LabResult, PatientRef, Reading, ReadingKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::{is_auth_failure, Session};

/// Readings outside this open range (mg/dL) are rejected before submission.
pub const MIN_PLAUSIBLE_GLUCOSE: f64 = 20.0;
pub const MAX_PLAUSIBLE_GLUCOSE: f64 = 600.0;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authorized (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("resource not found")]
    NotFound,
    #[error("clinic API returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("could not reach the clinic API: {0}")]
    Transport(String),
    #[error("unexpected response from the clinic API: {0}")]
    Decode(String),
    #[error("invalid reading: {0}")]
    Invalid(String),
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            status if is_auth_failure(status) => ApiError::Unauthorized { status },
            404 => ApiError::NotFound,
            status => ApiError::Status {
                status,
                detail: detail.into(),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

impl From<ApiError> for CarelineError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized { .. } => CarelineError::Unauthorized,
            ApiError::Invalid(reason) => CarelineError::Other(reason),
            ApiError::Decode(reason) => CarelineError::Parse(reason),
            other => CarelineError::Collaborator(other.to_string()),
        }
    }
}

/// Which consultations to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationQuery {
    /// Staff view of a patient by internal id.
    Patient(String),
    /// Staff view of a patient by national identifier.
    Identifier(String),
    /// The logged-in patient's own history.
    Own,
}

/// A self-reported reading about to be submitted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewReading {
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: ReadingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(rename = "observation", skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NewReading {
    pub fn new(value: f64, kind: ReadingKind) -> Self {
        Self {
            value,
            kind,
            taken_at: None,
            note: None,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if !self.value.is_finite() {
            return Err(ApiError::Invalid("value must be a number".into()));
        }
        if self.value <= MIN_PLAUSIBLE_GLUCOSE || self.value >= MAX_PLAUSIBLE_GLUCOSE {
            return Err(ApiError::Invalid(format!(
                "value must be between {MIN_PLAUSIBLE_GLUCOSE} and {MAX_PLAUSIBLE_GLUCOSE} mg/dL"
            )));
        }
        Ok(())
    }
}

/// Remote clinic service.
///
/// Implementations clear `session` on 401/403 before returning
/// [`ApiError::Unauthorized`].
pub trait ClinicApi {
    /// Readings of `patient_id`, or of the logged-in patient when `None`.
    /// A 404 means the patient has no readings yet.
    fn list_readings(
        &self,
        session: &mut Session,
        patient_id: Option<&str>,
    ) -> Result<Vec<Reading>, ApiError>;

    fn create_reading(&self, session: &mut Session, reading: &NewReading) -> Result<Reading, ApiError>;

    fn list_consultations(
        &self,
        session: &mut Session,
        query: &ConsultationQuery,
    ) -> Result<Vec<Consultation>, ApiError>;

    fn consultation_labs(
        &self,
        session: &mut Session,
        consultation_id: &str,
    ) -> Result<Vec<LabResult>, ApiError>;

    /// Server-side shortcut for the consultation carrying the current plan.
    fn current_treatment(
        &self,
        session: &mut Session,
        query: &ConsultationQuery,
    ) -> Result<Option<Consultation>, ApiError>;

    fn find_patient(
        &self,
        session: &mut Session,
        identifier: &str,
    ) -> Result<Option<PatientRef>, ApiError>;
}
