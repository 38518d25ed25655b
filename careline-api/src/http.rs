//! Blocking HTTP implementation of [`ClinicApi`].

use std::time::Duration;

use careline_core::{Consultation, LabResult, PatientRef, Reading};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde_json::Value;

use crate::client::{ApiError, ClinicApi, ConsultationQuery, NewReading};
use crate::normalize::{
    consultation_from_value, consultations_from_value, labs_from_value, patient_from_value,
    reading_from_value, readings_from_value,
};
use crate::session::Session;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct HttpClinicApi {
    base_url: Url,
    client: Client,
    timeout_secs: u64,
}

impl HttpClinicApi {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| ApiError::Transport(format!("invalid API URL {base_url}: {err}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, session: &mut Session, segments: &[&str]) -> Result<Value, ApiError> {
        let request = self.client.get(self.url(segments)?);
        self.send(session, request)
    }

    /// Attach credentials, send, and decode the JSON body.
    fn send(&self, session: &mut Session, request: RequestBuilder) -> Result<Value, ApiError> {
        let request = match session.bearer() {
            Some(bearer) => request.header(reqwest::header::AUTHORIZATION, bearer),
            None => request,
        };

        let response = request.send().map_err(|err| {
            if err.is_timeout() {
                ApiError::Transport(format!("request timed out after {}s", self.timeout_secs))
            } else if err.is_connect() {
                ApiError::Transport(format!("could not connect to {}", self.base_url))
            } else {
                ApiError::Transport(err.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            session.clear_on(status);
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(ApiError::from_status(status, detail));
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        response
            .json::<Value>()
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

/// 404 on a collection means "nothing recorded yet".
fn empty_on_not_found<T: Default>(result: Result<T, ApiError>) -> Result<T, ApiError> {
    match result {
        Err(ApiError::NotFound) => Ok(T::default()),
        other => other,
    }
}

impl ClinicApi for HttpClinicApi {
    fn list_readings(
        &self,
        session: &mut Session,
        patient_id: Option<&str>,
    ) -> Result<Vec<Reading>, ApiError> {
        let payload = match patient_id {
            Some(patient_id) => self.get(session, &["glucoses", "patient", patient_id]),
            None => self.get(session, &["glucoses"]),
        };
        empty_on_not_found(payload.map(|payload| readings_from_value(&payload)))
    }

    fn create_reading(&self, session: &mut Session, reading: &NewReading) -> Result<Reading, ApiError> {
        reading.validate()?;
        let request = self.client.post(self.url(&["glucoses"])?).json(reading);
        let payload = self.send(session, request)?;
        reading_from_value(&payload)
            .ok_or_else(|| ApiError::Decode("created reading is missing its id or value".into()))
    }

    fn list_consultations(
        &self,
        session: &mut Session,
        query: &ConsultationQuery,
    ) -> Result<Vec<Consultation>, ApiError> {
        let payload = match query {
            ConsultationQuery::Own => self.get(session, &["patient", "consultations"]),
            ConsultationQuery::Patient(id) => {
                self.get(session, &["admin", "patients", id.as_str(), "visits"])
            }
            ConsultationQuery::Identifier(identifier) => {
                let request = self
                    .client
                    .get(self.url(&["admin", "consultations"])?)
                    .query(&[("cedula", identifier.as_str())]);
                self.send(session, request)
            }
        };
        empty_on_not_found(payload.map(|payload| consultations_from_value(&payload)))
    }

    fn consultation_labs(
        &self,
        session: &mut Session,
        consultation_id: &str,
    ) -> Result<Vec<LabResult>, ApiError> {
        let payload = self.get(session, &["consultations", consultation_id, "print"])?;
        Ok(labs_from_value(&payload))
    }

    fn current_treatment(
        &self,
        session: &mut Session,
        query: &ConsultationQuery,
    ) -> Result<Option<Consultation>, ApiError> {
        let payload = match query {
            ConsultationQuery::Own => self.get(session, &["patient", "me", "current-medication"]),
            ConsultationQuery::Patient(key) | ConsultationQuery::Identifier(key) => {
                self.get(session, &["admin", "patients", key.as_str(), "current-medications"])
            }
        };
        empty_on_not_found(payload.map(|payload| consultation_from_value(&payload)))
    }

    fn find_patient(
        &self,
        session: &mut Session,
        identifier: &str,
    ) -> Result<Option<PatientRef>, ApiError> {
        let request = self
            .client
            .get(self.url(&["admin", "patients"])?)
            .query(&[("cedula", identifier.trim())]);
        empty_on_not_found(self.send(session, request).map(|payload| patient_from_value(&payload)))
    }
}
