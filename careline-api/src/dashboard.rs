//! One display update end to end: fetch, normalize, aggregate.
//!
//! A 401/403 anywhere aborts the whole update with
//! [`CarelineError::Unauthorized`] after clearing the session. Any other
//! failure of a single consultation's lab fetch only costs that
//! consultation its labs.

use careline_core::panel::{build_glucose_panel, build_hba1c_history, build_summary_panel};
use std::time::Instant;

use careline_core::{
    CarelineConfig, CarelineError, Consultation, ConsultationLabs, Debouncer, GlucosePanel,
    Hba1cHistory, Lookback, PatientRef, Reading, RequestTicket, RequestTracker, SummaryPanel,
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::client::{ApiError, ClinicApi, ConsultationQuery, NewReading};
use crate::session::Session;

pub fn load_glucose_panel<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    patient_id: Option<&str>,
    config: &CarelineConfig,
    window_days: Option<u32>,
    now: DateTime<Utc>,
) -> Result<GlucosePanel, CarelineError> {
    let readings = api
        .list_readings(session, patient_id)
        .or_else(empty_when_missing)
        .map_err(|err| reject(session, err))?;
    Ok(build_glucose_panel(&readings, config, window_days, now))
}

pub fn load_summary_panel<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    query: &ConsultationQuery,
    config: &CarelineConfig,
    today: NaiveDate,
) -> Result<SummaryPanel, CarelineError> {
    let consultations = list_consultations(api, session, query)?;
    let labs = fetch_labs(api, session, &consultations)?;
    Ok(build_summary_panel(&consultations, &labs, config, today))
}

pub fn load_hba1c_history<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    query: &ConsultationQuery,
    config: &CarelineConfig,
    lookback: Lookback,
    now: DateTime<Utc>,
) -> Result<Hba1cHistory, CarelineError> {
    let mut consultations = list_consultations(api, session, query)?;
    consultations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    consultations.truncate(config.max_lab_consultations);

    let labs = fetch_labs(api, session, &consultations)?;
    Ok(build_hba1c_history(&labs, config, lookback, now))
}

/// The consultation holding the patient's current medication, straight from
/// the API. `None` when the patient has none or the identifier is blank.
pub fn load_current_treatment<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    query: &ConsultationQuery,
) -> Result<Option<Consultation>, CarelineError> {
    if let ConsultationQuery::Patient(key) | ConsultationQuery::Identifier(key) = query {
        if key.trim().is_empty() {
            return Ok(None);
        }
    }
    api.current_treatment(session, query)
        .or_else(empty_when_missing)
        .map_err(|err| reject(session, err))
}

/// Validate and submit a self-reported reading.
pub fn submit_reading<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    reading: &NewReading,
) -> Result<Reading, CarelineError> {
    reading.validate()?;
    api.create_reading(session, reading)
        .map_err(|err| reject(session, err))
}

/// Staff lookup of a patient by national identifier. Blank input finds nobody.
pub fn find_patient<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    identifier: &str,
) -> Result<Option<PatientRef>, CarelineError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Ok(None);
    }
    api.find_patient(session, identifier)
        .or_else(empty_when_missing)
        .map_err(|err| reject(session, err))
}

/// What a ticketed patient lookup produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(PatientRef),
    NotFound,
    /// A newer lookup was issued while this one was in flight.
    Stale,
}

/// Search-as-you-type patient lookup: input is debounced and only the most
/// recently issued request may publish its result.
#[derive(Debug)]
pub struct PatientLookup {
    debouncer: Debouncer,
    tracker: RequestTracker,
}

impl PatientLookup {
    pub fn new(config: &CarelineConfig) -> Self {
        Self {
            debouncer: Debouncer::from_config(config),
            tracker: RequestTracker::new(),
        }
    }

    pub fn input(&mut self, text: &str, now: Instant) {
        self.debouncer.push(text, now);
    }

    /// A ticket for the settled input, once the quiet period has passed.
    pub fn poll(&mut self, now: Instant) -> Option<(RequestTicket, String)> {
        let identifier = self.debouncer.poll(now)?;
        Some((self.tracker.issue(), identifier))
    }

    /// Explicit search: skips the quiet period. Blank input issues nothing.
    pub fn submit(&mut self, text: &str) -> Option<(RequestTicket, String)> {
        self.debouncer.cancel();
        let identifier = text.trim();
        if identifier.is_empty() {
            return None;
        }
        Some((self.tracker.issue(), identifier.to_string()))
    }

    /// Run the request behind `ticket`. Results and errors of superseded
    /// tickets are discarded; a 401/403 still clears the session.
    pub fn run<A: ClinicApi + ?Sized>(
        &self,
        api: &A,
        session: &mut Session,
        ticket: RequestTicket,
        identifier: &str,
    ) -> Result<LookupOutcome, CarelineError> {
        let result = find_patient(api, session, identifier);
        match self.tracker.accept(ticket, result) {
            None => Ok(LookupOutcome::Stale),
            Some(Ok(Some(patient))) => Ok(LookupOutcome::Found(patient)),
            Some(Ok(None)) => Ok(LookupOutcome::NotFound),
            Some(Err(err)) => Err(err),
        }
    }
}

fn list_consultations<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    query: &ConsultationQuery,
) -> Result<Vec<Consultation>, CarelineError> {
    api.list_consultations(session, query)
        .or_else(empty_when_missing)
        .map_err(|err| reject(session, err))
}

fn fetch_labs<A: ClinicApi + ?Sized>(
    api: &A,
    session: &mut Session,
    consultations: &[Consultation],
) -> Result<Vec<ConsultationLabs>, CarelineError> {
    let mut fetched = Vec::with_capacity(consultations.len());
    for consultation in consultations {
        match api.consultation_labs(session, &consultation.id) {
            Ok(labs) => fetched.push(ConsultationLabs::new(
                consultation.id.clone(),
                consultation.created_at,
                labs,
            )),
            Err(err) if err.is_unauthorized() => return Err(reject(session, err)),
            Err(err) => {
                tracing::warn!(
                    consultation = %consultation.id,
                    error = %err,
                    "lab fetch failed, treating consultation as having no labs"
                );
                fetched.push(ConsultationLabs::unavailable(
                    consultation.id.clone(),
                    consultation.created_at,
                ));
            }
        }
    }
    Ok(fetched)
}

fn empty_when_missing<T: Default>(err: ApiError) -> Result<T, ApiError> {
    match err {
        ApiError::NotFound => Ok(T::default()),
        other => Err(other),
    }
}

/// Convert to the core error, clearing the session on 401/403.
fn reject(session: &mut Session, err: ApiError) -> CarelineError {
    if let ApiError::Unauthorized { status } = err {
        session.clear_on(status);
    }
    err.into()
}
