//! Clinic API adapter: JSON normalization, session handling, the
//! [`ClinicApi`] seam with its HTTP implementation, and the loaders that
//! turn one display update into a core panel.

pub mod client;
pub mod dashboard;
#[cfg(feature = "http")]
pub mod http;
pub mod normalize;
pub mod session;

pub use client::{ApiError, ClinicApi, ConsultationQuery, NewReading};
pub use dashboard::{
    find_patient, load_current_treatment, load_glucose_panel, load_hba1c_history,
    load_summary_panel, submit_reading, LookupOutcome, PatientLookup,
};
#[cfg(feature = "http")]
pub use http::HttpClinicApi;
pub use normalize::{
    consultations_from_value, labs_from_value, parse_consultations_str, parse_labs_str,
    parse_readings_str, patient_from_value, print_payload_labs, readings_from_value,
};
pub use session::{Role, Session};
