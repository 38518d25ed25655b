//! Core logic for the diabetes follow-up panels: glucose windows, target
//! bands, trends, chart geometry, latest labs, current treatment and the
//! next-visit countdown.
//!
//! Everything here is a pure function of already-normalized records. Parsing
//! collaborator payloads and talking to the clinic API live in `careline-api`.

pub mod band;
pub mod chart;
pub mod config;
pub mod format;
pub mod labs;
pub mod lookup;
pub mod model;
pub mod panel;
pub mod treatment;
pub mod trend;
pub mod visit;
pub mod window;

pub use band::{
    adherence, classify_point, classify_ratio, reading_adherence, AdherenceStatus,
    AdherenceSummary, Band, BandSet, GlycemicThresholds, PointStatus, Zone,
};
pub use chart::{build_chart, build_chart_with_margins, Canvas, ChartGeometry, ChartPoint, Padding};
pub use config::CarelineConfig;
pub use labs::{lab_history, resolve_latest_labs, ConsultationLabs, LabPoint, LatestLab};
pub use lookup::{Debouncer, RequestTicket, RequestTracker};
pub use model::{Consultation, LabResult, Medication, PatientRef, Reading, ReadingKind};
pub use panel::{
    build_glucose_panel, build_hba1c_history, build_summary_panel, GlucosePanel, Hba1cHistory,
    SummaryPanel,
};
pub use treatment::current_treatment;
pub use trend::{pairwise_trends, trend, Trend};
pub use visit::{advise_visit, advise_visit_with_window, calendar_day, VisitAdvice, VisitStatus};
pub use window::{filter_lookback, filter_window, order_newest_first, Lookback, Timestamped, WindowPreset};

/// Errors raised at the edges of the core: malformed input and the clinic API.
///
/// Aggregations never fail; missing data is an explicit empty state instead.
#[derive(Debug, thiserror::Error)]
pub enum CarelineError {
    #[error("missing data")]
    MissingData,
    #[error("failed to parse input: {0}")]
    Parse(String),
    #[error("session expired or not authorized")]
    Unauthorized,
    #[error("clinic service unavailable, try again: {0}")]
    Collaborator(String),
    #[error("{0}")]
    Other(String),
}

impl CarelineError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CarelineError::Collaborator(_))
    }
}
