//! Next-visit countdown and urgency.

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::format::format_date;

/// More than this many days ahead is `Ok`; from zero up to it is `Warn`.
pub const DEFAULT_VISIT_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Neutral,
    Ok,
    Warn,
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitAdvice {
    pub status: VisitStatus,
    /// Whole days from today to the visit; negative once it has passed.
    pub days_delta: Option<i64>,
    pub message: String,
}

impl VisitAdvice {
    pub fn overdue_days(&self) -> Option<i64> {
        match (self.status, self.days_delta) {
            (VisitStatus::Overdue, Some(delta)) => Some(delta.abs()),
            _ => None,
        }
    }
}

/// Strip the time of day in the timestamp's own zone.
pub fn calendar_day<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NaiveDate {
    timestamp.date_naive()
}

pub fn advise_visit(next_visit: Option<NaiveDate>, today: NaiveDate) -> VisitAdvice {
    advise_visit_with_window(next_visit, today, DEFAULT_VISIT_WARNING_DAYS)
}

pub fn advise_visit_with_window(
    next_visit: Option<NaiveDate>,
    today: NaiveDate,
    warning_days: i64,
) -> VisitAdvice {
    let Some(next_visit) = next_visit else {
        return VisitAdvice {
            status: VisitStatus::Neutral,
            days_delta: None,
            message: "Your doctor has not scheduled the next visit yet.".to_string(),
        };
    };

    let delta = next_visit.signed_duration_since(today).num_days();
    let date = format_date(next_visit);
    let (status, message) = if delta > warning_days {
        (
            VisitStatus::Ok,
            format!("Your next check-up is scheduled for {date}. {delta} days to go."),
        )
    } else if delta >= 0 {
        (
            VisitStatus::Warn,
            format!("Your check-up is coming up ({date}). {delta} days to go."),
        )
    } else {
        let overdue = delta.abs();
        (
            VisitStatus::Overdue,
            format!(
                "Your check-up was scheduled for {date} and is {overdue} days overdue. Please book an appointment."
            ),
        )
    };

    VisitAdvice {
        status,
        days_delta: Some(delta),
        message,
    }
}
