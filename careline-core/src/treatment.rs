//! Current treatment plan from a consultation history.

use crate::model::Consultation;

/// The most recently created consultation.
///
/// Ties keep the first one seen. Consultations without a creation date only
/// win when no dated consultation exists.
pub fn current_treatment(consultations: &[Consultation]) -> Option<&Consultation> {
    consultations.iter().fold(None, |best: Option<&Consultation>, candidate| match best {
        Some(current) if candidate.created_at <= current.created_at => Some(current),
        _ => Some(candidate),
    })
}
