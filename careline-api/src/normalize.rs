//! Clinic API JSON to core records.
//!
//! The API has renamed several fields over time, so every extractor accepts
//! the historical aliases. Malformed records are dropped with a debug log;
//! a payload of the wrong shape is an empty list. Only a JSON syntax error
//! is reported as [`CarelineError::Parse`].

use careline_core::{
    CarelineError, Consultation, ConsultationLabs, LabResult, Medication, PatientRef, Reading,
    ReadingKind,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Stored readings above this many mg/dL are data-entry errors.
pub const MAX_RECORDED_GLUCOSE: f64 = 3000.0;

/// Readings from a JSON string.
pub fn parse_readings_str(json: &str) -> Result<Vec<Reading>, CarelineError> {
    Ok(readings_from_value(&parse_json(json)?))
}

pub fn readings_from_value(payload: &Value) -> Vec<Reading> {
    collect_records(payload, None, "reading", reading_from_value)
}

/// A single reading, or `None` when it has no id or no value in
/// `(0, MAX_RECORDED_GLUCOSE]`.
pub fn reading_from_value(record: &Value) -> Option<Reading> {
    let id = first_string(record, &["id"])?;
    let value = first_number(record, &["value"]).filter(|value| is_recordable_glucose(*value))?;
    let kind = first_str(record, &["type", "measurement_type"])
        .map(parse_reading_kind)
        .unwrap_or_default();
    let taken_at = first_str(record, &["taken_at"])
        .or_else(|| first_str(record, &["created_at"]))
        .and_then(parse_timestamp);

    Some(Reading {
        id,
        patient_id: first_string(record, &["patient_id"]),
        value,
        kind,
        taken_at,
        note: first_text(record, &["observation", "note"]),
    })
}

fn is_recordable_glucose(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= MAX_RECORDED_GLUCOSE
}

pub fn parse_reading_kind(raw: &str) -> ReadingKind {
    match raw.trim().to_lowercase().as_str() {
        "fasting" | "ayuno" | "ayunas" => ReadingKind::Fasting,
        "postprandial" | "post-prandial" | "post_meal" => ReadingKind::Postprandial,
        _ => ReadingKind::Unspecified,
    }
}

pub fn parse_consultations_str(json: &str) -> Result<Vec<Consultation>, CarelineError> {
    Ok(consultations_from_value(&parse_json(json)?))
}

pub fn consultations_from_value(payload: &Value) -> Vec<Consultation> {
    collect_records(payload, Some("consultations"), "consultation", consultation_from_value)
}

pub fn consultation_from_value(record: &Value) -> Option<Consultation> {
    let id = first_string(record, &["id"])?;

    let mut medications: Vec<(Option<i64>, Medication)> =
        first_array(record, &["medications", "medicamentos"])
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let order = first_number(item, &["sort_order"]).map(|order| order as i64);
                        medication_from_value(item).map(|medication| (order, medication))
                    })
                    .collect()
            })
            .unwrap_or_default();
    // stable: entries without sort_order keep their input order after the ordered ones
    medications.sort_by_key(|(order, _)| (order.is_none(), order.unwrap_or_default()));

    Some(Consultation {
        id,
        patient_id: first_string(record, &["patient_id"]),
        created_at: first_str(record, &["created_at"]).and_then(parse_timestamp),
        diagnosis: first_text(record, &["diagnosis", "diagnostico"]),
        indications: first_text(record, &["indications", "indicaciones"]),
        medications: medications.into_iter().map(|(_, medication)| medication).collect(),
        next_visit_date: first_str(record, &["next_visit_date"]).and_then(parse_date),
    })
}

fn medication_from_value(item: &Value) -> Option<Medication> {
    let drug_name = first_text(item, &["drug_name", "nombre", "nombre_generico"])?;
    Some(Medication {
        drug_name,
        quantity: first_positive(item, &["quantity", "cantidad"]),
        description: first_text(item, &["description", "descripcion"]),
        duration_days: first_positive(item, &["duration_days", "duracion_dias"]),
    })
}

/// Labs from a JSON string: a bare array or a consultation print payload.
pub fn parse_labs_str(json: &str) -> Result<Vec<LabResult>, CarelineError> {
    Ok(labs_from_value(&parse_json(json)?))
}

pub fn labs_from_value(payload: &Value) -> Vec<LabResult> {
    let consultation_id = payload
        .get("consultation")
        .and_then(|consultation| first_string(consultation, &["id"]));
    let mut labs = collect_records(payload, Some("labs"), "lab result", lab_from_value);
    if let Some(consultation_id) = consultation_id {
        for lab in labs.iter_mut().filter(|lab| lab.consultation_id.is_none()) {
            lab.consultation_id = Some(consultation_id.clone());
        }
    }
    labs
}

/// Labs of one consultation print payload, keyed by its consultation.
///
/// `None` when the payload does not say which consultation it belongs to.
pub fn print_payload_labs(payload: &Value) -> Option<ConsultationLabs> {
    let consultation = payload.get("consultation")?;
    let consultation_id = first_string(consultation, &["id"])?;
    let consultation_date = first_str(consultation, &["created_at"]).and_then(parse_timestamp);
    Some(ConsultationLabs::new(
        consultation_id,
        consultation_date,
        labs_from_value(payload),
    ))
}

pub fn lab_from_value(record: &Value) -> Option<LabResult> {
    let test_name = first_text(record, &["lab_nombre", "test_name"])?;
    Some(LabResult {
        id: first_string(record, &["id"]),
        consultation_id: first_string(record, &["consultation_id", "consulta_id"]),
        test_name,
        numeric_value: first_number(record, &["valor_num", "numeric_value"])
            .filter(|value| value.is_finite()),
        text_value: first_text(record, &["valor_texto", "text_value"]),
        unit: first_text(record, &["unidad_snapshot", "unit"]),
        reference_range: first_text(record, &["rango_ref_snapshot", "reference_range"]),
        observed_at: first_str(record, &["observed_at"]).and_then(parse_timestamp),
    })
}

/// Patient lookup result; the API answers with a single object.
pub fn patient_from_value(record: &Value) -> Option<PatientRef> {
    let record = match record {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let id = first_string(record, &["id"])?;
    let display_name = match (
        first_text(record, &["nombres"]),
        first_text(record, &["apellidos"]),
    ) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (first, last) => first.or(last).or_else(|| first_text(record, &["name", "display_name"])),
    };

    Some(PatientRef {
        id,
        identifier: first_string(record, &["cedula", "identifier"]),
        display_name,
    })
}

/// RFC 3339, or a naive date-time / date taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Calendar date from `YYYY-MM-DD` or the date part of a timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn parse_json(json: &str) -> Result<Value, CarelineError> {
    serde_json::from_str(json).map_err(|err| CarelineError::Parse(err.to_string()))
}

fn collect_records<T>(
    payload: &Value,
    wrapper: Option<&str>,
    what: &str,
    extract: impl Fn(&Value) -> Option<T>,
) -> Vec<T> {
    let items = match (payload, wrapper) {
        (Value::Array(items), _) => items,
        (Value::Object(map), Some(key)) => match map.get(key) {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => {
            tracing::debug!(what, "payload is not a list");
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record = extract(item);
            if record.is_none() {
                tracing::debug!(what, index, "skipping malformed record");
            }
            record
        })
        .collect()
}

fn first_value<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

fn first_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
}

/// Non-empty trimmed text.
fn first_text(record: &Value, keys: &[&str]) -> Option<String> {
    first_str(record, keys).map(str::to_string)
}

/// Identifiers arrive as strings or integers.
fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    match first_value(record, keys)? {
        Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Numbers arrive as JSON numbers or numeric strings.
fn first_number(record: &Value, keys: &[&str]) -> Option<f64> {
    match first_value(record, keys)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn first_positive(record: &Value, keys: &[&str]) -> Option<u32> {
    first_number(record, keys)
        .filter(|value| value.is_finite() && *value >= 1.0 && value.fract() == 0.0)
        .and_then(|value| u32::try_from(value as u64).ok())
}

fn first_array<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_array))
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn reading_aliases_are_accepted() {
        let reading = reading_from_value(&json!({
            "id": 42,
            "patient_id": 7,
            "value": "126",
            "measurement_type": "ayuno",
            "created_at": "2024-03-09T07:30:00Z",
            "note": "before breakfast"
        }))
        .unwrap();

        assert_eq!(reading.id, "42");
        assert_eq!(reading.patient_id.as_deref(), Some("7"));
        assert_eq!(reading.value, 126.0);
        assert_eq!(reading.kind, ReadingKind::Fasting);
        assert_eq!(
            reading.taken_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 7, 30, 0).unwrap())
        );
        assert_eq!(reading.note.as_deref(), Some("before breakfast"));
    }

    #[test]
    fn taken_at_wins_over_created_at() {
        let reading = reading_from_value(&json!({
            "id": "r1",
            "value": 140,
            "type": "postprandial",
            "taken_at": "2024-03-09T13:00:00",
            "created_at": "2024-03-10T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            reading.taken_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 13, 0, 0).unwrap())
        );
        assert_eq!(reading.kind, ReadingKind::Postprandial);
    }

    #[test]
    fn bad_values_reject_but_bad_timestamps_do_not() {
        assert!(reading_from_value(&json!({"id": "a", "value": "n/a"})).is_none());
        assert!(reading_from_value(&json!({"id": "a"})).is_none());
        assert!(reading_from_value(&json!({"value": 100})).is_none());
        assert!(reading_from_value(&json!({"id": "a", "value": 0})).is_none());
        assert!(reading_from_value(&json!({"id": "a", "value": -45})).is_none());
        assert!(reading_from_value(&json!({"id": "a", "value": 1e308})).is_none());
        assert!(reading_from_value(&json!({"id": "a", "value": "9e400"})).is_none());
        assert!(reading_from_value(&json!({"id": "a", "value": 650})).is_some());

        let undated = reading_from_value(&json!({"id": "b", "value": 100, "taken_at": "yesterday"})).unwrap();
        assert_eq!(undated.taken_at, None);
        assert_eq!(undated.kind, ReadingKind::Unspecified);
    }

    #[test]
    fn wrong_shapes_are_empty_and_syntax_errors_fail() {
        assert!(readings_from_value(&json!({"detail": "nope"})).is_empty());
        assert!(readings_from_value(&json!(null)).is_empty());
        assert!(matches!(parse_readings_str("[{"), Err(CarelineError::Parse(_))));
    }

    #[test]
    fn medications_follow_sort_order_then_input_order() {
        let consultation = consultation_from_value(&json!({
            "id": 3,
            "created_at": "2024-05-01T10:00:00Z",
            "next_visit_date": "2024-08-01",
            "medications": [
                {"drug_name": "Loose A"},
                {"drug_name": "Second", "sort_order": 2, "quantity": 30},
                {"drug_name": "First", "sort_order": 1, "duration_days": "90"},
                {"drug_name": "Loose B", "quantity": 0},
                {"quantity": 10}
            ]
        }))
        .unwrap();

        let names: Vec<&str> = consultation
            .medications
            .iter()
            .map(|medication| medication.drug_name.as_str())
            .collect();
        assert_eq!(names, ["First", "Second", "Loose A", "Loose B"]);
        assert_eq!(consultation.medications[0].duration_days, Some(90));
        assert_eq!(consultation.medications[1].quantity, Some(30));
        assert_eq!(consultation.medications[3].quantity, None);
        assert_eq!(consultation.next_visit_date, NaiveDate::from_ymd_opt(2024, 8, 1));
    }

    #[test]
    fn next_visit_accepts_a_timestamp() {
        assert_eq!(
            parse_date("2024-08-01T00:00:00-05:00"),
            NaiveDate::from_ymd_opt(2024, 8, 1)
        );
        assert_eq!(parse_date("2024-08-01T09:00:00"), NaiveDate::from_ymd_opt(2024, 8, 1));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn print_payload_labs_inherit_the_consultation() {
        let labs = labs_from_value(&json!({
            "consultation": {"id": 9, "created_at": "2024-02-01T09:00:00Z"},
            "labs": [
                {"lab_nombre": "HbA1c", "valor_num": "7.4", "unidad_snapshot": "%"},
                {"test_name": "Orina", "text_value": "Negativo"},
                {"valor_num": 1.0}
            ]
        }));

        assert_eq!(labs.len(), 2);
        assert_eq!(labs[0].consultation_id.as_deref(), Some("9"));
        assert_eq!(labs[0].numeric_value, Some(7.4));
        assert_eq!(labs[0].unit.as_deref(), Some("%"));
        assert_eq!(labs[1].text_value.as_deref(), Some("Negativo"));
        assert!(labs_from_value(&json!({"consultation": {}})).is_empty());
    }

    #[test]
    fn print_payload_carries_the_consultation_date() {
        let labs = print_payload_labs(&json!({
            "consultation": {"id": "c7", "created_at": "2024-02-01T09:00:00Z"},
            "labs": [{"lab_nombre": "TFG", "valor_num": 92}]
        }))
        .unwrap();
        assert_eq!(labs.consultation_id, "c7");
        assert_eq!(
            labs.consultation_date,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(labs.labs[0].numeric_value, Some(92.0));

        assert!(print_payload_labs(&json!({"labs": []})).is_none());
    }

    #[test]
    fn patient_lookup_builds_a_display_name() {
        let patient = patient_from_value(&json!({
            "id": 12,
            "cedula": "0912345678",
            "nombres": "Ana",
            "apellidos": "Pérez"
        }))
        .unwrap();
        assert_eq!(patient.id, "12");
        assert_eq!(patient.identifier.as_deref(), Some("0912345678"));
        assert_eq!(patient.display_name.as_deref(), Some("Ana Pérez"));
    }
}
