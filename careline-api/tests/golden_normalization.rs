use std::fs;

use careline_api::{parse_consultations_str, parse_labs_str, parse_readings_str};
use careline_core::{Reading, ReadingKind};
use chrono::NaiveDate;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture should be readable")
}

#[test]
fn readings_match_golden() {
    let readings = parse_readings_str(&read_fixture("glucose_readings.json"))
        .expect("readings should parse");

    let expected: Vec<Reading> =
        serde_json::from_str(&read_fixture("glucose_readings_normalized.json"))
            .expect("golden should be valid");

    assert_eq!(readings, expected);
}

#[test]
fn consultation_history_keeps_every_visit() {
    let consultations = parse_consultations_str(&read_fixture("consultations.json"))
        .expect("consultations should parse");

    assert_eq!(consultations.len(), 3);
    let latest = &consultations[2];
    assert_eq!(latest.id, "3");
    assert_eq!(latest.next_visit_date, NaiveDate::from_ymd_opt(2024, 6, 21));
    assert_eq!(latest.indications.as_deref(), Some("Caminar 30 minutos al dia"));

    let names: Vec<&str> = latest
        .medications
        .iter()
        .map(|medication| medication.drug_name.as_str())
        .collect();
    assert_eq!(names, ["Empagliflozina", "Metformina"]);
    assert_eq!(latest.medications[1].quantity, Some(60));
    assert_eq!(latest.medications[1].duration_days, Some(90));
}

#[test]
fn print_payload_labs_are_normalized() {
    let labs = parse_labs_str(&read_fixture("consultation_1_print.json"))
        .expect("print payload should parse");

    assert_eq!(labs.len(), 2);
    assert_eq!(labs[0].test_name, "Hemoglobina glicosilada");
    assert_eq!(labs[0].numeric_value, Some(8.9));
    assert_eq!(labs[0].reference_range.as_deref(), Some("4.0-5.6"));
    assert_eq!(labs[0].consultation_id.as_deref(), Some("1"));
    assert_eq!(labs[1].display_value().as_deref(), Some("1.1"));
}

#[test]
fn text_only_labs_keep_their_text() {
    let labs = parse_labs_str(&read_fixture("consultation_2_print.json"))
        .expect("print payload should parse");

    let urine = labs
        .iter()
        .find(|lab| lab.test_name == "Orina")
        .expect("urine result present");
    assert_eq!(urine.numeric_value, None);
    assert_eq!(urine.display_value().as_deref(), Some("Negativo"));
}

#[test]
fn reading_kinds_survive_the_boundary() {
    let readings = parse_readings_str(&read_fixture("glucose_readings.json"))
        .expect("readings should parse");
    let kinds: Vec<ReadingKind> = readings.iter().map(|reading| reading.kind).collect();
    assert_eq!(
        kinds,
        [
            ReadingKind::Fasting,
            ReadingKind::Postprandial,
            ReadingKind::Fasting,
            ReadingKind::Unspecified
        ]
    );
}
