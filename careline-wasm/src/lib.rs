//! WASM <-> JavaScript bridge for the careline panels.
//!
//! Records go in as the clinic API's raw JSON; panels come out as plain JS
//! objects ready for a chart surface. The caller supplies "now" so the
//! output is a pure function of the inputs.

use careline_api::normalize::{consultations_from_value, print_payload_labs, readings_from_value};
use careline_core::panel::{build_glucose_panel, build_hba1c_history, build_summary_panel};
use careline_core::{
    advise_visit_with_window, CarelineConfig, CarelineError, ChartGeometry, ConsultationLabs,
    Lookback, WindowPreset,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
struct JsCarelineConfig {
    #[serde(default)]
    hypo_threshold: Option<f64>,
    #[serde(default)]
    hyper_threshold: Option<f64>,
    #[serde(default)]
    trend_epsilon: Option<f64>,
    #[serde(default)]
    default_window_days: Option<u32>,
    #[serde(default)]
    visit_warning_days: Option<i64>,
    #[serde(default)]
    important_labs: Option<Vec<String>>,
    #[serde(default)]
    max_lab_consultations: Option<usize>,
    #[serde(default)]
    canvas_width: Option<f64>,
    #[serde(default)]
    canvas_height: Option<f64>,
    /// `-new Date().getTimezoneOffset()` on the JS side.
    #[serde(default)]
    utc_offset_minutes: Option<i32>,
}

impl From<JsCarelineConfig> for CarelineConfig {
    fn from(cfg: JsCarelineConfig) -> Self {
        let mut base = CarelineConfig::default();
        if let Some(hypo) = cfg.hypo_threshold {
            base.thresholds.hypo = hypo;
        }
        if let Some(hyper) = cfg.hyper_threshold {
            base.thresholds.hyper = hyper;
        }
        if let Some(epsilon) = cfg.trend_epsilon {
            base.trend_epsilon = epsilon;
        }
        if let Some(days) = cfg.default_window_days {
            base.default_window_days = Some(days);
        }
        if let Some(days) = cfg.visit_warning_days {
            base.visit_warning_days = days;
        }
        if let Some(labs) = cfg.important_labs {
            base.important_labs = labs;
        }
        if let Some(limit) = cfg.max_lab_consultations {
            base.max_lab_consultations = limit;
        }
        if let Some(width) = cfg.canvas_width {
            base.canvas.width = width;
        }
        if let Some(height) = cfg.canvas_height {
            base.canvas.height = height;
        }
        if let Some(minutes) = cfg.utc_offset_minutes {
            base.utc_offset_minutes = Some(minutes);
        }
        base
    }
}

/// A panel plus the SVG path of its chart, if any.
#[derive(Serialize)]
struct WithPath<T> {
    #[serde(flatten)]
    panel: T,
    svg_path: Option<String>,
}

#[derive(Serialize)]
struct PresetView {
    key: &'static str,
    label: &'static str,
    days: Option<u32>,
}

#[wasm_bindgen]
pub fn glucose_panel(
    readings: JsValue,
    window: Option<String>,
    now_ms: f64,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let readings = readings_from_value(&read_json(readings, "readings")?);
    let cfg = read_config(config)?;
    let window_days = resolve_window(window.as_deref(), &cfg).map_err(js_error)?;
    let now = parse_now(now_ms).map_err(js_error)?;

    let panel = build_glucose_panel(&readings, &cfg, window_days, now);
    let svg_path = panel.chart.as_ref().map(ChartGeometry::svg_path);
    write(&WithPath { panel, svg_path }, "glucose panel")
}

#[wasm_bindgen]
pub fn summary_panel(
    consultations: JsValue,
    print_payloads: JsValue,
    today: &str,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let consultations = consultations_from_value(&read_json(consultations, "consultations")?);
    let labs = read_print_payloads(print_payloads)?;
    let cfg = read_config(config)?;
    let today = parse_day(today).map_err(js_error)?;

    let panel = build_summary_panel(&consultations, &labs, &cfg, today);
    write(&panel, "summary panel")
}

#[wasm_bindgen]
pub fn hba1c_history(
    print_payloads: JsValue,
    lookback_months: Option<u32>,
    now_ms: f64,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let labs = read_print_payloads(print_payloads)?;
    let cfg = read_config(config)?;
    let lookback = lookback_months.map_or(Lookback::All, Lookback::Months);
    let now = parse_now(now_ms).map_err(js_error)?;

    let history = build_hba1c_history(&labs, &cfg, lookback, now);
    let svg_path = history.chart.as_ref().map(ChartGeometry::svg_path);
    write(
        &WithPath {
            panel: history,
            svg_path,
        },
        "HbA1c history",
    )
}

#[wasm_bindgen]
pub fn visit_advice(
    next_visit: Option<String>,
    today: &str,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    let cfg = read_config(config)?;
    let next_visit = next_visit
        .as_deref()
        .map(parse_day)
        .transpose()
        .map_err(js_error)?;
    let today = parse_day(today).map_err(js_error)?;
    let advice = advise_visit_with_window(next_visit, today, cfg.visit_warning_days);
    write(&advice, "visit advice")
}

#[wasm_bindgen]
pub fn window_presets() -> Result<JsValue, JsValue> {
    let presets: Vec<PresetView> = WindowPreset::ALL
        .into_iter()
        .map(|preset| PresetView {
            key: preset.key(),
            label: preset.label(),
            days: preset.days(),
        })
        .collect();
    write(&presets, "window presets")
}

fn read_json(value: JsValue, what: &str) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(value)
        .map_err(|err| js_error(CarelineError::Parse(format!("{what}: {err}"))))
}

fn read_config(config: Option<JsValue>) -> Result<CarelineConfig, JsValue> {
    match config {
        Some(js_cfg) => {
            let cfg: JsCarelineConfig = from_value(js_cfg)
                .map_err(|err| js_error(CarelineError::Parse(format!("config: {err}"))))?;
            Ok(CarelineConfig::from(cfg))
        }
        None => Ok(CarelineConfig::default()),
    }
}

/// Print payloads without a consultation id are skipped.
fn read_print_payloads(payloads: JsValue) -> Result<Vec<ConsultationLabs>, JsValue> {
    let payloads = read_json(payloads, "lab payloads")?;
    Ok(payloads
        .as_array()
        .map(|items| items.iter().filter_map(print_payload_labs).collect())
        .unwrap_or_default())
}

fn resolve_window(
    window: Option<&str>,
    cfg: &CarelineConfig,
) -> Result<Option<u32>, CarelineError> {
    match window {
        None => Ok(cfg.default_window_days),
        Some(key) => WindowPreset::from_key(key)
            .map(WindowPreset::days)
            .ok_or_else(|| CarelineError::Parse(format!("unknown window {key}"))),
    }
}

fn parse_now(now_ms: f64) -> Result<DateTime<Utc>, CarelineError> {
    if !now_ms.is_finite() {
        return Err(CarelineError::Parse("now must be a finite timestamp".into()));
    }
    DateTime::from_timestamp_millis(now_ms as i64)
        .ok_or_else(|| CarelineError::Parse(format!("timestamp out of range: {now_ms}")))
}

fn parse_day(raw: &str) -> Result<NaiveDate, CarelineError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| CarelineError::Parse(format!("date {raw}: {err}")))
}

fn write<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|err| JsValue::from_str(&format!("could not serialize {what}: {err}")))
}

fn js_error(err: CarelineError) -> JsValue {
    JsValue::from_str(&format!("Careline error: {err}"))
}
