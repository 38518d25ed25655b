use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use careline_api::http::DEFAULT_TIMEOUT_SECS;
use careline_api::{
    load_current_treatment, load_glucose_panel, load_hba1c_history, load_summary_panel,
    parse_consultations_str, parse_readings_str, print_payload_labs, ConsultationQuery,
    HttpClinicApi, LookupOutcome, PatientLookup, Role, Session,
};
use careline_core::band::AdherenceStatus;
use careline_core::format::{
    format_date, format_glucose, format_hba1c, format_short_date, medication_dose,
    medication_duration,
};
use careline_core::panel::{
    build_glucose_panel, build_hba1c_history, build_summary_panel, GlucosePanel, Hba1cHistory,
    SummaryPanel, NO_CONSULTATIONS,
};
use careline_core::{
    calendar_day, current_treatment, CarelineConfig, Consultation, ConsultationLabs, Lookback,
    WindowPreset,
};
use chrono::{FixedOffset, Local, NaiveDate, Offset, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,careline_api=info";

#[derive(Parser, Debug)]
#[command(
    name = "careline-cli",
    about = "Render glucose, treatment and HbA1c panels from JSON files or the clinic API."
)]
struct Args {
    /// JSON file overriding parts of the default configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print the panel as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Remote {
    /// Clinic API base URL; used when no input files are given.
    #[arg(long, env = "CARELINE_API_URL")]
    api_url: Option<String>,
    #[arg(long, env = "CARELINE_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, value_enum, default_value_t = RoleArg::Patient)]
    role: RoleArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Staff,
    Patient,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Staff => Role::Staff,
            RoleArg::Patient => Role::Patient,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Glucose history, adherence and chart for a window.
    Glucose {
        /// File with the readings payload.
        #[arg(long)]
        readings: Option<PathBuf>,
        /// Patient id (staff); defaults to the logged-in patient.
        #[arg(long)]
        patient: Option<String>,
        /// One of 7, 30, 90 or all.
        #[arg(long)]
        window: Option<String>,
        #[command(flatten)]
        remote: Remote,
    },
    /// Current treatment, latest labs and next visit.
    Summary {
        /// File with the consultations payload.
        #[arg(long)]
        consultations: Option<PathBuf>,
        /// Consultation print payloads, one file each.
        #[arg(long = "labs")]
        labs: Vec<PathBuf>,
        /// National identifier of the patient (staff).
        #[arg(long)]
        cedula: Option<String>,
        /// Reference day, YYYY-MM-DD; defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
        #[command(flatten)]
        remote: Remote,
    },
    /// HbA1c results across recent consultations.
    Hba1c {
        #[arg(long = "labs")]
        labs: Vec<PathBuf>,
        /// Restrict the chart to the last N months.
        #[arg(long)]
        months: Option<u32>,
        #[arg(long)]
        cedula: Option<String>,
        #[command(flatten)]
        remote: Remote,
    },
    /// Current medication: the newest consultation's prescription.
    Treatment {
        /// File with the consultations payload.
        #[arg(long)]
        consultations: Option<PathBuf>,
        /// National identifier of the patient (staff).
        #[arg(long)]
        cedula: Option<String>,
        #[command(flatten)]
        remote: Remote,
    },
    /// Look a patient up by national identifier.
    Patient {
        cedula: String,
        #[command(flatten)]
        remote: Remote,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if config.utc_offset_minutes.is_none() {
        config.utc_offset_minutes = Some(Local::now().offset().fix().local_minus_utc() / 60);
    }
    let offset = config.display_offset();
    let now = Utc::now();

    match args.command {
        Command::Glucose {
            readings,
            patient,
            window,
            remote,
        } => {
            let window_days = match window.as_deref() {
                Some(key) => WindowPreset::from_key(key)
                    .with_context(|| format!("unknown window {key}, expected 7, 30, 90 or all"))?
                    .days(),
                None => config.default_window_days,
            };
            let panel = match readings {
                Some(path) => {
                    let readings = parse_readings_str(&read_file(&path)?)?;
                    build_glucose_panel(&readings, &config, window_days, now)
                }
                None => {
                    let (api, mut session) = connect(&remote)?;
                    load_glucose_panel(
                        &api,
                        &mut session,
                        patient.as_deref(),
                        &config,
                        window_days,
                        now,
                    )?
                }
            };
            emit(args.json, &panel, print_glucose)
        }
        Command::Summary {
            consultations,
            labs,
            cedula,
            today,
            remote,
        } => {
            let today = today.unwrap_or_else(|| calendar_day(&Local::now()));
            let panel = match consultations {
                Some(path) => {
                    let consultations = parse_consultations_str(&read_file(&path)?)?;
                    let labs = read_print_payloads(&labs)?;
                    build_summary_panel(&consultations, &labs, &config, today)
                }
                None => {
                    let (api, mut session) = connect(&remote)?;
                    load_summary_panel(&api, &mut session, &query_for(cedula), &config, today)?
                }
            };
            emit(args.json, &panel, print_summary)
        }
        Command::Hba1c {
            labs,
            months,
            cedula,
            remote,
        } => {
            let lookback = months.map_or(Lookback::All, Lookback::Months);
            let history = if labs.is_empty() {
                let (api, mut session) = connect(&remote)?;
                load_hba1c_history(&api, &mut session, &query_for(cedula), &config, lookback, now)?
            } else {
                build_hba1c_history(&read_print_payloads(&labs)?, &config, lookback, now)
            };
            emit(args.json, &history, |history| print_hba1c(history, offset))
        }
        Command::Treatment {
            consultations,
            cedula,
            remote,
        } => {
            let current = match consultations {
                Some(path) => {
                    let consultations = parse_consultations_str(&read_file(&path)?)?;
                    current_treatment(&consultations).cloned()
                }
                None => {
                    let (api, mut session) = connect(&remote)?;
                    load_current_treatment(&api, &mut session, &query_for(cedula))?
                }
            };
            emit(args.json, &current, print_treatment)
        }
        Command::Patient { cedula, remote } => {
            let (api, mut session) = connect(&remote)?;
            let mut lookup = PatientLookup::new(&config);
            let Some((ticket, identifier)) = lookup.submit(&cedula) else {
                bail!("identifier required");
            };
            match lookup.run(&api, &mut session, ticket, &identifier)? {
                LookupOutcome::Found(patient) => println!(
                    "{} ({})",
                    patient.display_name.as_deref().unwrap_or("Unnamed patient"),
                    patient.id
                ),
                LookupOutcome::NotFound | LookupOutcome::Stale => {
                    println!("No patient with identifier {identifier}")
                }
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CarelineConfig> {
    let Some(path) = path else {
        return Ok(CarelineConfig::default());
    };
    let raw = read_file(path)?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("invalid configuration in {path:?}"))?;
    tracing::debug!(?path, "loaded configuration overrides");
    Ok(config)
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("could not read {path:?}"))
}

fn read_print_payloads(paths: &[PathBuf]) -> anyhow::Result<Vec<ConsultationLabs>> {
    paths
        .iter()
        .map(|path| {
            let payload: serde_json::Value = serde_json::from_str(&read_file(path)?)
                .with_context(|| format!("invalid JSON in {path:?}"))?;
            print_payload_labs(&payload)
                .with_context(|| format!("{path:?} does not name its consultation"))
        })
        .collect()
}

fn connect(remote: &Remote) -> anyhow::Result<(HttpClinicApi, Session)> {
    let (Some(url), Some(token)) = (remote.api_url.as_deref(), remote.token.as_deref()) else {
        bail!("no input file given; pass --api-url and --token to load from the clinic API");
    };
    let api = HttpClinicApi::new(url, DEFAULT_TIMEOUT_SECS)?;
    Ok((api, Session::new(token, remote.role.into())))
}

fn query_for(cedula: Option<String>) -> ConsultationQuery {
    cedula.map_or(ConsultationQuery::Own, ConsultationQuery::Identifier)
}

fn emit<T: serde::Serialize>(json: bool, panel: &T, print: impl Fn(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(panel)?);
    } else {
        print(panel);
    }
    Ok(())
}

fn print_glucose(panel: &GlucosePanel) {
    let window = panel
        .window_days
        .map_or_else(|| "all time".to_string(), |days| format!("last {days} days"));
    println!("Glucose, {window}");

    if let Some(latest) = &panel.latest {
        println!(
            "Latest: {} ({})",
            format_glucose(latest.reading.value),
            latest.status.label()
        );
    }
    if let Some(ratio) = panel.adherence.ratio {
        let verdict = match panel.adherence.status {
            AdherenceStatus::Ok => "good control",
            AdherenceStatus::Warn => "needs attention",
            AdherenceStatus::High => "poor control",
            AdherenceStatus::NoData => "no data",
        };
        println!(
            "In target: {}/{} ({:.0}%, {verdict})",
            panel.adherence.in_target,
            panel.adherence.total,
            ratio * 100.0
        );
    }
    for row in &panel.readings {
        let when = row
            .reading
            .taken_at
            .map(|taken_at| taken_at.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default();
        let arrow = row.trend.map(|trend| trend.arrow()).unwrap_or(" ");
        println!(
            "  {when:<16} {:>12} {arrow} {}",
            format_glucose(row.reading.value),
            row.reading.kind.label()
        );
    }
    if let Some(chart) = &panel.chart {
        println!("Chart: {}", chart.svg_path());
    }
    if let Some(message) = &panel.message {
        println!("{message}");
    }
}

fn print_consultation(consultation: &Consultation) {
    let date = consultation
        .created_at
        .map(|created_at| format_date(created_at.date_naive()))
        .unwrap_or_default();
    println!("Current treatment ({date})");
    if let Some(diagnosis) = &consultation.diagnosis {
        println!("Diagnosis: {diagnosis}");
    }
    for medication in &consultation.medications {
        let duration = medication_duration(medication)
            .map(|duration| format!(", {duration}"))
            .unwrap_or_default();
        println!(
            "  - {}: {}{duration}",
            medication.drug_name,
            medication_dose(medication)
        );
    }
    if let Some(indications) = &consultation.indications {
        println!("Indications: {indications}");
    }
}

fn print_treatment(current: &Option<Consultation>) {
    match current {
        Some(consultation) => print_consultation(consultation),
        None => println!("{NO_CONSULTATIONS}"),
    }
}

fn print_summary(panel: &SummaryPanel) {
    match &panel.current_treatment {
        Some(consultation) => print_consultation(consultation),
        None => {
            if let Some(message) = &panel.message {
                println!("{message}");
            }
        }
    }

    println!("{}", panel.visit.message);

    if let Some(message) = &panel.labs_message {
        println!("{message}");
    }
    for lab in &panel.latest_labs {
        let value = lab.result.display_value().unwrap_or_else(|| "-".to_string());
        let unit = lab.result.unit.as_deref().unwrap_or("");
        let date = lab
            .effective_date()
            .map(|date| format_date(date.date_naive()))
            .unwrap_or_default();
        println!("  {}: {value} {unit} {date}", lab.result.test_name);
    }
}

fn print_hba1c(history: &Hba1cHistory, offset: FixedOffset) {
    if let Some(latest) = &history.latest {
        println!("Latest HbA1c: {}", format_hba1c(latest.value));
    }
    for point in &history.series {
        let date = point.recorded_at.map(|at| format_short_date(at, offset))
            .unwrap_or_default();
        println!("  {date:<6} {}", format_hba1c(point.value));
    }
    if let Some(chart) = &history.chart {
        println!("Chart: {}", chart.svg_path());
    }
    if let Some(message) = &history.message {
        println!("{message}");
    }
}
