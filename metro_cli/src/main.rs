//! # Metrology CLI
//!
//! Command-line front end for `metro_core`. Every command prints its result as
//! pretty JSON on stdout; logs and errors go to stderr.
//!
//! ```text
//! metro ema --class III -e 0.01 --load 5
//! metro plan --class II -e 0.001 --capacity 30 --verification-type in_use
//! metro repeatability 15.001 15.000 "" 15.002
//! metro uncertainty --type-a 0.01 --resolution 0.02
//! metro wear --nominal 1000 --observation 2023-01-10=999.998 --observation 2024-01-10=999.995
//! metro compliance --record record.json
//! metro prefill --history history.json --equipment 42
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use metro_core::calculations::tolerance::{self, AccuracyClass, VerificationType};
use metro_core::calculations::{uncertainty, verification, wear};
use metro_core::calculations::wear::{WearInput, WearObservation};
use metro_core::errors::CalcError;
use metro_core::{compliance, file_io, prefill, CalibrationRecord};

#[derive(Debug, Parser)]
#[command(name = "metro", version, about = "Metrology calibration calculations")]
struct Cli {
    /// Engine settings JSON file
    #[arg(long, global = true, env = "METRO_SETTINGS")]
    settings: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ToleranceArgs {
    /// Accuracy class: I, II, III or IIII
    #[arg(long)]
    class: String,

    /// Verification division e
    #[arg(short = 'e', long = "division", allow_negative_numbers = true)]
    e: f64,

    /// initial, subsequent or in_use
    #[arg(long, default_value = "initial")]
    verification_type: String,
}

impl ToleranceArgs {
    fn class(&self) -> Result<AccuracyClass, CalcError> {
        self.class.parse()
    }

    fn verification_type(&self) -> VerificationType {
        VerificationType::from_label(&self.verification_type)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// EMA for a single load
    Ema {
        #[command(flatten)]
        tolerance: ToleranceArgs,
        #[arg(long, allow_negative_numbers = true)]
        load: f64,
    },
    /// EMA for several loads
    Points {
        #[command(flatten)]
        tolerance: ToleranceArgs,
        /// Comma-separated loads
        #[arg(
            long,
            value_delimiter = ',',
            required = true,
            allow_negative_numbers = true
        )]
        loads: Vec<f64>,
    },
    /// Suggested points, eccentricity and repeatability setup
    Plan {
        #[command(flatten)]
        tolerance: ToleranceArgs,
        #[arg(long)]
        capacity: f64,
    },
    /// Evaluate recorded points and eccentricity of a record file
    Evaluate {
        #[command(flatten)]
        tolerance: ToleranceArgs,
        #[arg(long)]
        record: PathBuf,
    },
    /// Repeatability statistics; blank values are skipped
    Repeatability {
        /// Readings; near zero load they may be negative
        #[arg(allow_negative_numbers = true)]
        values: Vec<String>,
    },
    /// Combined and expanded uncertainty
    Uncertainty {
        #[arg(long)]
        type_a: f64,
        #[arg(long)]
        resolution: f64,
        #[arg(long, default_value_t = 0.0)]
        weight: f64,
        /// Coverage factor (defaults to settings)
        #[arg(short, long)]
        k: Option<f64>,
        /// Mean value, to print a result statement
        #[arg(long, requires = "unit", allow_negative_numbers = true)]
        mean: Option<f64>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Reference-weight wear extrapolation
    Wear {
        #[arg(long)]
        nominal: f64,
        /// MPE of the weight (defaults to settings fraction of nominal)
        #[arg(long)]
        mpe: Option<f64>,
        /// DATE=MASS, repeatable
        #[arg(long = "observation", value_parser = parse_observation, required = true)]
        observations: Vec<WearObservation>,
        /// Reference date for the failure estimate (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Certificate completeness checklist for a record file
    Compliance {
        #[arg(long)]
        record: PathBuf,
    },
    /// Carry-forward template from a history file
    Prefill {
        #[arg(long)]
        history: PathBuf,
        #[arg(long)]
        equipment: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.quiet, cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(calc_error) = e.downcast_ref::<CalcError>() {
                if let Ok(json) = serde_json::to_string_pretty(calc_error) {
                    eprintln!();
                    eprintln!("Error JSON:");
                    eprintln!("{json}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("METRO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = file_io::load_settings_or_default(cli.settings.as_deref())
        .context("failed to load engine settings")?;

    match cli.command {
        Command::Ema { tolerance: args, load } => {
            let class = args.class()?;
            let ema = tolerance::calculate(class, args.e, load, args.verification_type())?;
            print_json(&json!({
                "class": class,
                "e": args.e,
                "verification_type": args.verification_type(),
                "load": load,
                "ema": ema,
            }))
        }
        Command::Points { tolerance: args, loads } => {
            let points = tolerance::calculate_for_points(
                args.class()?,
                args.e,
                &loads,
                args.verification_type(),
            )?;
            print_json(&points)
        }
        Command::Plan { tolerance: args, capacity } => {
            let plan = verification::suggest_session_plan(
                args.class()?,
                args.e,
                capacity,
                args.verification_type(),
                &settings,
            )?;
            print_json(&plan)
        }
        Command::Evaluate { tolerance: args, record } => {
            let record = load_record(&record)?;
            print_json(&evaluate_record(&args, &record)?)
        }
        Command::Repeatability { values } => {
            let measurements = uncertainty::parse_measurements(&values);
            let stats = uncertainty::calculate_repeatability(&measurements);
            if stats.n < settings.minimum_repeatability_samples {
                tracing::warn!(
                    n = stats.n,
                    minimum = settings.minimum_repeatability_samples,
                    "fewer repeatability readings than recommended"
                );
            }
            print_json(&stats)
        }
        Command::Uncertainty {
            type_a,
            resolution,
            weight,
            k,
            mean,
            unit,
        } => {
            let k = k.unwrap_or(settings.default_coverage_factor);
            let budget = uncertainty::calculate_expanded_uncertainty(type_a, resolution, weight, k);
            match (mean, unit) {
                (Some(mean), Some(unit)) => print_json(&json!({
                    "budget": budget,
                    "statement": budget.statement(mean, &unit),
                })),
                _ => print_json(&budget),
            }
        }
        Command::Wear {
            nominal,
            mpe,
            observations,
            today,
        } => {
            let input = WearInput {
                nominal_mass: nominal,
                mpe: mpe.unwrap_or_else(|| {
                    wear::mpe_from_fraction(nominal, settings.wear_mpe_fraction)
                }),
                observations,
            };
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let prediction = wear::predict(&input, today);
            print_json(&json!({
                "nominal_mass": input.nominal_mass,
                "mpe": input.mpe,
                "prediction": prediction,
            }))
        }
        Command::Compliance { record } => {
            let record = load_record(&record)?;
            let report = compliance::validate(&record);
            print_json(&json!({
                "report": report,
                "completion_percentage": report.completion_percentage(),
            }))
        }
        Command::Prefill { history, equipment } => {
            let store = file_io::load_history(&history)
                .with_context(|| format!("failed to load history from {}", history.display()))?;
            let template = match prefill::build_prefill(&store, equipment) {
                Ok(template) => template,
                Err(never) => match never {},
            };
            print_json(&json!({
                "prefilled": template.is_some(),
                "data": template,
            }))
        }
    }
}

fn evaluate_record(
    args: &ToleranceArgs,
    record: &CalibrationRecord,
) -> anyhow::Result<serde_json::Value> {
    let class = args.class()?;
    let verification_type = args.verification_type();
    let points =
        verification::evaluate_points(class, args.e, verification_type, &record.readings)?;

    let eccentricity = match record.eccentricity_tests.first() {
        Some(first) => {
            let ema = tolerance::calculate(class, args.e, first.load_applied, verification_type)?;
            Some(verification::evaluate_eccentricity(&record.eccentricity_tests, ema))
        }
        None => None,
    };

    let repeatability: Vec<_> = record
        .repeatability_tests
        .iter()
        .map(|t| {
            json!({
                "load": t.load,
                "stats": uncertainty::calculate_repeatability(&t.measurements),
            })
        })
        .collect();

    Ok(json!({
        "points": points,
        "eccentricity": eccentricity,
        "repeatability": repeatability,
    }))
}

fn load_record(path: &Path) -> anyhow::Result<CalibrationRecord> {
    file_io::load_json(path)
        .with_context(|| format!("failed to load record from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{json}");
    Ok(())
}

/// Parse `DATE=MASS`, e.g. `2024-01-10=999.995`.
fn parse_observation(s: &str) -> Result<WearObservation, String> {
    let (date, mass) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DATE=MASS, got '{s}'"))?;
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {e}", date.trim()))?;
    let measured_mass = mass
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid mass '{}': {e}", mass.trim()))?;
    Ok(WearObservation { date, measured_mass })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_observation() {
        let obs = parse_observation("2024-01-10=999.995").unwrap();
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(obs.measured_mass, 999.995);

        let obs = parse_observation(" 2023-12-31 = 5 ").unwrap();
        assert_eq!(obs.measured_mass, 5.0);
    }

    #[test]
    fn test_parse_observation_errors() {
        assert!(parse_observation("2024-01-10").unwrap_err().contains("DATE=MASS"));
        assert!(parse_observation("10/01/2024=5").unwrap_err().contains("invalid date"));
        assert!(parse_observation("2024-01-10=heavy").unwrap_err().contains("invalid mass"));
    }

    #[test]
    fn test_parse_subcommands() {
        let cli =
            Cli::try_parse_from(["metro", "ema", "--class", "iii", "-e", "0.01", "--load", "5"])
                .unwrap();
        match cli.command {
            Command::Ema { tolerance, load } => {
                assert_eq!(tolerance.class().unwrap(), AccuracyClass::III);
                assert_eq!(tolerance.verification_type(), VerificationType::Initial);
                assert_eq!(load, 5.0);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "metro",
            "points",
            "--class",
            "II",
            "-e",
            "0.1",
            "--loads",
            "1,2.5,10",
            "--verification-type",
            "in_use",
        ])
        .unwrap();
        match cli.command {
            Command::Points { tolerance, loads } => {
                assert_eq!(loads, vec![1.0, 2.5, 10.0]);
                assert_eq!(tolerance.verification_type(), VerificationType::InUse);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_negative_values_are_not_flags() {
        let cli = Cli::try_parse_from(["metro", "repeatability", "0.002", "-0.001", ""]).unwrap();
        match cli.command {
            Command::Repeatability { values } => {
                assert_eq!(values, vec!["0.002", "-0.001", ""]);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "metro", "ema", "--class", "III", "-e", "0.01", "--load", "-5",
        ])
        .unwrap();
        let Command::Ema { load, .. } = cli.command else {
            panic!("expected ema");
        };
        assert_eq!(load, -5.0);

        let cli = Cli::try_parse_from([
            "metro", "points", "--class", "III", "-e", "0.01", "--loads", "-1,2",
        ])
        .unwrap();
        let Command::Points { loads, .. } = cli.command else {
            panic!("expected points");
        };
        assert_eq!(loads, vec![-1.0, 2.0]);

        let cli = Cli::try_parse_from([
            "metro",
            "uncertainty",
            "--type-a",
            "0.01",
            "--resolution",
            "0.02",
            "--mean",
            "-0.5",
            "--unit",
            "kg",
        ])
        .unwrap();
        let Command::Uncertainty { mean, .. } = cli.command else {
            panic!("expected uncertainty");
        };
        assert_eq!(mean, Some(-0.5));
    }

    #[test]
    fn test_flags_still_parse_next_to_readings() {
        let cli = Cli::try_parse_from(["metro", "-q", "repeatability", "1.0", "-0.5"]).unwrap();
        assert!(cli.quiet);
        let Command::Repeatability { values } = cli.command else {
            panic!("expected repeatability");
        };
        assert_eq!(values, vec!["1.0", "-0.5"]);
    }

    #[test]
    fn test_bad_class_is_engine_error() {
        let cli =
            Cli::try_parse_from(["metro", "ema", "--class", "V", "-e", "0.01", "--load", "5"])
                .unwrap();
        let Command::Ema { tolerance, .. } = cli.command else {
            panic!("expected ema");
        };
        assert_eq!(tolerance.class().unwrap_err(), CalcError::invalid_class("V"));
    }

    #[test]
    fn test_evaluate_record() {
        let args = ToleranceArgs {
            class: "III".to_string(),
            e: 0.01,
            verification_type: "initial".to_string(),
        };
        let mut record = CalibrationRecord::new(1, 1);
        record
            .readings
            .push(metro_core::MeasurementPoint::new(5.0, "kg").with_indication(5.0));
        let value = evaluate_record(&args, &record).unwrap();
        assert_eq!(value["points"][0]["conforming"], json!(true));
        assert!(value["eccentricity"].is_null());
    }
}
