//! birdcal - acoustic/visual density calibration
//!
//! The main entry point for the `birdcal` binary, handling:
//! - Window rebuilds from a survey inventory
//! - Window listing and the median-ratio summary
//! - Grouped leave-one-survey-out backtests
//! - Model training, density prediction, and curve sampling

use birdcal_common::{AruId, Error, OutputFormat, StructuredError, SurveyId};
use birdcal_config::{load_policy, CalibrationPolicy, LoadedPolicy, ValidationError};
use birdcal_core::calibrate::{
    backtest, curve_summary, fitted_curve, list_windows, predict_density, train_summary,
    BacktestOptions, ModelChoice, Observation,
};
use birdcal_core::exit_codes::ExitCode;
use birdcal_core::io::{load_inventory, load_windows};
use birdcal_core::logging::{generate_run_id, init_logging, LogConfig, LogLevel};
use birdcal_core::pairing::{rebuild_windows, RebuildOptions};
use birdcal_core::report::{PolicyReport, Report};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span};

/// birdcal - Calibrate acoustic call rates against drone bird densities
#[derive(Parser)]
#[command(name = "birdcal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Calibration policy file (overrides BIRDCAL_POLICY and config dirs)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List or rebuild calibration windows
    Windows(WindowsArgs),

    /// Median-ratio calibration factor
    Summary(SummaryArgs),

    /// Leave-one-drone-survey-out backtest of linear vs quadratic curves
    Backtest(ModelArgs),

    /// Fit curves and the multi-feature model on every window
    Train(ModelArgs),

    /// Predict bird density for an acoustic observation
    Predict(PredictArgs),

    /// Sample the fitted curves for plotting
    Curve(CurveArgs),

    /// Inspect or validate the calibration policy
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct WindowsArgs {
    #[command(subcommand)]
    command: WindowsCommands,
}

#[derive(Subcommand, Debug)]
enum WindowsCommands {
    /// List windows ordered by days apart, newest id first
    List {
        /// Calibration windows JSON ("-" for stdin)
        #[arg(long, short = 'w')]
        windows: PathBuf,

        /// Minimum acoustic call count
        #[arg(long)]
        min_calls: Option<u64>,

        /// Maximum windows to return
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rebuild the full window set from a survey inventory
    Rebuild {
        /// Survey inventory JSON ("-" for stdin)
        #[arg(long, short = 'i')]
        inventory: PathBuf,

        /// Maximum days between acoustic and drone survey dates
        #[arg(long)]
        max_days_apart: Option<u32>,

        /// Buffer around the drone footprint, in meters
        #[arg(long)]
        buffer_meters: Option<f64>,

        /// Minimum acoustic calls for a candidate window
        #[arg(long)]
        min_acoustic_calls: Option<u64>,

        /// Write the full outcome here and print only the report
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// Calibration windows JSON ("-" for stdin)
    #[arg(long, short = 'w')]
    windows: PathBuf,

    /// Minimum acoustic call count
    #[arg(long)]
    min_calls: Option<u64>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Calibration windows JSON ("-" for stdin)
    #[arg(long, short = 'w')]
    windows: PathBuf,

    /// Minimum acoustic call count
    #[arg(long)]
    min_calls: Option<u64>,

    /// Number of species features
    #[arg(long)]
    top_species: Option<usize>,

    /// Relative RMSE margin quadratic must win by
    #[arg(long)]
    quadratic_min_improvement: Option<f64>,
}

impl ModelArgs {
    fn options(&self, policy: &CalibrationPolicy) -> BacktestOptions {
        let mut options = BacktestOptions::from(&policy.backtest);
        if let Some(v) = self.min_calls {
            options.min_calls = v;
        }
        if let Some(v) = self.top_species {
            options.top_species_features = v;
        }
        if let Some(v) = self.quadratic_min_improvement {
            options.quadratic_min_improvement = v;
        }
        options
    }
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[command(flatten)]
    model_args: ModelArgs,

    /// Model to predict with (best, linear, quadratic)
    #[arg(long, default_value = "best")]
    model: String,

    /// Acoustic call count of the observation
    #[arg(long, required_unless_present = "inventory", conflicts_with = "inventory")]
    calls: Option<u64>,

    /// Media asset count of the observation
    #[arg(long, required_unless_present = "inventory", conflicts_with = "inventory")]
    assets: Option<u64>,

    /// Recording effort in hours
    #[arg(long, conflicts_with = "inventory")]
    effort_hours: Option<f64>,

    /// Per-species calls as NAME=COUNT (repeatable)
    #[arg(long = "species", value_parser = parse_species, conflicts_with = "inventory")]
    species: Vec<(String, u64)>,

    /// Read the observation from a survey inventory instead
    #[arg(long, requires_all = ["survey", "aru"])]
    inventory: Option<PathBuf>,

    /// Acoustic survey id within --inventory
    #[arg(long)]
    survey: Option<u64>,

    /// ARU id within --inventory
    #[arg(long)]
    aru: Option<u64>,

    /// Interval half-width in residual standard deviations
    #[arg(long)]
    interval_z: Option<f64>,
}

#[derive(Args, Debug)]
struct CurveArgs {
    /// Calibration windows JSON ("-" for stdin)
    #[arg(long, short = 'w')]
    windows: PathBuf,

    /// Minimum acoustic call count
    #[arg(long)]
    min_calls: Option<u64>,

    /// Number of sample points
    #[arg(long)]
    sample_count: Option<usize>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective policy and where it came from
    Show,

    /// Validate a policy file
    Validate {
        /// Policy file (defaults to the resolved policy)
        path: Option<PathBuf>,
    },
}

fn parse_species(raw: &str) -> Result<(String, u64), String> {
    let (name, count) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=COUNT, got '{}'", raw))?;
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid count in '{}': {}", raw, e))?;
    Ok((name.trim().to_string(), count))
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, None));

    let run_id = generate_run_id();
    let span = info_span!("run", run_id = %run_id);
    let _guard = span.enter();

    let exit_code = match &cli.command {
        Commands::Windows(args) => match &args.command {
            WindowsCommands::List {
                windows,
                min_calls,
                limit,
            } => run_windows_list(&cli.global, windows, *min_calls, *limit),
            WindowsCommands::Rebuild {
                inventory,
                max_days_apart,
                buffer_meters,
                min_acoustic_calls,
                output,
            } => run_windows_rebuild(
                &cli.global,
                inventory,
                *max_days_apart,
                *buffer_meters,
                *min_acoustic_calls,
                output.as_deref(),
            ),
        },
        Commands::Summary(args) => run_summary(&cli.global, args),
        Commands::Backtest(args) => run_backtest(&cli.global, args),
        Commands::Train(args) => run_train(&cli.global, args),
        Commands::Predict(args) => run_predict(&cli.global, args),
        Commands::Curve(args) => run_curve(&cli.global, args),
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => run_config_show(&cli.global),
            ConfigCommands::Validate { path } => run_config_validate(&cli.global, path.as_deref()),
        },
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    debug!(exit_code = %exit_code, "command finished");
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Output helpers
// ============================================================================

fn emit<R: Report>(global: &GlobalOpts, report: &R) -> ExitCode {
    match report.render(global.format) {
        Ok(text) => {
            println!("{}", text);
            report.exit_code()
        }
        Err(e) => output_error(global, &Error::Json(e)),
    }
}

fn finish<R: Report>(global: &GlobalOpts, result: birdcal_common::Result<R>) -> ExitCode {
    match result {
        Ok(report) => emit(global, &report),
        Err(e) => output_error(global, &e),
    }
}

fn output_error(global: &GlobalOpts, error: &Error) -> ExitCode {
    if global.format.is_machine() {
        eprintln!("{}", StructuredError::from(error).to_json());
    } else {
        eprintln!("{}", error.to_human());
    }
    ExitCode::from(error)
}

fn output_config_error(global: &GlobalOpts, error: &ValidationError) -> ExitCode {
    if global.format.is_machine() {
        let response = serde_json::json!({
            "code": error.code(),
            "category": "config",
            "message": error.to_string(),
        });
        eprintln!("{}", response);
    } else {
        eprintln!("✗ Configuration Error\n  Reason: {}", error);
    }
    match error {
        ValidationError::IoError(_) => ExitCode::IoError,
        _ => ExitCode::ConfigError,
    }
}

fn policy(global: &GlobalOpts) -> Result<LoadedPolicy, ExitCode> {
    load_policy(global.policy.as_deref()).map_err(|e| output_config_error(global, &e))
}

macro_rules! try_exit {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(code) => return code,
        }
    };
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_windows_list(global: &GlobalOpts, path: &Path, min_calls: Option<u64>, limit: Option<usize>) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let min_calls = min_calls.unwrap_or(loaded.policy.listing.min_calls);
    let limit = limit.unwrap_or(loaded.policy.listing.limit);
    finish(
        global,
        load_windows(path).map(|windows| list_windows(&windows, min_calls, limit)),
    )
}

fn run_windows_rebuild(
    global: &GlobalOpts,
    inventory: &Path,
    max_days_apart: Option<u32>,
    buffer_meters: Option<f64>,
    min_acoustic_calls: Option<u64>,
    output: Option<&Path>,
) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let mut options = RebuildOptions::from(&loaded.policy.rebuild);
    if let Some(v) = max_days_apart {
        options.max_days_apart = v;
    }
    if let Some(v) = buffer_meters {
        options.buffer_meters = v;
    }
    if let Some(v) = min_acoustic_calls {
        options.min_acoustic_calls = v;
    }

    let outcome = load_inventory(inventory)
        .and_then(|inv| rebuild_windows(&inv, &options, chrono::Utc::now()));
    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => return output_error(global, &e),
    };

    let Some(out_path) = output else {
        return emit(global, &outcome);
    };
    let written = serde_json::to_string_pretty(&outcome)
        .map_err(Error::from)
        .and_then(|json| std::fs::write(out_path, json).map_err(Error::from));
    if let Err(e) = written {
        return output_error(global, &e);
    }
    match global.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&outcome.report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::Clean
            }
            Err(e) => output_error(global, &Error::Json(e)),
        },
        _ => emit(global, &outcome),
    }
}

fn run_summary(global: &GlobalOpts, args: &SummaryArgs) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let min_calls = args.min_calls.unwrap_or(loaded.policy.backtest.min_calls);
    finish(
        global,
        load_windows(&args.windows).and_then(|windows| curve_summary(&windows, min_calls)),
    )
}

fn run_backtest(global: &GlobalOpts, args: &ModelArgs) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let options = args.options(&loaded.policy);
    finish(
        global,
        load_windows(&args.windows).and_then(|windows| backtest(&windows, &options)),
    )
}

fn run_train(global: &GlobalOpts, args: &ModelArgs) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let options = args.options(&loaded.policy);
    finish(
        global,
        load_windows(&args.windows).and_then(|windows| train_summary(&windows, &options)),
    )
}

fn observation(args: &PredictArgs) -> birdcal_common::Result<Observation> {
    if let (Some(path), Some(survey), Some(aru)) = (&args.inventory, args.survey, args.aru) {
        let inventory = load_inventory(path)?;
        let (survey, aru) = (SurveyId(survey), AruId(aru));
        let metrics = inventory.index().acoustic_metrics(survey, aru);
        return Ok(Observation {
            acoustic_survey_id: Some(survey),
            aru_id: Some(aru),
            call_count: metrics.acoustic_call_count,
            asset_count: metrics.acoustic_asset_count,
            effort_hours: metrics.effort_hours,
            species_call_counts: metrics.species_call_counts,
        });
    }

    let mut species_call_counts = BTreeMap::new();
    for (name, count) in &args.species {
        let total: &mut u64 = species_call_counts.entry(name.clone()).or_insert(0);
        *total = total.saturating_add(*count);
    }
    Ok(Observation {
        acoustic_survey_id: None,
        aru_id: None,
        call_count: args.calls.unwrap_or(0),
        asset_count: args.assets.unwrap_or(0),
        effort_hours: args.effort_hours,
        species_call_counts,
    })
}

fn run_predict(global: &GlobalOpts, args: &PredictArgs) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let options = args.model_args.options(&loaded.policy);
    let interval_z = args.interval_z.unwrap_or(loaded.policy.prediction.interval_z);

    let result = args.model.parse::<ModelChoice>().and_then(|model| {
        let windows = load_windows(&args.model_args.windows)?;
        let train = train_summary(&windows, &options)?;
        let obs = observation(args)?;
        predict_density(&train, &obs, model, interval_z)
    });
    finish(global, result)
}

fn run_curve(global: &GlobalOpts, args: &CurveArgs) -> ExitCode {
    let loaded = try_exit!(policy(global));
    let min_calls = args.min_calls.unwrap_or(loaded.policy.backtest.min_calls);
    let sample_count = args.sample_count.unwrap_or(loaded.policy.curve.sample_count);
    finish(
        global,
        load_windows(&args.windows).and_then(|windows| fitted_curve(&windows, min_calls, sample_count)),
    )
}

fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let loaded = try_exit!(policy(global));
    emit(global, &PolicyReport::from(&loaded))
}

fn run_config_validate(global: &GlobalOpts, path: Option<&Path>) -> ExitCode {
    let target = path.or(global.policy.as_deref());
    if let Some(p) = target {
        if !p.exists() {
            let missing = ValidationError::IoError(format!("policy file not found: {}", p.display()));
            return output_config_error(global, &missing);
        }
    }
    let loaded = try_exit!(load_policy(target).map_err(|e| output_config_error(global, &e)));

    let response = serde_json::json!({
        "schema_version": birdcal_common::SCHEMA_VERSION,
        "valid": true,
        "policy_path": loaded.snapshot.policy_path,
        "policy_source": loaded.snapshot.policy_source,
        "policy_hash": loaded.snapshot.policy_hash,
    });
    match global.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{}", json),
            Err(e) => return output_error(global, &Error::Json(e)),
        },
        OutputFormat::Md | OutputFormat::Summary => {
            println!(
                "✓ policy valid ({}, {})",
                loaded.snapshot.policy_path.as_deref().unwrap_or("built-in defaults"),
                loaded.snapshot.short_id()
            );
        }
    }
    ExitCode::Clean
}

fn print_version(global: &GlobalOpts) {
    let version = env!("CARGO_PKG_VERSION");
    match global.format {
        OutputFormat::Json => {
            let info = serde_json::json!({
                "name": "birdcal",
                "version": version,
                "schema_version": birdcal_common::SCHEMA_VERSION,
                "config_schema_version": birdcal_config::CONFIG_SCHEMA_VERSION,
            });
            println!("{}", info);
        }
        OutputFormat::Md | OutputFormat::Summary => {
            println!("birdcal {}", version);
        }
    }
}
