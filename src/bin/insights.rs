//! Insights CLI - Command-line interface for Gaze Insights
//!
//! Commands:
//! - ingest: Apply a batch of tracking events to the stored aggregate
//! - run: Apply events streamed on stdin, one JSON object per line
//! - replay: Apply the event batch waiting in the store
//! - summary: Print the dashboard view
//! - export: Write the analytics export report
//! - heatmap: Render gaze points from an event file to PNG
//! - validate: Validate tracking events without applying them
//! - reset: Discard all collected analytics
//! - demo: Load the demonstration dataset
//! - doctor: Diagnose store and configuration health

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gaze_insights::dashboard::DashboardView;
use gaze_insights::sample;
use gaze_insights::schema::{DecodedRecord, EventBatchAdapter};
use gaze_insights::{
    AnalyticsConfig, AnalyticsError, Applied, FileStore, MemoryStore, MetricsAggregator,
    RgbaBuffer, SnapshotCodec, SnapshotStore, PRODUCER_NAME, SNAPSHOT_VERSION, VERSION,
};

/// Gaze Insights - Checkout analytics from gaze-tracking events
#[derive(Parser)]
#[command(name = "insights")]
#[command(author = "Gaze Insights Contributors")]
#[command(version = VERSION)]
#[command(about = "Aggregate gaze-tracking events into checkout analytics", long_about = None)]
struct Cli {
    /// Directory holding the snapshot and pending event batches
    #[arg(long, global = true, default_value = ".gaze-insights")]
    store: PathBuf,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a batch of tracking events to the stored aggregate
    Ingest {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,
    },

    /// Apply events streamed on stdin, one JSON object per line
    Run {
        /// Flush output after each record
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        flush: bool,
    },

    /// Apply the event batch waiting in the store, then remove it
    Replay,

    /// Print the dashboard view
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the analytics export report
    Export {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Render gaze points from an event file to PNG
    Heatmap {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Canvas width in pixels
        #[arg(long)]
        width: Option<usize>,

        /// Canvas height in pixels
        #[arg(long)]
        height: Option<usize>,

        /// Splat radius in pixels
        #[arg(long)]
        radius: Option<u32>,
    },

    /// Validate tracking events without applying them
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Discard all collected analytics
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Load the demonstration dataset
    Demo {
        /// Seed for the random gaze points
        #[arg(long)]
        seed: Option<u64>,

        /// Also render the sample gaze points to this PNG
        #[arg(long)]
        heatmap: Option<PathBuf>,
    },

    /// Diagnose store and configuration health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), InsightsCliError> {
    let config = load_config(cli.config.as_deref())?;
    let store = FileStore::new(&cli.store);

    match cli.command {
        Commands::Ingest {
            input,
            input_format,
        } => cmd_ingest(store, config, &input, input_format),
        Commands::Run { flush } => cmd_run(store, config, flush),
        Commands::Replay => cmd_replay(store, config),
        Commands::Summary { json } => cmd_summary(store, config, json),
        Commands::Export { output } => cmd_export(store, config, &output),
        Commands::Heatmap {
            input,
            output,
            input_format,
            width,
            height,
            radius,
        } => {
            let mut config = config;
            if let Some(width) = width {
                config.heatmap.width = width;
            }
            if let Some(height) = height {
                config.heatmap.height = height;
            }
            if let Some(radius) = radius {
                config.heatmap.radius = radius;
            }
            cmd_heatmap(config, &input, &output, input_format)
        }
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),
        Commands::Reset { yes } => cmd_reset(store, config, yes),
        Commands::Demo { seed, heatmap } => cmd_demo(store, config, seed, heatmap.as_deref()),
        Commands::Doctor { json } => cmd_doctor(&store, &config, cli.config.as_deref(), json),
    }
}

fn cmd_ingest(
    store: FileStore,
    config: AnalyticsConfig,
    input: &Path,
    input_format: InputFormat,
) -> Result<(), InsightsCliError> {
    let records = read_records(input, input_format)?;
    if records.is_empty() {
        return Err(InsightsCliError::NoEvents);
    }

    let mut aggregator = MetricsAggregator::with_config(store, config);
    let summary = aggregator.replay(records);

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_run(store: FileStore, config: AnalyticsConfig, flush: bool) -> Result<(), InsightsCliError> {
    let mut aggregator = MetricsAggregator::with_config(store, config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (index, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let applied = match EventBatchAdapter::decode_line(index + 1, trimmed) {
            Ok(event) => aggregator.apply(event),
            Err(e) => Applied::Skipped(e),
        };

        let ack = match applied {
            Applied::Recorded => EventAck {
                line: index + 1,
                status: "recorded",
                error: None,
            },
            Applied::Buffered => EventAck {
                line: index + 1,
                status: "buffered",
                error: None,
            },
            Applied::Skipped(e) => EventAck {
                line: index + 1,
                status: "skipped",
                error: Some(e.to_string()),
            },
        };

        writeln!(stdout, "{}", serde_json::to_string(&ack)?)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    Ok(())
}

fn cmd_replay(store: FileStore, config: AnalyticsConfig) -> Result<(), InsightsCliError> {
    let mut aggregator = MetricsAggregator::with_config(store, config);

    match aggregator.replay_stored_events() {
        Some(summary) => {
            println!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
        None => Err(InsightsCliError::NoEvents),
    }
}

fn cmd_summary(store: FileStore, config: AnalyticsConfig, json: bool) -> Result<(), InsightsCliError> {
    let aggregator = MetricsAggregator::with_config(store, config);
    let view = aggregator.dashboard();

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_dashboard(&view);
    }
    Ok(())
}

fn cmd_export(store: FileStore, config: AnalyticsConfig, output: &Path) -> Result<(), InsightsCliError> {
    let mut aggregator = MetricsAggregator::with_config(store, config);
    let report = aggregator.export();
    let json = report.to_json_pretty()?;

    if output.to_string_lossy() == "-" {
        println!("{}", json);
    } else {
        fs::write(output, json)?;
    }
    Ok(())
}

fn cmd_heatmap(
    config: AnalyticsConfig,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
) -> Result<(), InsightsCliError> {
    let records = read_records(input, input_format)?;

    // Gaze points are never persisted, so render from a throwaway aggregator
    let mut aggregator = MetricsAggregator::with_config(MemoryStore::new(), config);
    aggregator.replay(records);
    if aggregator.gaze_points().is_empty() {
        log::warn!("no gaze points in input, heatmap will be transparent");
    }

    write_png(aggregator.render_heatmap(), output)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), InsightsCliError> {
    let records = read_records(input, input_format)?;
    let results = EventBatchAdapter::validate_records(&records);

    let report = ValidationReport {
        total_events: records.len(),
        valid_events: records.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Event at index {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(InsightsCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_reset(store: FileStore, config: AnalyticsConfig, yes: bool) -> Result<(), InsightsCliError> {
    if !yes {
        return Err(InsightsCliError::ConfirmationRequired);
    }

    let mut aggregator = MetricsAggregator::with_config(store, config);
    aggregator.reset();
    println!("All analytics data has been reset");
    Ok(())
}

fn cmd_demo(
    store: FileStore,
    config: AnalyticsConfig,
    seed: Option<u64>,
    heatmap: Option<&Path>,
) -> Result<(), InsightsCliError> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut aggregator = MetricsAggregator::with_config(store, config);
    sample::seed(&mut aggregator, &mut rng)?;

    if let Some(path) = heatmap {
        write_png(aggregator.render_heatmap(), path)?;
    }

    print_dashboard(&aggregator.dashboard());
    Ok(())
}

fn cmd_doctor(
    store: &FileStore,
    config: &AnalyticsConfig,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), InsightsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Gaze Insights version {}", VERSION),
    });

    checks.push(DoctorCheck {
        name: "snapshot_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Snapshot format v{}", SNAPSHOT_VERSION),
    });

    if let Some(path) = config_path {
        checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "Loaded {} (state key '{}', canvas {}x{})",
                path.display(),
                config.state_key,
                config.heatmap.width,
                config.heatmap.height
            ),
        });
    }

    let root = store.root();
    checks.push(if root.is_dir() {
        DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Ok,
            message: format!("Store directory {}", root.display()),
        }
    } else if root.exists() {
        DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Error,
            message: format!("{} exists but is not a directory", root.display()),
        }
    } else {
        DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Warning,
            message: format!("Store directory {} will be created on first write", root.display()),
        }
    });

    checks.push(match store.get(&config.state_key) {
        Ok(Some(bytes)) => match SnapshotCodec::try_decode(&bytes) {
            Ok(state) => DoctorCheck {
                name: "snapshot".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Snapshot valid ({} sessions, {} confusion events)",
                    state.sessions.len(),
                    state.total_confusion_events
                ),
            },
            Err(e) => DoctorCheck {
                name: "snapshot".to_string(),
                status: CheckStatus::Error,
                message: format!("Snapshot unusable and will be discarded: {}", e),
            },
        },
        Ok(None) => DoctorCheck {
            name: "snapshot".to_string(),
            status: CheckStatus::Warning,
            message: "No snapshot stored yet".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "snapshot".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read snapshot: {}", e),
        },
    });

    checks.push(match store.get(&config.events_key) {
        Ok(Some(bytes)) => match EventBatchAdapter::decode_array(&String::from_utf8_lossy(&bytes)) {
            Ok(records) => DoctorCheck {
                name: "pending_events".to_string(),
                status: CheckStatus::Warning,
                message: format!("{} stored events waiting, run 'insights replay'", records.len()),
            },
            Err(e) => DoctorCheck {
                name: "pending_events".to_string(),
                status: CheckStatus::Error,
                message: format!("Stored events unreadable: {}", e),
            },
        },
        Ok(None) => DoctorCheck {
            name: "pending_events".to_string(),
            status: CheckStatus::Ok,
            message: "No stored events waiting".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "pending_events".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read stored events: {}", e),
        },
    });

    // Check stdin is available (for streaming mode)
    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Insights Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(InsightsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, InsightsCliError> {
    match path {
        Some(path) => Ok(AnalyticsConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalyticsConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, InsightsCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, input_format: InputFormat) -> Result<Vec<DecodedRecord>, InsightsCliError> {
    let input_data = read_input(input)?;
    match input_format {
        InputFormat::Ndjson => Ok(EventBatchAdapter::decode_ndjson(&input_data)),
        InputFormat::Json => Ok(EventBatchAdapter::decode_array(&input_data)?),
    }
}

fn write_png(buffer: RgbaBuffer, path: &Path) -> Result<(), InsightsCliError> {
    let (width, height) = (buffer.width(), buffer.height());
    if width == 0 || height == 0 {
        return Err(InsightsCliError::EmptyCanvas);
    }

    let image = image::RgbaImage::from_raw(width as u32, height as u32, buffer.into_bytes())
        .ok_or(InsightsCliError::EmptyCanvas)?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    log::info!("wrote {}x{} heatmap to {}", width, height, path.display());
    Ok(())
}

fn print_dashboard(view: &DashboardView) {
    println!("Checkout Analytics");
    println!("==================");
    println!(
        "Average session:  {}",
        view.average_session_seconds
            .map(|s| format!("{}s", s.round()))
            .unwrap_or_else(|| "--".to_string())
    );
    println!("Confusion events: {}", view.total_confusion_events);
    println!("Help prompts:     {}", view.total_help_triggered);
    println!("Sessions:         {}", view.session_count);
    println!("Conversion rate:  {}%", view.conversion_percent);

    println!("\nSections:");
    println!(
        "  {:<16} {:>6} {:>10} {:>9} {:>5}  {}",
        "section", "visits", "avg dwell", "confusion", "help", "dwell"
    );
    for row in &view.sections {
        let average = format_average_dwell(row.average_dwell_ms);
        let bar = "#".repeat((row.dwell_share * 20.0).round() as usize);
        println!(
            "  {:<16} {:>6} {:>10} {:>9} {:>5}  {}",
            row.section.as_str(),
            row.visits,
            average,
            row.confusion_count,
            if row.help_shown { "Yes" } else { "No" },
            bar
        );
    }

    let impact = &view.help_impact;
    println!("\nHelp impact:");
    println!("  Sections with confusion: {}", impact.sections_with_confusion);
    println!(
        "  Projected confusion after help: {} (of {})",
        impact.projected_confusion_after_help, impact.confusion_total
    );
    println!(
        "  Improvement: {}%",
        (impact.improvement_ratio * 100.0).round()
    );
    println!("  {}", impact.verdict.message());
}

/// Average dwell in seconds, `--` for a section never visited
fn format_average_dwell(average_dwell_ms: Option<f64>) -> String {
    average_dwell_ms
        .map(|ms| format!("{:.1}s", ms / 1000.0))
        .unwrap_or_else(|| "--".to_string())
}

#[derive(serde::Serialize)]
struct EventAck {
    line: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// Error handling

#[derive(Debug)]
enum InsightsCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    Image(image::ImageError),
    NoEvents,
    EmptyCanvas,
    ValidationFailed(usize),
    ConfirmationRequired,
    DoctorFailed,
}

impl From<io::Error> for InsightsCliError {
    fn from(e: io::Error) -> Self {
        InsightsCliError::Io(e)
    }
}

impl From<AnalyticsError> for InsightsCliError {
    fn from(e: AnalyticsError) -> Self {
        InsightsCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for InsightsCliError {
    fn from(e: serde_json::Error) -> Self {
        InsightsCliError::Json(e)
    }
}

impl From<image::ImageError> for InsightsCliError {
    fn from(e: image::ImageError) -> Self {
        InsightsCliError::Image(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<InsightsCliError> for CliError {
    fn from(e: InsightsCliError) -> Self {
        match e {
            InsightsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            InsightsCliError::Analytics(e) => CliError {
                code: "ANALYTICS_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the input batch and configuration file".to_string()),
            },
            InsightsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            InsightsCliError::Image(e) => CliError {
                code: "IMAGE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check that the output path is writable".to_string()),
            },
            InsightsCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure the input or stored batch is not empty".to_string()),
            },
            InsightsCliError::EmptyCanvas => CliError {
                code: "EMPTY_CANVAS".to_string(),
                message: "Heatmap canvas has zero width or height".to_string(),
                hint: Some("Pass --width and --height greater than zero".to_string()),
            },
            InsightsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            InsightsCliError::ConfirmationRequired => CliError {
                code: "CONFIRMATION_REQUIRED".to_string(),
                message: "Reset discards all analytics data".to_string(),
                hint: Some("Re-run with --yes to confirm".to_string()),
            },
            InsightsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_dwell_placeholder() {
        assert_eq!(format_average_dwell(None), "--");
        assert_eq!(format_average_dwell(Some(4000.0)), "4.0s");
        assert_eq!(format_average_dwell(Some(8333.3)), "8.3s");
    }

    #[test]
    fn test_run_flush_can_be_disabled() {
        let cli = Cli::try_parse_from(["insights", "run", "--flush", "false"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { flush: false }));

        let cli = Cli::try_parse_from(["insights", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { flush: true }));
    }
}
