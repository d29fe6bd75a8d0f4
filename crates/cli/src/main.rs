mod config;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tsemver_core::{
    detector::load_document, ChangeReport, DefinitionFile, DetectError, Detector, DetectorConfig,
    DetectorOptions, ResolutionContext,
};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Semantic-versioning change detector for TypeScript declaration files.
#[derive(Parser)]
#[command(
    name = "tsemver",
    version,
    about = "Semantic-versioning change detector for TypeScript declaration files"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Detector configuration file (default: ./tsemver.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the changes between two declaration files
    Diff {
        /// Path to the previous .d.ts file
        previous: PathBuf,
        /// Path to the current .d.ts file
        current: PathBuf,
        /// Exit with status 1 when the change is breaking (major)
        #[arg(long)]
        breaking: bool,
    },

    /// Check that a declaration file parses and all its references resolve
    Check {
        /// Path to the .d.ts file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.log_json, level);

    let detector_config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&format!("config error: {}", msg), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to start runtime: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Diff {
            previous,
            current,
            breaking,
        } => {
            rt.block_on(cmd_diff(
                &previous,
                &current,
                breaking,
                detector_config,
                cli.output,
                cli.quiet,
            ));
        }
        Commands::Check { file } => {
            rt.block_on(cmd_check(&file, &detector_config, cli.output, cli.quiet));
        }
    }
}

// ──────────────────────────────────────────────
// Subcommands
// ──────────────────────────────────────────────

async fn cmd_diff(
    previous: &Path,
    current: &Path,
    breaking: bool,
    detector_config: DetectorConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let detector = Detector::new(DetectorOptions {
        previous: DefinitionFile::from_path(previous),
        current: DefinitionFile::from_path(current),
        config: detector_config,
    });

    let report = match detector.detect().await {
        Ok(r) => r,
        Err(e) => {
            report_detect_error(&e, output, quiet);
            process::exit(1);
        }
    };

    if !quiet {
        print_report(&report, output);
    }

    if breaking && report.is_breaking() {
        process::exit(1);
    }
}

async fn cmd_check(
    file: &Path,
    detector_config: &DetectorConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let doc = match load_document(&DefinitionFile::from_path(file)).await {
        Ok(d) => d,
        Err(e) => {
            report_detect_error(&e, output, quiet);
            process::exit(1);
        }
    };

    let ctx = ResolutionContext::new(&doc, &doc, detector_config);
    if let Err(e) = ctx.check_references() {
        report_detect_error(&e, output, quiet);
        process::exit(1);
    }

    if !quiet {
        match output {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "file": file.display().to_string(),
                    "valid": true,
                    "statements": doc.statements.len(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json)
                        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e))
                );
            }
            OutputFormat::Text => {
                println!("{}: ok", file.display());
            }
        }
    }
}

// ──────────────────────────────────────────────
// Output
// ──────────────────────────────────────────────

fn print_report(report: &ChangeReport, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("changeType: {}", report.change_type);
            for change in &report.changes {
                println!("{}", change);
            }
        }
    }
}

fn report_detect_error(err: &DetectError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&err.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", err);
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
