//! budgetplan CLI - Budget consolidation and report engine
//!
//! Command-line interface for exporting operating-plan snapshots as protected
//! XLSX workbooks and previewing them in the terminal.

mod config;
mod diagnostics;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use budgetplan_core::{RawActivityRecord, Renderer};
use budgetplan_render::{Report, ReportBuilder, TextRenderer};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{ExportConfig, ReportArgs};
use diagnostics::{DiagnosticConfig, ExitCode, TerminalEmitter};

#[derive(Parser)]
#[command(name = "budgetplan")]
#[command(author, version, about = "Budget consolidation and report engine", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Treat warnings as errors (non-zero exit)
    #[arg(long, global = true)]
    strict: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a records snapshot as an XLSX workbook
    Export {
        /// JSON array of activity records
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        /// Output file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Currency label for budget cells
        #[arg(long, env = "BUDGETPLAN_CURRENCY")]
        currency: Option<String>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Print the workbook as plain-text tables
    Preview {
        /// JSON array of activity records
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },
}

fn main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let diagnostic_config = DiagnosticConfig {
        strict: cli.strict,
        quiet: cli.quiet,
    };

    let exit = match cli.command {
        Commands::Export {
            records,
            output,
            currency,
            report,
        } => {
            let config = ExportConfig::from_args(&report)?;
            let built = build_report(&records, &config, &report)?;
            let bytes = config
                .excel_renderer(currency.as_deref())
                .render(&built.workbook)
                .context("Failed to render workbook")?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let exit = emit_diagnostics(&built, diagnostic_config);
            if !cli.quiet {
                println!(
                    "Wrote {} ({} sheets, {} bytes)",
                    output.display(),
                    built.workbook.sheets().len(),
                    bytes.len()
                );
            }
            exit
        }
        Commands::Preview { records, report } => {
            let config = ExportConfig::from_args(&report)?;
            let built = build_report(&records, &config, &report)?;
            let text = TextRenderer::new()
                .render(&built.workbook)
                .context("Failed to render preview")?;
            print!("{text}");
            emit_diagnostics(&built, diagnostic_config)
        }
    };

    Ok(exit.into())
}

fn load_records(path: &Path) -> Result<Vec<RawActivityRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records {}", path.display()))?;
    let records: Vec<RawActivityRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse records {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "loaded records");
    Ok(records)
}

fn build_report(path: &Path, config: &ExportConfig, args: &ReportArgs) -> Result<Report> {
    let records = load_records(path)?;
    let ctx = config.fiscal_context(args);
    let request = config.report_request(args);
    ReportBuilder::new(request)
        .build(&records, &ctx)
        .context("Export rejected")
}

fn emit_diagnostics(report: &Report, config: DiagnosticConfig) -> ExitCode {
    let stderr = std::io::stderr();
    let mut emitter = TerminalEmitter::new(stderr.lock(), config);
    emitter.emit_all(&report.diagnostics);
    emitter.exit_code()
}
