//! # tallysheet-cli
//!
//! Command-line interface for the tallysheet calculation engine.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tallysheet_engine::{Processor, RunConfig};
use tallysheet_sheet::{Book, XlsxReadOptions};
use tracing_subscriber::EnvFilter;

/// tallysheet - unit-wise aggregate calculations over spreadsheet data
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about = "Run configured aggregate calculations over a workbook sheet", long_about = None)]
struct Cli {
    /// Workbook file (xlsx)
    #[arg(value_name = "WORKBOOK")]
    workbook: PathBuf,

    /// Run configuration file (JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: PathBuf,

    /// Source sheet to read (first row is the header)
    #[arg(short = 's', long = "sheet", default_value = "Sheet1")]
    sheet: String,

    /// Results sheet to write (created if absent, replaced otherwise)
    #[arg(short = 'o', long = "output-sheet", default_value = "Results")]
    output_sheet: String,

    /// Write the workbook to this path instead of in place
    #[arg(long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Only print the report, don't write the workbook
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    let config_text = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config.display()))?;
    let config: RunConfig =
        serde_json::from_str(&config_text).with_context(|| "Invalid run configuration")?;

    let mut book = Book::from_xlsx_with_options(
        &cli.workbook,
        XlsxReadOptions::default().with_headers(true),
    )
    .with_context(|| format!("Failed to open workbook: {}", cli.workbook.display()))?;

    let sheet = book
        .get_sheet(&cli.sheet)
        .with_context(|| format!("Sheet '{}' not found in workbook", cli.sheet))?;

    let report = Processor::new()
        .run(sheet, &config)
        .with_context(|| "Run aborted")?;

    print_report(&report);

    if cli.dry_run {
        return Ok(());
    }

    let results = report.to_sheet(&cli.output_sheet);
    book.replace_or_insert(&cli.output_sheet, results);

    let target = cli.out.as_ref().unwrap_or(&cli.workbook);
    book.save_as_xlsx(target)
        .with_context(|| format!("Failed to save workbook: {}", target.display()))?;

    println!(
        "Wrote sheet {} to {}",
        cli.output_sheet.cyan(),
        target.display()
    );
    Ok(())
}

/// Print each unit's results and the run summary.
fn print_report(report: &tallysheet_engine::RunReport) {
    for unit in &report.units {
        let values: Vec<String> = unit
            .results
            .iter()
            .map(|(column, result)| match result.value() {
                Some(v) => {
                    if result.is_flagged() {
                        format!("{column}={}", format!("{v} (flagged)").yellow())
                    } else {
                        format!("{column}={v}")
                    }
                }
                None => format!("{column}={}", "unresolved".red()),
            })
            .collect();
        println!("{}: {}", unit.unit.bold(), values.join("  "));

        for (column, result) in &unit.results {
            for note in &result.notes {
                println!("    {} {column}: {note}", "note".dimmed());
            }
        }
    }

    let summary = report.summary.to_string();
    if report.summary.is_clean() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
    }
}
