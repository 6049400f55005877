//! Batch processing command for a directory of invoices.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use invox_core::models::outcome::ProcessingOutcome;
use invox_core::{CancellationToken, InvoicePipeline, ProcessOptions};

use super::config::load_config;
use super::process::{OutputFormat, format_outcome};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Directory containing invoice files
    #[arg(required = true)]
    directory: PathBuf,

    /// File name pattern to match
    #[arg(short, long, default_value = "*.pdf")]
    pattern: String,

    /// Output directory for per-file results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Skip business-rule validation
    #[arg(long)]
    no_validate: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.workers = jobs;
    }
    let pipeline = InvoicePipeline::new(config)?;

    let files = pipeline.batch_files(&args.directory, &args.pattern)?;
    if files.is_empty() {
        anyhow::bail!(
            "No files matching {} found in {}",
            args.pattern,
            args.directory.display()
        );
    }
    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Processing {} files...", files.len()));

    // Ctrl-C stops new documents from starting; in-flight ones finish.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let options = ProcessOptions {
        validate: !args.no_validate,
        po_number: None,
    };
    let directory = args.directory.clone();
    let pattern = args.pattern.clone();
    let outcomes = tokio::task::spawn_blocking(move || {
        pipeline.process_batch_with_cancel(&directory, &pattern, &options, &cancel)
    })
    .await??;

    pb.finish_and_clear();

    if let Some(output_dir) = &args.output_dir {
        for outcome in &outcomes {
            write_outcome(output_dir, outcome, args.format)?;
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| !o.success).collect();
    let successful = outcomes.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            println!(
                "  - {}: {}",
                file_path(outcome),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn file_path(outcome: &ProcessingOutcome) -> &str {
    outcome
        .metadata
        .get("file_path")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn write_outcome(output_dir: &Path, outcome: &ProcessingOutcome, format: OutputFormat) -> anyhow::Result<()> {
    let Some(invoice) = &outcome.invoice else {
        return Ok(());
    };

    let output_path = output_dir.join(output_name(Path::new(file_path(outcome)), format));

    fs::write(&output_path, format_outcome(outcome, invoice, format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

/// The input's full file name plus the format extension, e.g. `a.pdf.json`.
fn output_name(input: &Path, format: OutputFormat) -> String {
    let name = input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");
    format!("{}.{}", name, format.extension())
}

fn write_summary(path: &Path, outcomes: &[ProcessingOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "vendor_name",
        "total_amount",
        "currency",
        "confidence",
        "valid",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = Path::new(file_path(outcome))
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = outcome.processing_time_ms.to_string();

        if let Some(invoice) = &outcome.invoice {
            let valid = outcome
                .validation
                .as_ref()
                .map(|v| v.is_valid.to_string())
                .unwrap_or_default();
            wtr.write_record([
                filename,
                "success",
                &invoice.invoice_number,
                &invoice.vendor_name,
                &invoice.total_amount.to_string(),
                &invoice.currency,
                &format!("{:.2}", invoice.confidence_score),
                &valid,
                &time,
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                &time,
                outcome.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
