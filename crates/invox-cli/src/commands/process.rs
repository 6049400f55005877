//! Process command - extract and validate a single invoice file.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use invox_core::models::invoice::InvoiceRecord;
use invox_core::models::outcome::ProcessingOutcome;
use invox_core::models::validation::ValidationResult;
use invox_core::validation::InMemoryPoProvider;
use invox_core::{InvoicePipeline, ProcessOptions};

use super::config::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip business-rule validation
    #[arg(long)]
    no_validate: bool,

    /// Purchase order number to validate against
    #[arg(long)]
    po_number: Option<String>,

    /// JSON file with purchase orders
    #[arg(long, requires = "po_number")]
    po_file: Option<PathBuf>,

    /// Show extraction confidence and timing
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut builder = InvoicePipeline::builder(config);
    if let Some(po_file) = &args.po_file {
        let provider = InMemoryPoProvider::from_file(po_file)?;
        debug!("Loaded {} purchase orders from {}", provider.len(), po_file.display());
        builder = builder.with_po_provider(Box::new(provider));
    }
    let pipeline = builder.build()?;

    let options = ProcessOptions {
        validate: !args.no_validate,
        po_number: args.po_number.clone(),
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Processing {}...", args.input.display()));

    let input = args.input.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.process(&input, &options)).await?;

    pb.finish_and_clear();

    let Some(invoice) = &outcome.invoice else {
        anyhow::bail!(
            "Processing failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    };

    if let Some(validation) = &outcome.validation {
        print_validation(validation);
    }

    let output = format_outcome(&outcome, invoice, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            invoice.confidence_score * 100.0
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            outcome.processing_time_ms
        );
    }

    Ok(())
}

fn print_validation(validation: &ValidationResult) {
    if validation.is_valid {
        eprintln!("{}", style("✓ Validation passed").green());
    } else {
        eprintln!("{}", style("✗ Validation failed").red());
    }
    for error in &validation.errors {
        eprintln!("  {} {}", style("error:").red(), error);
    }
    for warning in &validation.warnings {
        eprintln!("  {} {}", style("warning:").yellow(), warning);
    }
}

pub fn format_outcome(
    outcome: &ProcessingOutcome,
    invoice: &InvoiceRecord,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(invoice, outcome.validation.as_ref()),
        OutputFormat::Text => Ok(format_text(invoice, outcome.validation.as_ref())),
    }
}

fn format_csv(invoice: &InvoiceRecord, validation: Option<&ValidationResult>) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "invoice_number",
        "vendor_name",
        "invoice_date",
        "due_date",
        "total_amount",
        "tax_amount",
        "currency",
        "line_items",
        "confidence",
        "valid",
    ])?;

    wtr.write_record([
        &invoice.id,
        &invoice.invoice_number,
        &invoice.vendor_name,
        &invoice.invoice_date.map(|d| d.to_string()).unwrap_or_default(),
        &invoice.due_date.map(|d| d.to_string()).unwrap_or_default(),
        &invoice.total_amount.to_string(),
        &invoice.tax_amount.to_string(),
        &invoice.currency,
        &invoice.line_items.len().to_string(),
        &format!("{:.2}", invoice.confidence_score),
        &validation.map(|v| v.is_valid.to_string()).unwrap_or_default(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(invoice: &InvoiceRecord, validation: Option<&ValidationResult>) -> String {
    let mut output = String::new();
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());

    output.push_str(&format!("Invoice:  {}\n", invoice.invoice_number));
    output.push_str(&format!("Vendor:   {}\n", invoice.vendor_name));
    output.push_str(&format!("Date:     {}\n", date(invoice.invoice_date)));
    output.push_str(&format!("Due:      {}\n", date(invoice.due_date)));
    output.push('\n');

    output.push_str("Line items:\n");
    for item in &invoice.line_items {
        output.push_str(&format!(
            "  {} x {} @ {} = {}\n",
            item.quantity, item.description, item.unit_price, item.amount
        ));
    }
    output.push('\n');

    output.push_str(&format!("Tax:      {} {}\n", invoice.tax_amount, invoice.currency));
    output.push_str(&format!("Total:    {} {}\n", invoice.total_amount, invoice.currency));

    if let Some(po) = &invoice.po_number {
        output.push_str(&format!("PO:       {}\n", po));
    }
    if let Some(validation) = validation {
        output.push_str(&format!(
            "\nValidation: {} ({} errors, {} warnings)\n",
            if validation.is_valid { "passed" } else { "failed" },
            validation.errors.len(),
            validation.warnings.len()
        ));
    }

    output
}
