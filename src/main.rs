use clap::{Parser, Subcommand};
use tracing::{error, info};

use std::fs;
use std::path::{Path, PathBuf};

use invoice_extractor::config::{EngineConfig, ProcessOptions};
use invoice_extractor::domain::{BatchResult, RawLine};
use invoice_extractor::engine::ExtractionEngine;
use invoice_extractor::observability;
use invoice_extractor::profile::VendorProfile;

#[derive(Parser)]
#[command(name = "invoice_extractor")]
#[command(about = "Invoice line item extraction and validation engine")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch of invoice lines
    Process {
        /// Input file: a JSON array of line objects, or one JSON object per line
        #[arg(long)]
        input: PathBuf,
        /// Vendor profile file (.json or .toml)
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Write the batch result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        /// Line number offset for chunked input
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Override the math tolerance from config
        #[arg(long)]
        tolerance: Option<f64>,
        /// Dump Prometheus metrics after processing
        #[arg(long)]
        metrics: bool,
    },
    /// Process a single line and print the full breakdown
    Inspect {
        /// Input file containing the lines
        #[arg(long)]
        input: PathBuf,
        /// 1-based position of the line to inspect
        #[arg(long, default_value_t = 1)]
        line: usize,
        /// Vendor profile file (.json or .toml)
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Validate a vendor profile file
    CheckProfile {
        /// Profile file to validate
        #[arg(long)]
        profile: PathBuf,
    },
}

/// Accepts either a JSON array of objects or newline-delimited JSON
fn read_input(path: &Path) -> Result<Vec<RawLine>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        Ok(serde_json::from_str(&content)?)
    } else {
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Into::into))
            .collect()
    }
}

fn load_profile(path: Option<&PathBuf>) -> Result<Option<VendorProfile>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            // load() validates the profile before returning it
            let profile = VendorProfile::load(p)?;
            info!(vendor = %profile.vendor_id, "vendor profile loaded");
            Ok(Some(profile))
        }
        None => Ok(None),
    }
}

fn print_summary(result: &BatchResult) {
    println!("\n📊 Batch Results:");
    println!("   Batch ID: {}", result.batch_id);
    println!("   Total lines: {}", result.summary.total_lines);
    println!("   Processable: {}", result.summary.processable_lines);
    println!("   Billable: {}", result.summary.billable_lines);
    println!("   Errors: {}", result.summary.errored_lines);
    println!("   Subtotal: ${:.2}", result.summary.subtotal);
    println!("   Average confidence: {}", result.summary.average_confidence);

    if !result.warnings.is_empty() {
        println!("\n⚠️  Problems encountered:");
        for batch_warning in &result.warnings {
            println!(
                "   - line {}: [{}] {}: {}",
                batch_warning.line_number,
                batch_warning.warning.severity.as_str(),
                batch_warning.warning.kind.as_str(),
                batch_warning.warning.message
            );
        }
    }
}

fn write_result(
    result: &BatchResult,
    output: Option<&PathBuf>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    match output {
        Some(path) => {
            fs::write(path, &json)?;
            println!("   Output file: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    observability::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            profile,
            output,
            pretty,
            offset,
            tolerance,
            metrics,
        } => {
            println!("🧾 Processing invoice lines from {}...", input.display());

            if metrics {
                observability::metrics::init()?;
            }

            let mut options = EngineConfig::load_or_default().to_options();
            options.line_number_offset = offset;
            if let Some(t) = tolerance {
                options.math_tolerance = t;
            }

            let profile = load_profile(profile.as_ref())?;
            let lines = read_input(&input)?;
            info!(lines = lines.len(), "input loaded");

            let engine = ExtractionEngine::with_options(options);
            let result = engine.process_batch(&lines, profile.as_ref());

            print_summary(&result);
            write_result(&result, output.as_ref(), pretty)?;

            if metrics {
                if let Some(rendered) = observability::metrics::render() {
                    println!("\n📈 Metrics:\n{}", rendered);
                }
            }
        }
        Commands::Inspect { input, line, profile } => {
            println!("🔍 Inspecting line {} of {}...", line, input.display());

            let profile = load_profile(profile.as_ref())?;
            let lines = read_input(&input)?;
            if line == 0 || line > lines.len() {
                error!(line, available = lines.len(), "line out of range");
                println!("❌ Line {} out of range (input has {} lines)", line, lines.len());
                std::process::exit(1);
            }

            let engine = ExtractionEngine::with_options(ProcessOptions {
                line_number_offset: line - 1,
                ..ProcessOptions::default()
            });
            let processed = engine.process_line(&lines[line - 1], profile.as_ref());

            println!("{}", serde_json::to_string_pretty(&processed)?);
            let status = if processed.validation.can_process {
                "✅ processable"
            } else if processed.validation.can_bill {
                "⚠️  billable with warnings"
            } else {
                "❌ blocked"
            };
            println!(
                "\n{} (confidence {}, {})",
                status,
                processed.validation.overall_confidence,
                processed.validation.confidence_level.as_str()
            );
        }
        Commands::CheckProfile { profile } => {
            println!("🔧 Checking profile {}...", profile.display());
            match VendorProfile::load(&profile) {
                Ok(p) => {
                    println!("✅ Profile '{}' is valid", p.vendor_id);
                    println!("   Vendor: {}", p.name);
                    println!("   Bills by weight: {}", p.bills_by_weight);
                    println!("   Mapped columns: {}", p.columns.len());
                }
                Err(e) => {
                    error!("Profile validation failed: {}", e);
                    println!("❌ Profile invalid: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
