//! Generate command - extract a batch of invoices into a report workbook.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use glob::{Pattern, glob};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use expreport_core::workbook::MAX_PERCENTAGE;
use expreport_core::{MergeSummary, generate_workbook, merge_into_workbook, process_documents};

use super::{build_extractor, load_config};

/// Arguments for the generate command.
#[derive(Args)]
pub struct GenerateArgs {
    /// Input PDF files, glob patterns or directories
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Value written to the percentage column (0 to 0.99)
    #[arg(short, long)]
    percentage: Option<f64>,

    /// Output workbook (default: <MM-YYYY>-EXP.xlsx, or the merged workbook)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Existing report to merge the new records into
    #[arg(short, long)]
    merge_into: Option<PathBuf>,

    /// Number of parallel workers (0 = one per logical CPU)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

pub async fn run(args: GenerateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let percentage = args.percentage.unwrap_or(config.workbook.default_percentage);
    if !(0.0..=MAX_PERCENTAGE).contains(&percentage) {
        anyhow::bail!("Percentage must be between 0 and {}, got {}", MAX_PERCENTAGE, percentage);
    }

    if let Some(existing) = &args.merge_into {
        if !existing.exists() {
            anyhow::bail!("Workbook to merge into not found: {}", existing.display());
        }
    }

    let files = discover_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No PDF files found in: {}", args.inputs.join(", "));
    }

    println!("{} Found {} PDF files to process", style("ℹ").blue(), files.len());

    let output = args
        .output
        .clone()
        .or_else(|| args.merge_into.clone())
        .unwrap_or_else(|| default_output_name(chrono::Local::now().date_naive()));
    let jobs = args.jobs.unwrap_or(config.batch.jobs);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let progress = pb.clone();
    let merge_into = args.merge_into.clone();
    let destination = output.clone();
    let workbook_config = config.workbook.clone();

    // The blocking HTTP client must be created and dropped off the async runtime
    let (record_count, merged) = tokio::task::spawn_blocking(move || -> anyhow::Result<(usize, Option<MergeSummary>)> {
        let extractor = build_extractor(&config)?;
        let records = process_documents(&files, &extractor, jobs, &|done, _| {
            progress.set_position(done as u64);
        })?;
        progress.finish_and_clear();

        let merged = match &merge_into {
            Some(existing) => Some(merge_into_workbook(
                existing,
                &records,
                &destination,
                percentage,
                &workbook_config,
            )?),
            None => {
                generate_workbook(&records, percentage, &destination, &workbook_config)?;
                None
            }
        };
        Ok((records.len(), merged))
    })
    .await??;

    info!("Report pipeline finished in {:?}", start.elapsed());

    match merged {
        Some(summary) => println!(
            "{} Merged {} new rows into {} ({} already present)",
            style("✓").green(),
            style(summary.inserted).green(),
            output.display(),
            summary.skipped
        ),
        None => println!(
            "{} Wrote {} records to {}",
            style("✓").green(),
            style(record_count).green(),
            output.display()
        ),
    }
    println!("   finished in {:?}", start.elapsed());

    Ok(())
}

/// Expand files, glob patterns and directories into the PDF files they name.
/// Directories are searched recursively.
fn discover_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let pattern = format!("{}/**/*", Pattern::escape(&path.to_string_lossy()));
            files.extend(glob(&pattern)?.filter_map(|r| r.ok()).filter(|p| is_pdf(p)));
        } else if path.is_file() {
            files.insert(path.to_path_buf());
        } else {
            files.extend(glob(input)?.filter_map(|r| r.ok()).filter(|p| p.is_file() && is_pdf(p)));
        }
    }

    debug!("Discovered {} input files", files.len());
    Ok(files.into_iter().collect())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// `MM-YYYY-EXP.xlsx` for the month of `today`.
fn default_output_name(today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("{}-EXP.xlsx", today.format("%m-%Y")))
}
