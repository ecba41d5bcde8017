//! Process command - extract the records of a single invoice.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use expreport_core::{LineItemRecord, RecordExtractor};

use super::{build_extractor, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
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

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let input = args.input.clone();
    let records = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<LineItemRecord>> {
        let extractor = build_extractor(&config)?;
        Ok(extractor.extract_path(&input)?)
    })
    .await??;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&records)?,
        OutputFormat::Csv => format_records_csv(&records)?,
        OutputFormat::Text => format_records_text(&records),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    info!("Extracted {} records in {:?}", records.len(), start.elapsed());
    Ok(())
}

fn format_records_csv(records: &[LineItemRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "company",
        "invoice_number",
        "nc8_code",
        "origin",
        "destination",
        "invoice_value_eur",
        "net_weight",
        "shipment_date",
        "exchange_rate",
        "value_ron",
        "vat_number",
        "delivery_location",
        "delivery_condition",
    ])?;

    for record in records {
        wtr.write_record([
            &record.company,
            &record.invoice_number.to_string(),
            &record.nc8_code,
            &record.origin,
            &record.destination,
            &record.invoice_value_eur.to_string(),
            &record.net_weight.to_string(),
            &record.shipment_date.to_string(),
            &record.exchange_rate.map(|r| r.to_string()).unwrap_or_default(),
            &record.value_ron.to_string(),
            &record.vat_number,
            &record.delivery_location.to_string(),
            &record.delivery_condition,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_records_text(records: &[LineItemRecord]) -> String {
    let mut output = String::new();

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("Invoice: {} ({})\n", record.invoice_number, record.company));
        output.push_str(&format!("Code:    {}\n", record.nc8_code));
        output.push_str(&format!("Date:    {}\n", record.shipment_date));
        output.push_str(&format!("Route:   {} -> {}\n", record.origin, record.destination));
        output.push_str(&format!("Buyer:   {}\n", record.vat_number));
        output.push_str(&format!("Weight:  {} kg\n", record.net_weight));
        output.push_str(&format!("EUR:     {}\n", record.invoice_value_eur));
        output.push_str(&format!("RON:     {}\n", record.value_ron));
        match record.exchange_rate {
            Some(rate) => output.push_str(&format!("Rate:    {}\n", rate)),
            None => output.push_str("Rate:    unavailable\n"),
        }
        output.push_str(&format!(
            "Terms:   {} at location {}\n",
            record.delivery_condition, record.delivery_location
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn sample() -> LineItemRecord {
        LineItemRecord {
            company: "ACME Components SRL".to_string(),
            invoice_number: 90012345,
            nc8_code: "87 08 2990".to_string(),
            origin: "RO".to_string(),
            destination: "DE".to_string(),
            invoice_value_eur: Decimal::new(125040, 2),
            net_weight: 340,
            shipment_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            exchange_rate: None,
            value_ron: Decimal::ZERO,
            vat_number: "DE811234567".to_string(),
            delivery_location: 1593,
            delivery_condition: "FCA".to_string(),
        }
    }

    #[test]
    fn test_csv_leaves_missing_rate_empty() {
        let csv = format_records_csv(&[sample()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("1250.40,340,2025-03-15,,0,DE811234567"));
    }

    #[test]
    fn test_text_summary() {
        let text = format_records_text(&[sample()]);
        assert!(text.contains("Invoice: 90012345 (ACME Components SRL)"));
        assert!(text.contains("Rate:    unavailable"));
    }
}
