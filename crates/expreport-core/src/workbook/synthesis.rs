//! Build a report workbook from scratch.

use std::path::Path;

use tracing::info;

use super::check_percentage;
use super::rows::{PendingRow, assemble_rows};
use super::sheet::write_sheet;
use crate::models::config::WorkbookConfig;
use crate::models::record::{LineItemRecord, sort_records};

/// Write `records` as a new report at `dest`, replacing any file there.
///
/// Records are normalized, sorted by (VAT number, shipment date, invoice
/// number) and grouped by VAT number, each group numbered from 1 and closed
/// by a subtotal row. `percentage` fills the percentage column of every row.
pub fn generate_workbook(
    records: &[LineItemRecord],
    percentage: f64,
    dest: &Path,
    config: &WorkbookConfig,
) -> crate::Result<()> {
    check_percentage(percentage)?;

    let mut records: Vec<LineItemRecord> = records.iter().cloned().map(LineItemRecord::normalized).collect();
    sort_records(&mut records);

    let count = records.len();
    let pending = records.into_iter().map(PendingRow::New).collect();
    let rows = assemble_rows(pending, percentage, config);
    write_sheet(&rows, dest, config)?;

    info!("Generated {} with {} records", dest.display(), count);
    Ok(())
}
