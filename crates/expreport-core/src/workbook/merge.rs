//! Merge new records into an existing report.
//!
//! The existing sheet is read as typed rows, its subtotals are dropped and
//! each new record is inserted at its ordered position. Group boundaries are
//! recomputed from the row sequence before every insertion. Finally every
//! row is moved to its new place, groups are renumbered and subtotals are
//! rebuilt, and the result is applied to the workbook in place.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::check_percentage;
use super::edit::{BlockRow, edit_in_place};
use super::rows::{PendingRow, SheetRow, assemble_rows};
use super::sheet::read_report;
use crate::error::WorkbookError;
use crate::models::config::WorkbookConfig;
use crate::models::record::{LineItemRecord, RecordKey, sort_records};

/// Outcome of a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Records written as new rows.
    pub inserted: usize,
    /// Records already present in the workbook, or repeated in the input.
    pub skipped: usize,
}

/// Contiguous rows of one VAT group, `start..end` in the row sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpan {
    pub vat_number: String,
    pub start: usize,
    pub end: usize,
}

/// Group boundaries of an ordered data row sequence.
pub fn group_spans(rows: &[PendingRow]) -> Vec<GroupSpan> {
    let mut spans: Vec<GroupSpan> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let vat = row.vat_number();
        match spans.last_mut() {
            Some(span) if span.vat_number == vat => span.end = i + 1,
            _ => spans.push(GroupSpan {
                vat_number: vat.to_string(),
                start: i,
                end: i + 1,
            }),
        }
    }
    spans
}

/// Every VAT group must be a single run of rows.
pub fn check_contiguous(rows: &[PendingRow]) -> Result<(), WorkbookError> {
    let mut seen = HashSet::new();
    for span in group_spans(rows) {
        if !seen.insert(span.vat_number.clone()) {
            return Err(WorkbookError::SplitGroup(span.vat_number));
        }
    }
    Ok(())
}

fn position(row: &PendingRow) -> (Option<NaiveDate>, i64) {
    match row {
        PendingRow::Existing(data) => data.position(),
        PendingRow::New(record) => (Some(record.shipment_date), record.invoice_number),
    }
}

/// Index at which `record` is inserted into `rows`.
///
/// Inside an existing group: before the first row whose (date, invoice) is
/// not smaller than the record's, else after the group. A new group goes
/// before the first group whose VAT number sorts after it, else at the end.
pub fn insertion_index(rows: &[PendingRow], record: &LineItemRecord) -> usize {
    let spans = group_spans(rows);
    let target = (Some(record.shipment_date), record.invoice_number);

    if let Some(span) = spans.iter().find(|s| s.vat_number == record.vat_number) {
        return (span.start..span.end)
            .find(|&i| position(&rows[i]) >= target)
            .unwrap_or(span.end);
    }

    spans
        .iter()
        .find(|s| s.vat_number.as_str() > record.vat_number.as_str())
        .map(|s| s.start)
        .unwrap_or(rows.len())
}

/// Merge `records` into the report at `existing` and write the result to
/// `dest` (which may be the same path).
///
/// Records whose (VAT number, invoice number, code) identity is already in
/// the workbook are skipped. Existing rows keep their cells and formatting,
/// and rows after the first empty row, cells outside the report columns and
/// other worksheets are carried over unchanged. The header must carry all
/// seventeen column labels and every VAT group must be one run of rows;
/// otherwise the merge fails before anything is written.
pub fn merge_into_workbook(
    existing: &Path,
    records: &[LineItemRecord],
    dest: &Path,
    percentage: f64,
    config: &WorkbookConfig,
) -> crate::Result<MergeSummary> {
    check_percentage(percentage)?;

    let report = read_report(existing)?;
    let mut rows: Vec<PendingRow> = report
        .rows
        .iter()
        .filter_map(|row| match row {
            SheetRow::Data(data) => Some(PendingRow::Existing(data.clone())),
            _ => None,
        })
        .collect();
    check_contiguous(&rows)?;

    let mut known: HashSet<RecordKey> = rows
        .iter()
        .filter_map(|row| match row {
            PendingRow::Existing(data) => Some(data.key()),
            PendingRow::New(_) => None,
        })
        .collect();

    let mut summary = MergeSummary::default();
    let mut fresh = Vec::new();
    for record in records.iter().cloned().map(LineItemRecord::normalized) {
        if known.insert(record.key()) {
            fresh.push(record);
        } else {
            debug!(
                "Skipping known record {} / {} / {}",
                record.vat_number, record.invoice_number, record.nc8_code
            );
            summary.skipped += 1;
        }
    }
    sort_records(&mut fresh);

    for record in fresh {
        let at = insertion_index(&rows, &record);
        rows.insert(at, PendingRow::New(record));
        summary.inserted += 1;
    }

    let added: Vec<bool> = rows.iter().map(|row| matches!(row, PendingRow::New(_))).collect();
    let assembled = assemble_rows(rows, percentage, config);
    let mut added = added.into_iter();
    let block: Vec<BlockRow<'_>> = assembled
        .iter()
        .filter_map(|row| match row {
            SheetRow::Data(data) => Some(if added.next().unwrap_or(false) {
                BlockRow::Added(data)
            } else {
                BlockRow::Kept(data)
            }),
            SheetRow::Subtotal(subtotal) => Some(BlockRow::Subtotal(subtotal)),
            SheetRow::Blank | SheetRow::Verbatim(_) => None,
        })
        .collect();
    edit_in_place(existing, dest, &report, &block, config)?;

    info!(
        "Merged into {}: {} inserted, {} skipped",
        dest.display(),
        summary.inserted,
        summary.skipped
    );
    Ok(summary)
}
