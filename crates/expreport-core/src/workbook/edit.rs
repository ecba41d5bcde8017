//! In-place editing of an existing report.
//!
//! The workbook is loaded whole with umya-spreadsheet and only the data
//! block of the report sheet is changed. Rows are inserted and removed
//! through the workbook, so cells outside the report columns, the other
//! worksheets and cell formatting are kept.

use std::path::Path;

use tracing::debug;
use umya_spreadsheet::{Spreadsheet, Style, Worksheet};

use super::formulas::subtotal_formula;
use super::layout::{Column, SUMMED_COLUMNS};
use super::rows::{Cell, DataRow, FIRST_DATA_ROW, SheetRow, SubtotalRow, excel_serial};
use super::sheet::{ReportSheet, save_atomically};
use crate::error::WorkbookError;
use crate::models::config::WorkbookConfig;

type Result<T> = std::result::Result<T, WorkbookError>;

fn edit_error(e: impl std::fmt::Display) -> WorkbookError {
    WorkbookError::Edit(e.to_string())
}

/// A row of the rebuilt data block.
#[derive(Debug, Clone, Copy)]
pub enum BlockRow<'a> {
    /// A row already on the sheet, at its final position.
    Kept(&'a DataRow),
    /// A row to insert.
    Added(&'a DataRow),
    Subtotal(&'a SubtotalRow),
}

/// Replace the data block of `report`, read from `existing`, with `block`
/// and write the workbook to `dest`.
///
/// `block` lists the final data and subtotal rows from sheet row 2 on. Kept
/// rows must appear in their original order. Their cells are left as they
/// are except for the sequence number and formula cells.
pub fn edit_in_place(
    existing: &Path,
    dest: &Path,
    report: &ReportSheet,
    block: &[BlockRow<'_>],
    config: &WorkbookConfig,
) -> Result<()> {
    let mut book = umya_spreadsheet::reader::xlsx::read(existing).map_err(edit_error)?;
    let name = report.name.as_str();

    let old_subtotals: Vec<u32> = report
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| matches!(row, SheetRow::Subtotal(_)))
        .map(|(i, _)| FIRST_DATA_ROW + i as u32)
        .collect();
    for &row in old_subtotals.iter().rev() {
        book.remove_row(name, &row, &1);
    }
    debug!("Removed {} subtotal rows from {}", old_subtotals.len(), name);

    // Kept rows now fill the block contiguously from the first data row
    let has_kept = block.iter().any(|row| matches!(row, BlockRow::Kept(_)));
    let styles = RowStyles::capture(
        sheet(&book, name)?,
        report,
        has_kept.then_some(FIRST_DATA_ROW),
        config,
    );

    for (i, row) in block.iter().enumerate() {
        let r = FIRST_DATA_ROW + i as u32;
        if !matches!(row, BlockRow::Kept(_)) {
            book.insert_new_row(name, &r, &1);
        }

        let worksheet = sheet_mut(&mut book, name)?;
        match row {
            BlockRow::Kept(data) => {
                debug_assert_eq!(data.row(), r);
                update_kept_row(worksheet, report, r, data);
            }
            BlockRow::Added(data) => {
                debug_assert_eq!(data.row(), r);
                write_added_row(worksheet, report, r, data, &styles);
            }
            BlockRow::Subtotal(subtotal) => write_subtotal(worksheet, report, r, subtotal, &styles),
        }
    }

    save_atomically(dest, |temp| {
        umya_spreadsheet::writer::xlsx::write(&book, temp).map_err(edit_error)
    })
}

fn sheet<'a>(book: &'a Spreadsheet, name: &str) -> Result<&'a Worksheet> {
    book.get_sheet_by_name(name).ok_or(WorkbookError::NoWorksheet)
}

fn sheet_mut<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet> {
    book.get_sheet_by_name_mut(name).ok_or(WorkbookError::NoWorksheet)
}

/// Renumber a kept row and rewrite its formulas for its new position.
fn update_kept_row(worksheet: &mut Worksheet, report: &ReportSheet, r: u32, data: &DataRow) {
    for (column, cell) in Column::ALL.iter().zip(data.cells()) {
        if *column == Column::NrCrt || matches!(cell, Cell::Formula(_)) {
            set_cell(worksheet.get_cell_mut((report.column(*column), r)), cell);
        }
    }
}

fn write_added_row(worksheet: &mut Worksheet, report: &ReportSheet, r: u32, data: &DataRow, styles: &RowStyles) {
    for (column, cell) in Column::ALL.iter().zip(data.cells()) {
        let target = worksheet.get_cell_mut((report.column(*column), r));
        target.set_style(styles.data[column.index() as usize].clone());
        set_cell(target, cell);
    }
}

fn write_subtotal(
    worksheet: &mut Worksheet,
    report: &ReportSheet,
    r: u32,
    subtotal: &SubtotalRow,
    styles: &RowStyles,
) {
    let vat = Column::VatNumber;
    let label = worksheet.get_cell_mut((report.column(vat), r));
    label.set_style(styles.subtotal[vat.index() as usize].clone());
    label.set_value_string(subtotal.label());

    for column in SUMMED_COLUMNS {
        let target = worksheet.get_cell_mut((report.column(column), r));
        target.set_style(styles.subtotal[column.index() as usize].clone());
        target.set_formula(subtotal_formula(column, subtotal.start, subtotal.end));
    }
}

fn set_cell(target: &mut umya_spreadsheet::Cell, cell: &Cell) {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
            target.set_value_string(s.as_str());
        }
        Cell::Number(n) => {
            target.set_value_number(*n);
        }
        Cell::Date(d) => {
            target.set_value_number(excel_serial(*d));
        }
        Cell::Formula(f) => {
            target.set_formula(f.as_str());
        }
    }
}

/// Styles for inserted rows, one per report column.
struct RowStyles {
    data: Vec<Style>,
    subtotal: Vec<Style>,
}

impl RowStyles {
    /// Take the styles of sheet row `template`, or build them from the
    /// configured font and the column formats when there is no such row.
    fn capture(worksheet: &Worksheet, report: &ReportSheet, template: Option<u32>, config: &WorkbookConfig) -> Self {
        let data: Vec<Style> = Column::ALL
            .iter()
            .map(|column| {
                template
                    .and_then(|r| worksheet.get_cell((report.column(*column), r)))
                    .map(|cell| cell.get_style().clone())
                    .unwrap_or_else(|| default_style(*column, config))
            })
            .collect();
        let subtotal = data
            .iter()
            .cloned()
            .map(|mut style| {
                style.get_font_mut().set_bold(true);
                style
            })
            .collect();

        Self { data, subtotal }
    }
}

fn default_style(column: Column, config: &WorkbookConfig) -> Style {
    let mut style = Style::default();
    style
        .get_font_mut()
        .set_name(config.font_name.as_str())
        .set_size(config.font_size);
    style.get_number_format_mut().set_format_code(column.num_format());
    style
}
