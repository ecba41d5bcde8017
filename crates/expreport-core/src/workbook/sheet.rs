//! Reading and writing the report sheet.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, DataType, Range, Reader, open_workbook_auto};
use lazy_static::lazy_static;
use regex::Regex;
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Workbook, Worksheet};
use tracing::debug;

use super::formulas::subtotal_formula;
use super::layout::{COLUMN_COUNT, Column, SUMMED_COLUMNS};
use super::rows::{Cell, DataRow, SUBTOTAL_PREFIX, SheetRow, SubtotalRow};
use crate::error::WorkbookError;
use crate::models::config::WorkbookConfig;

type Result<T> = std::result::Result<T, WorkbookError>;

lazy_static! {
    static ref SUM_RANGE: Regex = Regex::new(r"SUM\(\$?[A-Z]{1,3}\$?(\d+):\$?[A-Z]{1,3}\$?(\d+)\)").unwrap();
}

/// The report sheet of an existing workbook.
#[derive(Debug, Clone)]
pub struct ReportSheet {
    /// Worksheet name.
    pub name: String,
    /// Zero-based sheet column holding each report column.
    pub columns: BTreeMap<Column, usize>,
    /// Rows below the header, starting at sheet row 2.
    pub rows: Vec<SheetRow>,
}

impl ReportSheet {
    /// 1-based sheet column of a report column.
    pub fn column(&self, column: Column) -> u32 {
        self.columns
            .get(&column)
            .map(|&c| c as u32 + 1)
            .unwrap_or(u32::from(column.index()) + 1)
    }
}

/// Read the first worksheet of an existing report.
///
/// Columns are located by their header labels; every one of the seventeen
/// labels must be present. Rows up to the first empty row are data or
/// subtotal rows. Everything after that row is returned verbatim.
pub fn read_report(path: &Path) -> Result<ReportSheet> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(WorkbookError::NoWorksheet)?;

    let values = workbook.worksheet_range(&sheet_name)?;
    let formulas = workbook.worksheet_formula(&sheet_name)?;
    let grid = Grid::new(&values, &formulas);

    let columns = map_header(&grid)?;
    debug!("Read {} rows from sheet {}", grid.last_row, sheet_name);

    let mut rows = Vec::new();
    let mut in_data = true;
    for r in 1..=grid.last_row {
        let raw: Vec<Cell> = (0..=grid.last_col).map(|c| grid.cell(r, c)).collect();

        if !in_data {
            rows.push(SheetRow::Verbatim(trim_trailing(raw)));
            continue;
        }
        if raw.iter().all(Cell::is_empty) {
            in_data = false;
            rows.push(SheetRow::Blank);
            continue;
        }

        let cells: Vec<Cell> = Column::ALL
            .iter()
            .map(|column| raw[columns[column]].clone())
            .collect();
        let excel_row = r + 1;
        match subtotal_of(&cells) {
            Some(subtotal) => rows.push(SheetRow::Subtotal(subtotal)),
            None => rows.push(SheetRow::Data(DataRow::from_cells(cells, excel_row))),
        }
    }

    Ok(ReportSheet {
        name: sheet_name,
        columns,
        rows,
    })
}

/// Rows of the first worksheet of an existing report. See [`read_report`].
pub fn read_sheet(path: &Path) -> Result<Vec<SheetRow>> {
    read_report(path).map(|report| report.rows)
}

fn trim_trailing(mut cells: Vec<Cell>) -> Vec<Cell> {
    while cells.last().is_some_and(Cell::is_empty) {
        cells.pop();
    }
    cells
}

/// Value and formula ranges of one sheet, addressed by absolute position.
struct Grid<'a> {
    values: &'a Range<Data>,
    formulas: &'a Range<String>,
    last_row: u32,
    last_col: u32,
}

impl<'a> Grid<'a> {
    fn new(values: &'a Range<Data>, formulas: &'a Range<String>) -> Self {
        let (mut last_row, mut last_col) = values.end().unwrap_or((0, 0));
        if let Some((row, col)) = formulas.end() {
            last_row = last_row.max(row);
            last_col = last_col.max(col);
        }
        Self {
            values,
            formulas,
            last_row,
            last_col,
        }
    }

    fn cell(&self, row: u32, col: u32) -> Cell {
        if let Some(formula) = self.formulas.get_value((row, col)) {
            if !formula.is_empty() {
                return Cell::Formula(formula.trim_start_matches('=').to_string());
            }
        }
        self.values
            .get_value((row, col))
            .map(convert)
            .unwrap_or(Cell::Empty)
    }
}

fn convert(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string().to_uppercase()),
        Data::DateTime(_) | Data::DateTimeIso(_) => value.as_date().map(Cell::Date).unwrap_or(Cell::Empty),
        _ => value.as_string().map(|s| Cell::text(&s)).unwrap_or(Cell::Empty),
    }
}

/// Sheet column of every report column.
fn map_header(grid: &Grid<'_>) -> Result<BTreeMap<Column, usize>> {
    let mut columns = BTreeMap::new();
    for c in 0..=grid.last_col {
        if let Some(column) = grid.cell(0, c).as_text().and_then(Column::from_label) {
            columns.entry(column).or_insert(c as usize);
        }
    }

    let missing: Vec<String> = Column::ALL
        .iter()
        .filter(|column| !columns.contains_key(column))
        .map(|column| column.label().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(WorkbookError::MissingColumns(missing));
    }
    Ok(columns)
}

fn subtotal_of(cells: &[Cell]) -> Option<SubtotalRow> {
    let label = cells[Column::VatNumber.index() as usize].as_text()?;
    let vat = label.strip_prefix(SUBTOTAL_PREFIX)?;
    if !cells[Column::NrCrt.index() as usize].is_empty() {
        return None;
    }

    let (start, end) = SUMMED_COLUMNS
        .iter()
        .find_map(|column| match &cells[column.index() as usize] {
            Cell::Formula(f) => SUM_RANGE
                .captures(f)
                .and_then(|caps| Some((caps[1].parse().ok()?, caps[2].parse().ok()?))),
            _ => None,
        })
        .unwrap_or((0, 0));

    Some(SubtotalRow {
        vat_number: vat.trim().to_string(),
        start,
        end,
    })
}

/// Cell formats shared by every row.
struct Styles {
    header: Format,
    data: Vec<Format>,
    subtotal: Vec<Format>,
    plain: Format,
}

impl Styles {
    fn new(config: &WorkbookConfig) -> Self {
        let base = Format::new()
            .set_font_name(config.font_name.as_str())
            .set_font_size(config.font_size);

        let header = base
            .clone()
            .set_bold()
            .set_background_color(Color::RGB(config.header_color))
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::Bottom)
            .set_text_wrap();
        let data: Vec<Format> = Column::ALL
            .iter()
            .map(|column| base.clone().set_num_format(column.num_format()))
            .collect();
        let subtotal = data.iter().map(|format| format.clone().set_bold()).collect();

        Self {
            header,
            data,
            subtotal,
            plain: base,
        }
    }
}

/// Column widths from the longest rendered content of each column.
struct Widths {
    longest: BTreeMap<u16, usize>,
}

impl Widths {
    fn new() -> Self {
        Self {
            longest: BTreeMap::new(),
        }
    }

    fn observe(&mut self, col: u16, text: &str) {
        let len = text.chars().count();
        let entry = self.longest.entry(col).or_insert(0);
        *entry = (*entry).max(len);
    }

    fn apply(&self, worksheet: &mut Worksheet, config: &WorkbookConfig) -> Result<()> {
        for (&col, &len) in &self.longest {
            let width = len as f64 * (config.font_size / 10.0) * config.width_scaling + 2.0;
            worksheet.set_column_width(col, width)?;
        }
        Ok(())
    }
}

/// Write `rows` below the header and replace `dest` with the result.
///
/// The file is written next to `dest` and renamed over it, so `dest` is
/// either left untouched or fully replaced.
pub fn write_sheet(rows: &[SheetRow], dest: &Path, config: &WorkbookConfig) -> Result<()> {
    let mut workbook = Workbook::new();
    let styles = Styles::new(config);
    let mut widths = Widths::new();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&config.sheet_name)?;

    for column in Column::ALL {
        worksheet.write_string_with_format(0, column.index(), column.label(), &styles.header)?;
        widths.observe(column.index(), column.label());
    }

    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        match row {
            SheetRow::Data(data) => {
                debug_assert_eq!(data.row(), r + 1, "data row written at a row its formulas do not target");
                for (column, cell) in Column::ALL.iter().zip(data.cells()) {
                    write_cell(worksheet, r, column.index(), cell, &styles.data[column.index() as usize])?;
                    widths.observe(column.index(), &cell.rendered());
                }
            }
            SheetRow::Subtotal(subtotal) => {
                let col = Column::VatNumber.index();
                let label = subtotal.label();
                worksheet.write_string_with_format(r, col, &label, &styles.subtotal[col as usize])?;
                widths.observe(col, &label);

                for column in SUMMED_COLUMNS {
                    let col = column.index();
                    let formula = Cell::Formula(subtotal_formula(column, subtotal.start, subtotal.end));
                    write_cell(worksheet, r, col, &formula, &styles.subtotal[col as usize])?;
                    widths.observe(col, &formula.rendered());
                }
            }
            SheetRow::Blank => {}
            SheetRow::Verbatim(cells) => {
                for (c, cell) in cells.iter().enumerate() {
                    let col = c as u16;
                    let format = if c < COLUMN_COUNT { &styles.data[c] } else { &styles.plain };
                    write_cell(worksheet, r, col, cell, format)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    widths.apply(worksheet, config)?;

    save_atomically(dest, |temp| Ok(workbook.save(temp)?))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell, format: &Format) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        Cell::Number(n) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        Cell::Date(d) => {
            use chrono::Datelike;
            let date = ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
            worksheet.write_datetime_with_format(row, col, &date, format)?;
        }
        Cell::Formula(f) => {
            worksheet.write_formula_with_format(row, col, format!("={}", f).as_str(), format)?;
        }
    }
    Ok(())
}

/// Write a file next to `dest` with `write`, then rename it over `dest`.
/// On failure `dest` is left untouched.
pub(super) fn save_atomically<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let persist_error = |source| WorkbookError::Persist {
        path: dest.display().to_string(),
        source,
    };

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = tempfile::Builder::new()
        .prefix(".expreport-")
        .suffix(".xlsx")
        .tempfile_in(dir)
        .map_err(persist_error)?;

    write(temp.path())?;
    temp.persist(dest).map_err(|e| persist_error(e.error))?;

    debug!("Wrote {}", dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use crate::workbook::rows::{PendingRow, assemble_rows};
    use pretty_assertions::assert_eq;

    fn config() -> WorkbookConfig {
        WorkbookConfig::default()
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let mut rows = assemble_rows(
            vec![
                PendingRow::New(record("DE1", 10, 3, "87082990")),
                PendingRow::New(record("DE1", 11, 4, "87082990")),
            ],
            0.6,
            &config(),
        );
        rows.push(SheetRow::Blank);
        rows.push(SheetRow::Verbatim(vec![Cell::text("Notes"), Cell::Number(7.0)]));
        write_sheet(&rows, &path, &config()).unwrap();

        let read = read_sheet(&path).unwrap();
        assert_eq!(read.len(), 5);
        assert_eq!(
            read[2],
            SheetRow::Subtotal(SubtotalRow {
                vat_number: "DE1".into(),
                start: 2,
                end: 3,
            })
        );
        assert_eq!(read[3], SheetRow::Blank);
        assert_eq!(read[4], SheetRow::Verbatim(vec![Cell::Text("Notes".into()), Cell::Number(7.0)]));

        match &read[1] {
            SheetRow::Data(row) => {
                assert_eq!(row.row(), 3);
                assert_eq!(row.cell(Column::ValueRon), &Cell::Formula("G3*J3".into()));
                assert_eq!(row.to_record().invoice_number, 11);
            }
            other => panic!("expected a data row, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_row_ends_data_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let mut rows = assemble_rows(
            vec![PendingRow::New(record("DE1", 10, 3, "87082990"))],
            0.6,
            &config(),
        );
        rows.push(SheetRow::Verbatim(vec![Cell::Text(" ".into()), Cell::Text("  ".into())]));
        rows.push(SheetRow::Verbatim(vec![Cell::Text("Notes".into())]));
        write_sheet(&rows, &path, &config()).unwrap();

        let read = read_sheet(&path).unwrap();
        assert_eq!(read.len(), 4);
        assert_eq!(read[2], SheetRow::Blank);
        assert_eq!(read[3], SheetRow::Verbatim(vec![Cell::Text("Notes".into())]));
    }

    #[test]
    fn test_report_column_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let rows = assemble_rows(Vec::new(), 0.6, &config());
        write_sheet(&rows, &path, &config()).unwrap();

        let report = read_report(&path).unwrap();
        assert_eq!(report.name, "Invoices");
        assert!(report.rows.is_empty());
        assert_eq!(report.column(Column::NrCrt), 1);
        assert_eq!(report.column(Column::Statistic), 17);
    }

    #[test]
    fn test_missing_header_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Nr Crt").unwrap();
        worksheet.write_string(0, 1, "Firma").unwrap();
        workbook.save(&path).unwrap();

        match read_sheet(&path) {
            Err(WorkbookError::MissingColumns(missing)) => {
                assert_eq!(missing.len(), COLUMN_COUNT - 2);
                assert!(missing.contains(&"Vat Cumparator".to_string()));
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_subtotal_range_parsing() {
        let mut cells = vec![Cell::Empty; COLUMN_COUNT];
        cells[Column::VatNumber.index() as usize] = Cell::text("Total DE1");
        cells[Column::NetWeight.index() as usize] = Cell::Formula("SUM(H4:H9)".into());

        assert_eq!(
            subtotal_of(&cells),
            Some(SubtotalRow {
                vat_number: "DE1".into(),
                start: 4,
                end: 9,
            })
        );

        cells[Column::NrCrt.index() as usize] = Cell::Number(1.0);
        assert_eq!(subtotal_of(&cells), None);
    }
}
