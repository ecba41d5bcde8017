//! Typed row model of the report sheet.
//!
//! Row numbers are 1-based spreadsheet rows; row 1 is the header, so the
//! first data row is row 2.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::formulas::{retarget_formula, row_formulas};
use super::layout::{COLUMN_COUNT, Column};
use crate::invoice::rules::format_nc8_code;
use crate::models::config::WorkbookConfig;
use crate::models::record::{LineItemRecord, RecordKey};

/// First spreadsheet row below the header.
pub const FIRST_DATA_ROW: u32 = 2;

/// Prefix of the VAT cell of a subtotal row.
pub const SUBTOTAL_PREFIX: &str = "Total ";

/// Content of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    /// Formula text without the leading `=`.
    Formula(String),
}

impl Cell {
    /// Text cell; whitespace-only text is an empty cell.
    pub fn text(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn decimal(value: Decimal) -> Self {
        Cell::Number(value.to_f64().unwrap_or_default())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Number(serial) => excel_serial_date(*serial),
            _ => None,
        }
    }

    /// Text as it would be rendered, used for column sizing.
    pub fn rendered(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%d.%b").to_string(),
            Cell::Formula(f) => format!("={}", f),
        }
    }
}

/// Date of an Excel serial day number (1900 date system).
pub fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Excel serial day number of a date (1900 date system).
pub fn excel_serial(date: NaiveDate) -> f64 {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .map(|epoch| (date - epoch).num_days() as f64)
        .unwrap_or_default()
}

/// A data row: one record, seventeen cells in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    cells: Vec<Cell>,
    /// Row the formulas in `cells` currently refer to.
    row: u32,
}

impl DataRow {
    /// Build the cells of `record` for `row`, numbered `nr` inside its group.
    pub fn from_record(
        record: &LineItemRecord,
        nr: u32,
        row: u32,
        percentage: f64,
        config: &WorkbookConfig,
    ) -> Self {
        let formulas = row_formulas(record, row, config);
        let computed = |formula: Option<String>, value: Decimal| match formula {
            Some(f) => Cell::Formula(f),
            None => Cell::decimal(value),
        };
        let optional = |formula: Option<String>| formula.map(Cell::Formula).unwrap_or(Cell::Empty);

        let cells = vec![
            Cell::Number(f64::from(nr)),
            Cell::text(&record.company),
            Cell::Number(record.invoice_number as f64),
            Cell::text(&format_nc8_code(&record.nc8_code)),
            Cell::text(&record.origin),
            Cell::text(&record.destination),
            computed(formulas.invoice_value_eur, record.invoice_value_eur),
            Cell::Number(record.net_weight as f64),
            Cell::Date(record.shipment_date),
            record.exchange_rate.map(Cell::decimal).unwrap_or(Cell::Empty),
            computed(formulas.value_ron, record.value_ron),
            Cell::text(&record.vat_number),
            Cell::Number(record.delivery_location as f64),
            Cell::text(&record.delivery_condition),
            Cell::Number(percentage),
            optional(formulas.transport),
            optional(formulas.statistic),
        ];
        debug_assert_eq!(cells.len(), COLUMN_COUNT);

        Self { cells, row }
    }

    /// Wrap cells read back from a sheet. Missing trailing cells are empty.
    pub fn from_cells(mut cells: Vec<Cell>, row: u32) -> Self {
        cells.resize(COLUMN_COUNT, Cell::Empty);
        Self { cells, row }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, column: Column) -> &Cell {
        &self.cells[column.index() as usize]
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn vat_number(&self) -> &str {
        self.cell(Column::VatNumber).as_text().unwrap_or_default()
    }

    fn invoice_number(&self) -> i64 {
        self.cell(Column::InvoiceNumber)
            .as_number()
            .map(|n| n as i64)
            .unwrap_or_default()
    }

    /// Deduplication identity.
    pub fn key(&self) -> RecordKey {
        let code = match self.cell(Column::Nc8Code) {
            Cell::Number(n) => format!("{}", *n as i64),
            other => other.as_text().unwrap_or_default().to_string(),
        };
        RecordKey {
            vat_number: self.vat_number().to_string(),
            invoice_number: self.invoice_number(),
            nc8_code: format_nc8_code(&code),
        }
    }

    /// Position inside a group: (shipment date, invoice number).
    pub fn position(&self) -> (Option<NaiveDate>, i64) {
        (self.cell(Column::ShipmentDate).as_date(), self.invoice_number())
    }

    /// Move the row, retargeting every formula cell.
    pub fn move_to(&mut self, row: u32) {
        if row == self.row {
            return;
        }
        for cell in &mut self.cells {
            if let Cell::Formula(f) = cell {
                *f = retarget_formula(f, self.row, row);
            }
        }
        self.row = row;
    }

    /// Set the sequence number inside the group.
    pub fn set_number(&mut self, nr: u32) {
        self.cells[Column::NrCrt.index() as usize] = Cell::Number(f64::from(nr));
    }

    /// Record fields held by the row. Formula cells read as zero or absent.
    pub fn to_record(&self) -> LineItemRecord {
        let text = |c: Column| self.cell(c).as_text().unwrap_or_default().to_string();
        let money = |c: Column| {
            self.cell(c)
                .as_number()
                .and_then(Decimal::from_f64)
                .map(|d| d.round_dp(2))
                .unwrap_or_default()
        };
        let number = |c: Column| self.cell(c).as_number().unwrap_or_default();

        LineItemRecord {
            company: text(Column::Company),
            invoice_number: self.invoice_number(),
            nc8_code: self.key().nc8_code,
            origin: text(Column::Origin),
            destination: text(Column::Destination),
            invoice_value_eur: money(Column::InvoiceValueEur),
            net_weight: number(Column::NetWeight).round().max(0.0) as u64,
            shipment_date: self.cell(Column::ShipmentDate).as_date().unwrap_or_default(),
            exchange_rate: self
                .cell(Column::ExchangeRate)
                .as_number()
                .and_then(Decimal::from_f64)
                .map(|d| d.round_dp(4)),
            value_ron: money(Column::ValueRon),
            vat_number: text(Column::VatNumber),
            delivery_location: number(Column::DeliveryLocation) as i64,
            delivery_condition: text(Column::DeliveryCondition),
        }
    }
}

/// Subtotal of one VAT group over rows `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtotalRow {
    pub vat_number: String,
    pub start: u32,
    pub end: u32,
}

impl SubtotalRow {
    pub fn label(&self) -> String {
        format!("{}{}", SUBTOTAL_PREFIX, self.vat_number)
    }
}

/// One sheet row below the header.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetRow {
    Data(DataRow),
    Subtotal(SubtotalRow),
    /// The empty row that ends the data block.
    Blank,
    /// A row after the end of the data block, kept as found.
    Verbatim(Vec<Cell>),
}

/// A data row waiting for its final position.
#[derive(Debug, Clone)]
pub enum PendingRow {
    Existing(DataRow),
    New(LineItemRecord),
}

impl PendingRow {
    pub fn vat_number(&self) -> &str {
        match self {
            PendingRow::Existing(row) => row.vat_number(),
            PendingRow::New(record) => &record.vat_number,
        }
    }
}

/// Place ordered data rows on the sheet.
///
/// Consecutive rows with the same VAT number form a group. Each group is
/// numbered from 1 and followed by its subtotal. Existing rows are moved to
/// their new position; new rows get formulas built for their final row.
pub fn assemble_rows(rows: Vec<PendingRow>, percentage: f64, config: &WorkbookConfig) -> Vec<SheetRow> {
    let mut out = Vec::with_capacity(rows.len() * 2);
    let mut next_row = FIRST_DATA_ROW;
    let mut group: Option<SubtotalRow> = None;
    let mut nr = 0;

    for pending in rows {
        let vat = pending.vat_number().to_string();
        if group.as_ref().is_some_and(|g| g.vat_number != vat) {
            if let Some(done) = group.take() {
                out.push(SheetRow::Subtotal(done));
                next_row += 1;
            }
        }
        let current = group.get_or_insert_with(|| {
            nr = 0;
            SubtotalRow {
                vat_number: vat,
                start: next_row,
                end: next_row,
            }
        });
        nr += 1;
        current.end = next_row;

        let data = match pending {
            PendingRow::Existing(mut row) => {
                row.move_to(next_row);
                row.set_number(nr);
                row
            }
            PendingRow::New(record) => DataRow::from_record(&record, nr, next_row, percentage, config),
        };
        out.push(SheetRow::Data(data));
        next_row += 1;
    }
    if let Some(done) = group.take() {
        out.push(SheetRow::Subtotal(done));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use pretty_assertions::assert_eq;

    fn config() -> WorkbookConfig {
        WorkbookConfig::default()
    }

    #[test]
    fn test_from_record_cells() {
        let row = DataRow::from_record(&record("DE1", 42, 3, "87082990"), 1, 2, 0.6, &config());

        assert_eq!(row.cell(Column::NrCrt), &Cell::Number(1.0));
        assert_eq!(row.cell(Column::Nc8Code), &Cell::Text("87 08 2990".into()));
        assert_eq!(row.cell(Column::InvoiceValueEur), &Cell::Number(1000.0));
        assert_eq!(row.cell(Column::ValueRon), &Cell::Formula("G2*J2".into()));
        assert_eq!(row.cell(Column::Percentage), &Cell::Number(0.6));
        assert_eq!(row.cell(Column::Statistic), &Cell::Formula("ROUND(K2+O2*P2, 0)".into()));
    }

    #[test]
    fn test_to_record_round_trip() {
        let original = record("DE1", 42, 3, "87082990").normalized();
        let row = DataRow::from_record(&original, 1, 2, 0.6, &config());

        let mut expected = original.clone();
        // RON is a formula cell
        expected.value_ron = Decimal::ZERO;
        assert_eq!(row.to_record(), expected);
    }

    #[test]
    fn test_move_to_retargets_formulas() {
        let mut row = DataRow::from_record(&record("DE1", 1, 3, "87082990"), 1, 4, 0.6, &config());
        row.move_to(5);

        assert_eq!(row.row(), 5);
        assert_eq!(row.cell(Column::ValueRon), &Cell::Formula("G5*J5".into()));
        assert_eq!(row.cell(Column::Transport), &Cell::Formula("28000*J5/147000*H5".into()));
    }

    #[test]
    fn test_assemble_groups_and_subtotals() {
        let rows = vec![
            PendingRow::New(record("DE1", 1, 3, "87082990")),
            PendingRow::New(record("DE1", 2, 4, "87082990")),
            PendingRow::New(record("FR9", 3, 1, "87082990")),
        ];
        let sheet = assemble_rows(rows, 0.6, &config());

        let shape: Vec<String> = sheet
            .iter()
            .map(|row| match row {
                SheetRow::Data(d) => format!("{}#{}", d.row(), d.cell(Column::NrCrt).rendered()),
                SheetRow::Subtotal(s) => format!("{} {}:{}", s.label(), s.start, s.end),
                SheetRow::Blank => "blank".into(),
                SheetRow::Verbatim(_) => "verbatim".into(),
            })
            .collect();
        assert_eq!(shape, vec!["2#1", "3#2", "Total DE1 2:3", "5#1", "Total FR9 5:5"]);
    }

    #[test]
    fn test_whitespace_text_is_empty() {
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert_eq!(Cell::text(""), Cell::Empty);
        assert_eq!(Cell::text(" DE1"), Cell::Text(" DE1".into()));
    }

    #[test]
    fn test_excel_serial_date() {
        assert_eq!(excel_serial_date(45731.0), NaiveDate::from_ymd_opt(2025, 3, 15));
        assert_eq!(excel_serial_date(0.0), None);

        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(excel_serial(date), 45731.0);
    }
}
