//! Column model of the report sheet.

/// The seventeen report columns, in sheet order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    NrCrt,
    Company,
    InvoiceNumber,
    Nc8Code,
    Origin,
    Destination,
    InvoiceValueEur,
    NetWeight,
    ShipmentDate,
    ExchangeRate,
    ValueRon,
    VatNumber,
    DeliveryLocation,
    DeliveryCondition,
    Percentage,
    Transport,
    Statistic,
}

/// Number of report columns.
pub const COLUMN_COUNT: usize = 17;

/// Columns summed by every subtotal row.
pub const SUMMED_COLUMNS: [Column; 3] = [Column::NetWeight, Column::ValueRon, Column::Statistic];

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::NrCrt,
        Column::Company,
        Column::InvoiceNumber,
        Column::Nc8Code,
        Column::Origin,
        Column::Destination,
        Column::InvoiceValueEur,
        Column::NetWeight,
        Column::ShipmentDate,
        Column::ExchangeRate,
        Column::ValueRon,
        Column::VatNumber,
        Column::DeliveryLocation,
        Column::DeliveryCondition,
        Column::Percentage,
        Column::Transport,
        Column::Statistic,
    ];

    /// Zero-based column index.
    pub fn index(self) -> u16 {
        self as u16
    }

    /// Spreadsheet column letter.
    pub fn letter(self) -> char {
        (b'A' + self as u8) as char
    }

    /// Field name.
    pub fn key(self) -> &'static str {
        match self {
            Column::NrCrt => "nr_crt",
            Column::Company => "company",
            Column::InvoiceNumber => "invoice_number",
            Column::Nc8Code => "nc8_code",
            Column::Origin => "origin",
            Column::Destination => "destination",
            Column::InvoiceValueEur => "invoice_value_eur",
            Column::NetWeight => "net_weight",
            Column::ShipmentDate => "shipment_date",
            Column::ExchangeRate => "exchange_rate",
            Column::ValueRon => "value_ron",
            Column::VatNumber => "vat_number",
            Column::DeliveryLocation => "delivery_location",
            Column::DeliveryCondition => "delivery_condition",
            Column::Percentage => "percentage",
            Column::Transport => "transport",
            Column::Statistic => "statistic",
        }
    }

    /// Header label written to row 1.
    pub fn label(self) -> &'static str {
        match self {
            Column::NrCrt => "Nr Crt",
            Column::Company => "Firma",
            Column::InvoiceNumber => "Nr Factura Marfa",
            Column::Nc8Code => "Cod NC8",
            Column::Origin => "Origine",
            Column::Destination => "Destinatie",
            Column::InvoiceValueEur => "Val Fact Euro",
            Column::NetWeight => "Greutate Neta",
            Column::ShipmentDate => "Data Expeditiei",
            Column::ExchangeRate => "Curs Valutar",
            Column::ValueRon => "Valoare Ron",
            Column::VatNumber => "Vat Cumparator",
            Column::DeliveryLocation => "Loc Livrare",
            Column::DeliveryCondition => "Conditie Livrare",
            Column::Percentage => "%",
            Column::Transport => "Transport",
            Column::Statistic => "Statistica",
        }
    }

    /// Excel number format of the column.
    pub fn num_format(self) -> &'static str {
        match self {
            Column::NrCrt => "General",
            Column::InvoiceNumber | Column::DeliveryLocation => "0",
            Column::InvoiceValueEur
            | Column::ValueRon
            | Column::Transport
            | Column::Statistic => "#,##0.00",
            Column::NetWeight => "#,##0",
            Column::ShipmentDate => "dd.mmm",
            Column::ExchangeRate => "#,##0.0000",
            Column::Percentage => "0.00",
            Column::Company
            | Column::Nc8Code
            | Column::Origin
            | Column::Destination
            | Column::VatNumber
            | Column::DeliveryCondition => "@",
        }
    }

    /// Column carrying `label`, if any.
    pub fn from_label(label: &str) -> Option<Column> {
        let label = label.trim();
        Column::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Cell reference of this column on `row` (1-based), e.g. `G5`.
    pub fn cell(self, row: u32) -> String {
        format!("{}{}", self.letter(), row)
    }
}
