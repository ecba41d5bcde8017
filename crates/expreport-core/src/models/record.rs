//! Line item records produced by the extractor and consumed by the workbook engines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::invoice::rules::nc8::format_nc8_code;

/// Subtype of a source document, decided from its header band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Ordinary shipment invoice, possibly with several line items.
    #[default]
    Shipment,
    /// Credit note: monetary amounts are negated.
    CreditNote,
    /// Debit note.
    DebitNote,
}

/// One row of the final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemRecord {
    /// Issuer company name ("ORDERED BY" block).
    pub company: String,

    /// Invoice number, coerced to an integer (0 when unparsable).
    pub invoice_number: i64,

    /// Customs classification code or one of the literal sentinels.
    pub nc8_code: String,

    /// Country of origin, ISO alpha-2 or "-".
    pub origin: String,

    /// Destination country, ISO alpha-2 or "Unknown".
    pub destination: String,

    /// Invoice value in EUR; zero when the RON value is authoritative.
    pub invoice_value_eur: Decimal,

    /// Net weight in whole kilograms.
    pub net_weight: u64,

    /// Shipment date.
    pub shipment_date: NaiveDate,

    /// RON per EUR, absent when the rate source gave up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,

    /// Invoice value in RON; zero when the EUR value is authoritative.
    pub value_ron: Decimal,

    /// Buyer VAT number, the grouping key of the report.
    pub vat_number: String,

    /// Delivery location code.
    pub delivery_location: i64,

    /// Incoterm code.
    pub delivery_condition: String,
}

/// Deduplication identity of a record: (vat_number, invoice_number, nc8_code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub vat_number: String,
    pub invoice_number: i64,
    pub nc8_code: String,
}

impl LineItemRecord {
    /// Identity used by the merge engine. The code is compared in canonical form.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            vat_number: self.vat_number.clone(),
            invoice_number: self.invoice_number,
            nc8_code: format_nc8_code(&self.nc8_code),
        }
    }

    /// Report ordering: (vat_number, shipment_date, invoice_number).
    pub fn sort_key(&self) -> (&str, NaiveDate, i64) {
        (&self.vat_number, self.shipment_date, self.invoice_number)
    }

    /// Bring the record into the shape written to the workbook.
    pub fn normalized(mut self) -> Self {
        self.nc8_code = format_nc8_code(&self.nc8_code);
        self
    }
}

/// Sort records into report order.
pub fn sort_records(records: &mut [LineItemRecord]) {
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::str::FromStr;

    pub fn record(vat: &str, invoice: i64, day: u32, code: &str) -> LineItemRecord {
        LineItemRecord {
            company: "ACME Components SRL".to_string(),
            invoice_number: invoice,
            nc8_code: code.to_string(),
            origin: "RO".to_string(),
            destination: "DE".to_string(),
            invoice_value_eur: Decimal::from_str("1000.00").unwrap(),
            net_weight: 120,
            shipment_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            exchange_rate: Some(Decimal::from_str("4.9771").unwrap()),
            value_ron: Decimal::ZERO,
            vat_number: vat.to_string(),
            delivery_location: 1593,
            delivery_condition: "FCA".to_string(),
        }
    }
}
