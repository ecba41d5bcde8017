//! Document field extractor for the fixed-layout commercial invoice.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::RecordExtractor;
use super::apportion::apportion;
use super::rules::patterns::{INCOTERMS, TAX_NUMBER};
use super::rules::{
    CREDIT_NOTE_CODE, CodeEntry, Currency, INTERNAL_ORDER_CODE, NumberLocale, TotalValue,
    UNKNOWN_CODE, classify_document, country_code_from_address, extract_code_entries,
    extract_company, extract_destination_address, extract_invoice_number, extract_labeled,
    extract_net_weight, extract_origin, extract_total_value, is_internal_order, last_line,
    parse_shipment_date, resolve_delivery_location,
};
use crate::error::{ExtractionError, PdfError};
use crate::models::config::ReportConfig;
use crate::models::record::{DocumentKind, LineItemRecord};
use crate::pdf::{PdfTextLayer, Region, TextLayer, region_rect};
use crate::rates::{ExchangeRateResolver, previous_business_day};

const UNKNOWN: &str = "Unknown";
const NO_ORIGIN: &str = "-";

/// Extracts line item records from invoice documents.
///
/// One extractor is shared by every worker of a batch; the exchange rate
/// resolver inside it is the only shared mutable state.
pub struct DocumentExtractor {
    config: ReportConfig,
    rates: Arc<ExchangeRateResolver>,
    today: NaiveDate,
}

impl DocumentExtractor {
    pub fn new(config: ReportConfig, rates: Arc<ExchangeRateResolver>) -> Self {
        Self {
            config,
            rates,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Override the date used when a document has no shipment date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Extract every line item from a text layer.
    pub fn extract_layer(&self, layer: &dyn TextLayer) -> crate::Result<Vec<LineItemRecord>> {
        let page_count = layer.page_count();
        if page_count == 0 {
            return Err(PdfError::NoPages.into());
        }

        let first_size = layer.page_size(1)?;
        let layout = &self.config.layout;
        let mut bands = HashMap::new();
        for region in Region::ALL {
            let text = layer.region_text(1, region.rect(layout, first_size))?;
            debug!("{:?} band: {} chars", region, text.len());
            bands.insert(region, text);
        }
        let band = |region: Region| bands.get(&region).map(String::as_str).unwrap_or_default();

        let pages = (1..=page_count)
            .map(|page| layer.page_text(page))
            .collect::<Result<Vec<_>, _>>()?;
        if pages.iter().all(|text| text.trim().is_empty()) {
            return Err(ExtractionError::NoText.into());
        }

        let header = band(Region::Header);
        let ordered_by = band(Region::OrderedBy);
        let invoiced_to = band(Region::InvoicedTo);
        let goods = band(Region::Goods);

        let kind = classify_document(header);

        let company = extract_company(ordered_by).unwrap_or_else(|| UNKNOWN.to_string());
        let invoice_number = extract_invoice_number(header).unwrap_or_else(|| {
            warn!("Invoice number not found in header, using 0");
            0
        });

        let entries = self.code_entries(kind, goods, &pages);

        let origin = extract_origin(goods).unwrap_or_else(|| NO_ORIGIN.to_string());
        let destination = extract_destination_address(invoiced_to)
            .and_then(|address| country_code_from_address(&address))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let last_size = layer.page_size(page_count)?;
        let totals_text = layer.region_text(page_count, region_rect(last_size, layout.totals))?;
        let total = extract_total_value(&totals_text, kind == DocumentKind::CreditNote);
        if total.is_none() {
            warn!("Invoice {}: no total found in the totals box", invoice_number);
        }
        let currency = total.map(|t| t.currency);

        let last_page = pages.last().map(String::as_str).unwrap_or_default();
        let net_weight =
            extract_net_weight(last_page, NumberLocale::for_currency(currency)).unwrap_or(0);

        let shipment_date = last_line(header)
            .and_then(parse_shipment_date)
            .unwrap_or_else(|| {
                warn!(
                    "Invoice {}: shipment date not found, using {}",
                    invoice_number, self.today
                );
                self.today
            });

        let quote = &self.config.rates.quote_currency;
        let exchange_rate = self.rates.rate(previous_business_day(shipment_date), quote);

        let vat_number = extract_labeled(invoiced_to, &TAX_NUMBER).unwrap_or_else(|| UNKNOWN.to_string());
        let delivery_location = resolve_delivery_location(header, &self.config.extraction);
        let delivery_condition =
            extract_labeled(ordered_by, &INCOTERMS).unwrap_or_else(|| UNKNOWN.to_string());

        let total_amount = total.map(|t| t.amount).unwrap_or(Decimal::ZERO);
        let records: Vec<LineItemRecord> = apportion(&entries, net_weight, total_amount)
            .into_iter()
            .map(|share| {
                let (invoice_value_eur, value_ron) = split_by_currency(total, share.amount);
                LineItemRecord {
                    company: company.clone(),
                    invoice_number,
                    nc8_code: share.code,
                    origin: origin.clone(),
                    destination: destination.clone(),
                    invoice_value_eur,
                    net_weight: share.net_weight,
                    shipment_date,
                    exchange_rate,
                    value_ron,
                    vat_number: vat_number.clone(),
                    delivery_location,
                    delivery_condition: delivery_condition.clone(),
                }
                .normalized()
            })
            .collect();

        info!(
            "Extracted {:?} {} for {}: {} line item(s)",
            kind,
            invoice_number,
            vat_number,
            records.len()
        );
        Ok(records)
    }

    fn code_entries(&self, kind: DocumentKind, goods: &str, pages: &[String]) -> Vec<CodeEntry> {
        let sentinel = |code: &str| {
            vec![CodeEntry {
                code: code.to_string(),
                partial_value: Decimal::ZERO,
            }]
        };

        if kind == DocumentKind::CreditNote {
            return sentinel(CREDIT_NOTE_CODE);
        }
        if is_internal_order(goods) {
            return sentinel(INTERNAL_ORDER_CODE);
        }

        let entries = extract_code_entries(pages);
        if entries.is_empty() {
            debug!("No commodity code found");
            return sentinel(UNKNOWN_CODE);
        }
        entries
    }
}

/// Place an amount in the EUR or RON column according to the document currency.
fn split_by_currency(total: Option<TotalValue>, amount: Decimal) -> (Decimal, Decimal) {
    match total.map(|t| t.currency) {
        Some(Currency::Eur) => (amount, Decimal::ZERO),
        Some(Currency::Ron) => (Decimal::ZERO, amount),
        None => (Decimal::ZERO, Decimal::ZERO),
    }
}

impl RecordExtractor for DocumentExtractor {
    fn extract_path(&self, path: &Path) -> crate::Result<Vec<LineItemRecord>> {
        debug!("Opening {}", path.display());
        let layer = PdfTextLayer::open(path)?;
        self.extract_layer(&layer)
    }
}
