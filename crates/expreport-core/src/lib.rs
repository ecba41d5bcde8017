//! Core library for export invoice reporting.
//!
//! This crate provides:
//! - Proportional page geometry and region text extraction from PDFs
//! - Field extraction rules for the fixed-layout commercial invoice format
//! - Exchange rate resolution with a shared, concurrent memo
//! - Workbook synthesis and incremental merge with live formulas and subtotals

pub mod batch;
pub mod error;
pub mod invoice;
pub mod models;
pub mod pdf;
pub mod rates;
pub mod workbook;

pub use batch::process_documents;
pub use error::{ReportError, Result};
pub use invoice::{DocumentExtractor, RecordExtractor};
pub use models::config::ReportConfig;
pub use models::record::{DocumentKind, LineItemRecord, RecordKey};
pub use pdf::{PageSize, PdfTextLayer, Rect, TextLayer};
pub use rates::{EcbRateSource, ExchangeRateResolver, RateSource};
pub use workbook::merge::{MergeSummary, merge_into_workbook};
pub use workbook::synthesis::generate_workbook;
