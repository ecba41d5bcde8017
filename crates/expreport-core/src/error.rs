//! Error types for the expreport-core library.

use thiserror::Error;

/// Main error type for the expreport library.
#[derive(Error, Debug)]
pub enum ReportError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Document field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Exchange rate lookup error.
    #[error("exchange rate error: {0}")]
    Rate(#[from] RateError),

    /// Workbook read/write error.
    #[error("workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to document field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document produced no usable text at all.
    #[error("no text found in document")]
    NoText,
}

/// Errors related to the exchange rate source.
#[derive(Error, Debug)]
pub enum RateError {
    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("rate source returned status {0}")]
    Status(u16),

    /// The response body could not be interpreted.
    #[error("malformed rate response: {0}")]
    Malformed(String),
}

/// Errors related to reading and writing workbooks.
#[derive(Error, Debug)]
pub enum WorkbookError {
    /// Writing the xlsx package failed.
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Reading an existing workbook failed.
    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::Error),

    /// Editing an existing workbook in place failed.
    #[error("failed to edit workbook: {0}")]
    Edit(String),

    /// The workbook has no worksheet to work on.
    #[error("workbook contains no worksheet")]
    NoWorksheet,

    /// The header row is missing one or more expected column labels.
    #[error("workbook header is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Rows of one VAT group are split across several runs.
    #[error("rows of VAT group {0:?} are not contiguous")]
    SplitGroup(String),

    /// Replacing the destination with the finished file failed.
    #[error("failed to replace {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for the expreport library.
pub type Result<T> = std::result::Result<T, ReportError>;
