//! Invoice field extraction module.

pub mod apportion;
mod extractor;
pub mod rules;

pub use apportion::{Apportioned, apportion};
pub use extractor::DocumentExtractor;

use std::path::Path;

use crate::models::record::LineItemRecord;

/// Turns one document into report records.
pub trait RecordExtractor: Sync {
    /// Extract every line item of the document at `path`.
    fn extract_path(&self, path: &Path) -> crate::Result<Vec<LineItemRecord>>;
}
