//! PDF processing module.

pub mod geometry;
mod text_layer;

pub use geometry::{PageSize, Proportion, Rect, Region, region_rect};
pub use text_layer::{PdfTextLayer, PlacedLine};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Access to the text layer of a document, one page and region at a time.
///
/// Pages are 1-indexed. Coordinates are in points with the origin at the
/// top-left corner of the page.
pub trait TextLayer {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Size of a page.
    fn page_size(&self, page: u32) -> Result<PageSize>;

    /// Plain text of every glyph whose centre lies inside `rect`, in reading order.
    fn region_text(&self, page: u32, rect: Rect) -> Result<String>;

    /// Plain text of a whole page.
    fn page_text(&self, page: u32) -> Result<String> {
        let size = self.page_size(page)?;
        self.region_text(page, Rect::full(size))
    }
}
