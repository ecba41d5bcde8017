//! Positioned text extraction using lopdf and pdf-extract.

use std::path::Path;

use lopdf::Document;
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use tracing::{debug, trace};

use super::{PageSize, Rect, Result, TextLayer};
use crate::error::PdfError;

/// Vertical distance (points) under which two glyph baselines share a line.
const LINE_TOLERANCE: f64 = 3.0;

/// Horizontal gap, as a fraction of the font size, that counts as a word break.
const SPACE_RATIO: f64 = 0.25;

/// A single rendered glyph, in top-left page coordinates.
#[derive(Debug, Clone)]
struct Glyph {
    x: f64,
    baseline: f64,
    width: f64,
    size: f64,
    text: String,
}

impl Glyph {
    fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.baseline - self.size / 2.0)
    }

    fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone)]
struct Page {
    size: PageSize,
    glyphs: Vec<Glyph>,
}

/// A line of text at a known position, used to build a text layer without a PDF.
#[derive(Debug, Clone)]
pub struct PlacedLine {
    /// Page number (1-indexed).
    pub page: u32,
    /// Left edge of the first glyph.
    pub x: f64,
    /// Baseline, measured from the top of the page.
    pub baseline: f64,
    /// Font size; every glyph is laid out at half of it.
    pub font_size: f64,
    pub text: String,
}

impl PlacedLine {
    pub fn new(page: u32, x: f64, baseline: f64, text: impl Into<String>) -> Self {
        Self {
            page,
            x,
            baseline,
            font_size: 8.0,
            text: text.into(),
        }
    }
}

/// Text layer of a PDF, kept as positioned glyphs per page.
#[derive(Debug, Clone)]
pub struct PdfTextLayer {
    pages: Vec<Page>,
}

impl PdfTextLayer {
    /// Load a PDF from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| PdfError::Parse(e.to_string()))?;
        Self::from_bytes(&data)
    }

    /// Load a PDF from memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        if doc.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut collector = GlyphCollector::default();
        pdf_extract::output_doc(&doc, &mut collector)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        let pages = collector.finish();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!(
            "Loaded text layer: {} pages, {} glyphs",
            pages.len(),
            pages.iter().map(|p| p.glyphs.len()).sum::<usize>()
        );
        Ok(Self { pages })
    }

    /// Build a text layer from pre-positioned lines. Every page gets `size`.
    pub fn from_lines(size: PageSize, page_count: u32, lines: &[PlacedLine]) -> Self {
        let mut pages: Vec<Page> = (0..page_count)
            .map(|_| Page {
                size,
                glyphs: Vec::new(),
            })
            .collect();

        for line in lines {
            let Some(page) = line.page.checked_sub(1).and_then(|i| pages.get_mut(i as usize))
            else {
                continue;
            };
            let advance = line.font_size / 2.0;
            for (i, ch) in line.text.chars().enumerate() {
                page.glyphs.push(Glyph {
                    x: line.x + advance * i as f64,
                    baseline: line.baseline,
                    width: advance,
                    size: line.font_size,
                    text: ch.to_string(),
                });
            }
        }

        Self { pages }
    }

    fn page(&self, page: u32) -> Result<&Page> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(PdfError::InvalidPage(page))
    }
}

impl TextLayer for PdfTextLayer {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        Ok(self.page(page)?.size)
    }

    fn region_text(&self, page: u32, rect: Rect) -> Result<String> {
        let page = self.page(page)?;
        let inside: Vec<&Glyph> = page
            .glyphs
            .iter()
            .filter(|g| {
                let (x, y) = g.center();
                rect.contains(x, y)
            })
            .collect();

        trace!("{} glyphs inside {:?}", inside.len(), rect);
        Ok(assemble_lines(inside))
    }
}

/// Group glyphs into lines by baseline, order each line left to right and
/// insert a single space wherever the horizontal gap looks like a word break.
fn assemble_lines(mut glyphs: Vec<&Glyph>) -> String {
    glyphs.sort_by(|a, b| a.baseline.total_cmp(&b.baseline));

    let mut lines: Vec<Vec<&Glyph>> = Vec::new();
    for glyph in glyphs {
        match lines.last_mut() {
            Some(line) if (glyph.baseline - line[0].baseline).abs() <= LINE_TOLERANCE => {
                line.push(glyph)
            }
            _ => lines.push(vec![glyph]),
        }
    }

    let mut rendered = Vec::with_capacity(lines.len());
    for mut line in lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));

        let mut text = String::new();
        let mut previous: Option<&Glyph> = None;
        for glyph in line {
            if let Some(prev) = previous {
                let gap = glyph.x - prev.right();
                if gap > prev.size.max(glyph.size) * SPACE_RATIO && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            if glyph.text.trim().is_empty() {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
            } else {
                text.push_str(&glyph.text);
            }
            previous = Some(glyph);
        }

        let text = text.trim_end();
        if !text.is_empty() {
            rendered.push(text.to_string());
        }
    }

    rendered.join("\n")
}

/// Receives glyphs from the pdf-extract content stream interpreter.
#[derive(Default)]
struct GlyphCollector {
    pages: Vec<Page>,
    current: Option<Page>,
    top: f64,
    left: f64,
}

impl GlyphCollector {
    fn finish(mut self) -> Vec<Page> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.pages
    }
}

impl OutputDev for GlyphCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.top = media_box.ury;
        self.left = media_box.llx;
        self.current = Some(Page {
            size: PageSize::new(media_box.urx - media_box.llx, media_box.ury - media_box.lly),
            glyphs: Vec::new(),
        });
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> std::result::Result<(), OutputError> {
        let Some(page) = self.current.as_mut() else {
            return Ok(());
        };

        let scale_x = (trm.m11 * trm.m11 + trm.m12 * trm.m12).sqrt();
        let scale_y = (trm.m21 * trm.m21 + trm.m22 * trm.m22).sqrt();
        let size = font_size * scale_y;

        page.glyphs.push(Glyph {
            x: trm.m31 - self.left,
            baseline: self.top - trm.m32,
            width: width * font_size * scale_x,
            size,
            text: char.to_string(),
        });
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }
}
