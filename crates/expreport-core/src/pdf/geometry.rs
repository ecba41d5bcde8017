//! Proportional page layout.

use serde::{Deserialize, Serialize};

use crate::models::config::LayoutConfig;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A rectangle expressed as fractions of the page, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proportion {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Proportion {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// An absolute rectangle in points, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Rect {
    /// The whole page.
    pub fn full(page: PageSize) -> Self {
        Self {
            x0: 0.0,
            top: 0.0,
            x1: page.width,
            bottom: page.height,
        }
    }

    /// Whether a point lies inside the rectangle (edges included).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.top && y <= self.bottom
    }
}

/// The five named bands of the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Header,
    OrderedBy,
    InvoicedTo,
    Goods,
    Footer,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Header,
        Region::OrderedBy,
        Region::InvoicedTo,
        Region::Goods,
        Region::Footer,
    ];

    /// Proportion of this region in the given layout.
    pub fn proportion(self, layout: &LayoutConfig) -> Proportion {
        match self {
            Region::Header => layout.header,
            Region::OrderedBy => layout.ordered_by,
            Region::InvoicedTo => layout.invoiced_to,
            Region::Goods => layout.goods,
            Region::Footer => layout.footer,
        }
    }

    /// Absolute rectangle of this region on a page.
    pub fn rect(self, layout: &LayoutConfig, page: PageSize) -> Rect {
        region_rect(page, self.proportion(layout))
    }
}

/// Scale a proportional rectangle to a concrete page.
pub fn region_rect(page: PageSize, proportion: Proportion) -> Rect {
    Rect {
        x0: proportion.x0 * page.width,
        top: proportion.y0 * page.height,
        x1: proportion.x1 * page.width,
        bottom: proportion.y1 * page.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };

    #[test]
    fn test_region_rect_scales_each_edge() {
        let rect = region_rect(A4, Proportion::new(0.46, 0.16, 1.0, 0.54));
        assert!((rect.x0 - 273.7).abs() < 1e-9);
        assert!((rect.top - 134.72).abs() < 1e-9);
        assert_eq!(rect.x1, 595.0);
        assert!((rect.bottom - 454.68).abs() < 1e-9);
    }

    #[test]
    fn test_default_layout_tiles_the_page() {
        let layout = LayoutConfig::default();
        let header = Region::Header.rect(&layout, A4);
        let left = Region::OrderedBy.rect(&layout, A4);
        let right = Region::InvoicedTo.rect(&layout, A4);
        let goods = Region::Goods.rect(&layout, A4);
        let footer = Region::Footer.rect(&layout, A4);

        assert_eq!(header.bottom, left.top);
        assert_eq!(left.x1, right.x0);
        assert_eq!(left.bottom, goods.top);
        assert_eq!(goods.bottom, footer.top);
        assert_eq!(footer.bottom, A4.height);
    }

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::full(A4);
        assert!(rect.contains(0.0, 0.0));
        assert!(rect.contains(595.0, 842.0));
        assert!(!rect.contains(-0.1, 10.0));
    }
}
