use serde::{Deserialize, Serialize};

use crate::LayoutError;

/// Physical page description. Lengths are in inches and are converted to
/// content units with `units_per_inch` before any geometry is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLayout {
    pub page_width_in: f64,
    pub page_height_in: f64,
    pub margin_in: f64,
    pub units_per_inch: f64,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page_width_in: 35.0,
            page_height_in: 23.0,
            margin_in: 0.5,
            units_per_inch: 100.0,
        }
    }
}

impl PageLayout {
    pub fn page_width(&self) -> f64 {
        self.page_width_in * self.units_per_inch
    }

    pub fn page_height(&self) -> f64 {
        self.page_height_in * self.units_per_inch
    }

    pub fn margin(&self) -> f64 {
        self.margin_in * self.units_per_inch
    }

    pub fn printable_width(&self) -> f64 {
        self.page_width() - 2.0 * self.margin()
    }

    pub fn printable_height(&self) -> f64 {
        self.page_height() - 2.0 * self.margin()
    }

    /// Positive page size with a margin box that still has area left.
    pub fn is_printable(&self) -> bool {
        self.units_per_inch > 0.0
            && self.margin_in >= 0.0
            && self.printable_width() > 0.0
            && self.printable_height() > 0.0
    }

    /// Identity placement of a document that already covers the whole page.
    pub fn full_page(&self) -> Placement {
        Placement {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            scaled_width: self.page_width(),
            scaled_height: self.page_height(),
        }
    }

    /// Uniform scale-to-fit inside the margin box, centered horizontally and
    /// pinned to the top margin. Vertical slack always ends up at the bottom.
    pub fn place(&self, view_box: &ViewBox) -> Placement {
        let printable_width = self.printable_width();
        let printable_height = self.printable_height();
        let scale = (printable_width / view_box.width).min(printable_height / view_box.height);
        let scaled_width = view_box.width * scale;
        let scaled_height = view_box.height * scale;

        Placement {
            scale,
            offset_x: self.margin() + (printable_width - scaled_width) / 2.0,
            offset_y: self.margin(),
            scaled_width,
            scaled_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn parse(raw: &str) -> Result<Self, LayoutError> {
        let parts = raw
            .split(|c: char| c.is_ascii_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| LayoutError::InvalidViewBox(raw.to_string()))?;

        let &[x, y, width, height] = parts.as_slice() else {
            return Err(LayoutError::InvalidViewBox(raw.to_string()));
        };
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Err(LayoutError::InvalidViewBox(raw.to_string()));
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(LayoutError::EmptyViewBox { width, height });
        }

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scaled_width: f64,
    pub scaled_height: f64,
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
