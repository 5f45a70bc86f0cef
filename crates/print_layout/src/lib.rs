//! Page geometry for printing rendered calendars.
//!
//! Converts a backend-rendered SVG with an arbitrary `viewBox` into a fixed
//! physical page with margins, and derives the zoom and ruler geometry of the
//! on-screen preview. Everything here is pure.

use thiserror::Error;

mod page;
mod transform;
mod viewport;

pub use page::{PageLayout, Placement, ViewBox};
pub use transform::{PrintLayoutTransformer, PrintPage};
pub use viewport::{fit_zoom, rulers, Ruler, RulerTick, Rulers, Viewport, ZoomBounds};

/// Reasons a source document is passed through instead of margin-corrected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("document has no <svg> root element")]
    MissingRoot,
    #[error("<svg> root element is never closed")]
    UnclosedRoot,
    #[error("<svg> root element has no viewBox")]
    MissingViewBox,
    #[error("unparseable viewBox '{0}'")]
    InvalidViewBox(String),
    #[error("viewBox has non-positive extent {width}x{height}")]
    EmptyViewBox { width: f64, height: f64 },
    #[error("malformed markup: {0}")]
    Xml(String),
}
