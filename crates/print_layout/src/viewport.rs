use serde::{Deserialize, Serialize};

use crate::page::PageLayout;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self {
            min: 0.15,
            max: 1.0,
            step: 0.05,
        }
    }
}

impl ZoomBounds {
    pub fn is_valid(&self) -> bool {
        self.min > 0.0 && self.min <= self.max && self.step > 0.0
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.max(self.min).min(self.max)
    }
}

/// Initial zoom that fits the whole page width into `available_width_px`.
pub fn fit_zoom(available_width_px: f64, layout: &PageLayout, bounds: &ZoomBounds) -> f64 {
    bounds.clamp(available_width_px / layout.page_width())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RulerTick {
    pub index: u32,
    pub offset_px: f64,
    /// One-based inch number.
    pub label: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ruler {
    pub tick_size_px: f64,
    pub ticks: Vec<RulerTick>,
}

impl Ruler {
    fn new(inches: f64, units_per_inch: f64, zoom: f64) -> Self {
        let tick_size_px = units_per_inch * zoom;
        let count = inches.floor().max(0.0) as u32;
        let ticks = (0..count)
            .map(|index| RulerTick {
                index,
                offset_px: f64::from(index) * tick_size_px,
                label: index + 1,
            })
            .collect();
        Self {
            tick_size_px,
            ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rulers {
    pub bottom: Ruler,
    pub right: Ruler,
}

pub fn rulers(zoom: f64, layout: &PageLayout) -> Rulers {
    Rulers {
        bottom: Ruler::new(layout.page_width_in, layout.units_per_inch, zoom),
        right: Ruler::new(layout.page_height_in, layout.units_per_inch, zoom),
    }
}

/// On-screen preview state. Only the zoom factor is stored; rulers are
/// recomputed from it on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    layout: PageLayout,
    bounds: ZoomBounds,
    zoom: f64,
}

impl Viewport {
    pub fn new(layout: PageLayout, bounds: ZoomBounds, available_width_px: f64) -> Self {
        Self {
            layout,
            bounds,
            zoom: fit_zoom(available_width_px, &layout, &bounds),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom = self.bounds.clamp(self.zoom + self.bounds.step);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom = self.bounds.clamp(self.zoom - self.bounds.step);
        self.zoom
    }

    /// Recomputes from the current window width, not from a stored default.
    pub fn reset(&mut self, available_width_px: f64) -> f64 {
        self.zoom = fit_zoom(available_width_px, &self.layout, &self.bounds);
        self.zoom
    }

    pub fn rulers(&self) -> Rulers {
        rulers(self.zoom, &self.layout)
    }
}

#[cfg(test)]
#[path = "tests/viewport_tests.rs"]
mod tests;
