use std::{fs, path::Path, time::Duration};

use print_layout::{PageLayout, ZoomBounds};
use serde::Deserialize;
use tracing::warn;

use crate::autosave::DEFAULT_DEBOUNCE;

pub const SETTINGS_FILE: &str = "editor.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub api_base_url: String,
    pub autosave_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub initial_viewport_width_px: f64,
    pub page: PageLayout,
    pub zoom: ZoomBounds,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000/api".into(),
            autosave_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            request_timeout_secs: 30,
            initial_viewport_width_px: 1200.0,
            page: PageLayout::default(),
            zoom: ZoomBounds::default(),
        }
    }
}

impl EditorSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load_settings() -> EditorSettings {
    load_settings_from(Path::new(SETTINGS_FILE))
}

/// File values first, then environment overrides. A missing file means
/// defaults; a malformed one is reported and ignored. Page and zoom values
/// that cannot describe a printable page are rejected as a group.
pub fn load_settings_from(path: &Path) -> EditorSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<EditorSettings>(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config: ignoring malformed settings file");
                EditorSettings::default()
            }
        },
        Err(_) => EditorSettings::default(),
    };
    if !settings.page.is_printable() {
        warn!(page = ?settings.page, "config: settings file page has no printable area, using default page");
        settings.page = PageLayout::default();
    }
    if !settings.zoom.is_valid() {
        warn!(zoom = ?settings.zoom, "config: settings file zoom bounds are invalid, using defaults");
        settings.zoom = ZoomBounds::default();
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub(crate) fn apply_env_overrides(
    settings: &mut EditorSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("EDITOR_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = parsed(&lookup, "APP__AUTOSAVE_DEBOUNCE_MS") {
        settings.autosave_debounce_ms = v;
    }
    if let Some(v) = parsed(&lookup, "APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v;
    }

    let mut page = settings.page;
    if let Some(v) = parsed(&lookup, "APP__PAGE_WIDTH_IN") {
        page.page_width_in = v;
    }
    if let Some(v) = parsed(&lookup, "APP__PAGE_HEIGHT_IN") {
        page.page_height_in = v;
    }
    if let Some(v) = parsed(&lookup, "APP__MARGIN_IN") {
        page.margin_in = v;
    }
    if page.is_printable() {
        settings.page = page;
    } else {
        warn!(rejected = ?page, kept = ?settings.page, "config: page override leaves no printable area, ignored");
    }

    let mut zoom = settings.zoom;
    if let Some(v) = parsed(&lookup, "APP__ZOOM_MIN") {
        zoom.min = v;
    }
    if let Some(v) = parsed(&lookup, "APP__ZOOM_MAX") {
        zoom.max = v;
    }
    if zoom.is_valid() {
        settings.zoom = zoom;
    } else {
        warn!(rejected = ?zoom, kept = ?settings.zoom, "config: zoom override needs 0 < min <= max, ignored");
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|raw| raw.trim().parse::<T>().ok())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
