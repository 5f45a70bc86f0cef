use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type DisplaySettings = Map<String, Value>;

const RESERVED_KEYS: [&str; 3] = ["customEvents", "customDates", "eventTitles"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    pub id: Uuid,
    pub date: NaiveDate,
    pub emoji: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub show_title: bool,
    #[serde(default)]
    pub display_settings: DisplaySettings,
}

impl CustomEvent {
    pub fn new(date: NaiveDate, emoji: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            emoji: emoji.into(),
            title: title.into(),
            show_title: false,
            display_settings: DisplaySettings::new(),
        }
    }

    pub fn with_title_shown(mut self, show_title: bool) -> Self {
        self.show_title = show_title;
        self
    }

    fn date_key(&self) -> String {
        self.date.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDate {
    pub emoji: String,
    #[serde(default)]
    pub display_settings: DisplaySettings,
}

/// Calendar settings as stored by the backend.
///
/// Everything except the event list and its two derived maps is opaque and
/// round-trips untouched. `customDates` and `eventTitles` are only ever
/// produced by [`CalendarConfiguration::rebuild_derived`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConfiguration {
    #[serde(default)]
    custom_events: Vec<CustomEvent>,
    #[serde(default)]
    custom_dates: BTreeMap<String, CustomDate>,
    #[serde(default)]
    event_titles: BTreeMap<String, String>,
    #[serde(flatten)]
    settings: Map<String, Value>,
}

impl CalendarConfiguration {
    pub fn events(&self) -> &[CustomEvent] {
        &self.custom_events
    }

    pub fn custom_dates(&self) -> &BTreeMap<String, CustomDate> {
        &self.custom_dates
    }

    pub fn event_titles(&self) -> &BTreeMap<String, String> {
        &self.event_titles
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Returns `false` when `key` names one of the event fields.
    pub fn set_setting(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return false;
        }
        self.settings.insert(key, value);
        true
    }

    pub fn add_event(&mut self, event: CustomEvent) {
        self.custom_events.push(event);
    }

    pub fn update_event(&mut self, id: Uuid, edit: impl FnOnce(&mut CustomEvent)) -> bool {
        match self.custom_events.iter_mut().find(|event| event.id == id) {
            Some(event) => {
                edit(event);
                true
            }
            None => false,
        }
    }

    pub fn remove_event(&mut self, id: Uuid) -> bool {
        let before = self.custom_events.len();
        self.custom_events.retain(|event| event.id != id);
        self.custom_events.len() != before
    }

    /// Appends a holiday set, skipping any event whose exact date and title
    /// already exist. Returns how many events were inserted.
    pub fn insert_holiday_set(&mut self, holidays: impl IntoIterator<Item = CustomEvent>) -> usize {
        let mut seen: HashSet<(NaiveDate, String)> = self
            .custom_events
            .iter()
            .map(|event| (event.date, event.title.clone()))
            .collect();

        let mut inserted = 0;
        for holiday in holidays {
            if seen.insert((holiday.date, holiday.title.clone())) {
                self.custom_events.push(holiday);
                inserted += 1;
            }
        }
        inserted
    }

    /// Regenerates `customDates` and `eventTitles` from the event list. When
    /// several events share a date the later one in list order wins.
    pub fn rebuild_derived(&mut self) {
        self.custom_dates.clear();
        self.event_titles.clear();
        for event in &self.custom_events {
            let key = event.date_key();
            self.custom_dates.insert(
                key.clone(),
                CustomDate {
                    emoji: event.emoji.clone(),
                    display_settings: event.display_settings.clone(),
                },
            );
            if event.show_title && !event.title.is_empty() {
                self.event_titles.insert(key, event.title.clone());
            } else {
                self.event_titles.remove(&key);
            }
        }
    }

    pub fn with_derived(&self) -> Self {
        let mut built = self.clone();
        built.rebuild_derived();
        built
    }

    /// Older calendars only persisted the derived maps. Recover an event list
    /// from them so the calendar stays editable; dates that do not parse are
    /// dropped.
    pub fn restore_events_from_derived(&mut self) {
        if !self.custom_events.is_empty() {
            return;
        }
        for (date, entry) in &self.custom_dates {
            let Ok(parsed) = date.parse::<NaiveDate>() else {
                continue;
            };
            let title = self.event_titles.get(date).cloned();
            self.custom_events.push(CustomEvent {
                id: Uuid::new_v4(),
                date: parsed,
                emoji: entry.emoji.clone(),
                show_title: title.is_some(),
                title: title.unwrap_or_default(),
                display_settings: entry.display_settings.clone(),
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/calendar_tests.rs"]
mod tests;
