use serde::{Deserialize, Serialize};

use crate::{calendar::CalendarConfiguration, domain::CalendarId};

/// Response of `POST /session-calendar/new` and
/// `POST /session-calendar/from-template/{templateId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCalendarResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CalendarId>,
    #[serde(default)]
    pub name: Option<String>,
    pub configuration: CalendarConfiguration,
    pub svg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCalendar {
    pub id: CalendarId,
    #[serde(default)]
    pub name: Option<String>,
    pub configuration: CalendarConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
}

/// Response of `GET /session-calendar/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCalendarResponse {
    pub calendar: StoredCalendar,
    pub is_own_calendar: bool,
}

/// Response of `POST /session-calendar/{id}/copy-to-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyToSessionResponse {
    pub id: CalendarId,
}

/// Body of both `PUT /session-calendar/{id}/autosave` and
/// `POST /session-calendar/save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCalendarRequest {
    pub configuration: CalendarConfiguration,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveResponse {
    pub svg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveNewResponse {
    pub id: CalendarId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
}
