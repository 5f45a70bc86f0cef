use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CalendarId, TemplateId},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        AutosaveResponse, CopyToSessionResponse, LoadCalendarResponse, SaveCalendarRequest,
        SaveNewResponse, SessionCalendarResponse,
    },
};
use tracing::debug;
use url::Url;

/// Backend boundary of the edit session. The backend renders SVG and keeps
/// the session identity in a cookie.
#[async_trait]
pub trait CalendarTransport: Send + Sync {
    async fn create_default(&self) -> Result<SessionCalendarResponse>;
    async fn create_from_template(&self, template_id: &TemplateId)
        -> Result<SessionCalendarResponse>;
    async fn fetch_calendar(&self, calendar_id: &CalendarId) -> Result<LoadCalendarResponse>;
    async fn copy_to_session(&self, calendar_id: &CalendarId) -> Result<CopyToSessionResponse>;
    async fn autosave(
        &self,
        calendar_id: &CalendarId,
        request: &SaveCalendarRequest,
    ) -> Result<AutosaveResponse>;
    async fn save_new(&self, request: &SaveCalendarRequest) -> Result<SaveNewResponse>;
}

pub struct HttpCalendarTransport {
    http: Client,
    base_url: Url,
}

impl HttpCalendarTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid calendar api base url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("calendar api base url '{base_url}' cannot be a base"));
        }
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .with_context(|| format!("invalid {what} response body"));
    }

    let body = response.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body
        };
        ApiError::new(ErrorCode::from_status(status.as_u16()), message)
    });
    Err(ApiException::from(error)).with_context(|| format!("{what} request failed with {status}"))
}

#[async_trait]
impl CalendarTransport for HttpCalendarTransport {
    async fn create_default(&self) -> Result<SessionCalendarResponse> {
        let url = self.endpoint(&["session-calendar", "new"]);
        debug!(path = url.path(), "transport: create default calendar");
        let res = self.http.post(url).send().await?;
        decode(res, "create default calendar").await
    }

    async fn create_from_template(
        &self,
        template_id: &TemplateId,
    ) -> Result<SessionCalendarResponse> {
        let url = self.endpoint(&["session-calendar", "from-template", template_id.as_str()]);
        debug!(path = url.path(), "transport: instantiate template");
        let res = self.http.post(url).send().await?;
        decode(res, "instantiate template").await
    }

    async fn fetch_calendar(&self, calendar_id: &CalendarId) -> Result<LoadCalendarResponse> {
        let url = self.endpoint(&["session-calendar", calendar_id.as_str()]);
        debug!(path = url.path(), "transport: fetch calendar");
        let res = self.http.get(url).send().await?;
        decode(res, "fetch calendar").await
    }

    async fn copy_to_session(&self, calendar_id: &CalendarId) -> Result<CopyToSessionResponse> {
        let url = self.endpoint(&["session-calendar", calendar_id.as_str(), "copy-to-session"]);
        debug!(path = url.path(), "transport: copy calendar to session");
        let res = self.http.post(url).send().await?;
        decode(res, "copy to session").await
    }

    async fn autosave(
        &self,
        calendar_id: &CalendarId,
        request: &SaveCalendarRequest,
    ) -> Result<AutosaveResponse> {
        let url = self.endpoint(&["session-calendar", calendar_id.as_str(), "autosave"]);
        debug!(path = url.path(), "transport: autosave");
        let res = self.http.put(url).json(request).send().await?;
        decode(res, "autosave").await
    }

    async fn save_new(&self, request: &SaveCalendarRequest) -> Result<SaveNewResponse> {
        let url = self.endpoint(&["session-calendar", "save"]);
        debug!(path = url.path(), "transport: first save");
        let res = self.http.post(url).json(request).send().await?;
        decode(res, "save").await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
