use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use shared::{
    calendar::CalendarConfiguration,
    domain::{CalendarId, TemplateId},
    protocol::{
        AutosaveResponse, CopyToSessionResponse, LoadCalendarResponse, SaveCalendarRequest,
        SaveNewResponse, SessionCalendarResponse, StoredCalendar,
    },
};
use tokio::sync::Semaphore;

use crate::transport::CalendarTransport;

pub(crate) const RENDERED_SVG: &str = r#"<svg viewBox="0 0 1000 700"><text>loaded</text></svg>"#;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateDefault,
    FromTemplate(String),
    Fetch(String),
    Copy(String),
    Autosave(String, SaveCalendarRequest),
    SaveNew(SaveCalendarRequest),
}

impl Call {
    pub(crate) fn is_save(&self) -> bool {
        matches!(self, Call::Autosave(..) | Call::SaveNew(..))
    }
}

/// In-process backend. Flags flip behaviour per test; every call is recorded
/// before it can block on `save_gate`.
pub(crate) struct FakeTransport {
    pub calls: Mutex<Vec<Call>>,
    pub own_calendar: AtomicBool,
    pub default_has_id: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fail_default: AtomicBool,
    pub fail_copy: AtomicBool,
    pub copy_delay_ms: AtomicU64,
    pub fail_saves: AtomicUsize,
    pub stored_configuration: Mutex<CalendarConfiguration>,
    pub save_gate: Option<Arc<Semaphore>>,
    next_id: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            own_calendar: AtomicBool::new(true),
            default_has_id: AtomicBool::new(true),
            fail_fetch: AtomicBool::new(false),
            fail_default: AtomicBool::new(false),
            fail_copy: AtomicBool::new(false),
            copy_delay_ms: AtomicU64::new(0),
            fail_saves: AtomicUsize::new(0),
            stored_configuration: Mutex::new(
                serde_json::from_value(json!({ "theme": "classic" })).expect("configuration"),
            ),
            save_gate: None,
            next_id: AtomicUsize::new(1),
        }
    }

    pub(crate) fn shared() -> Self {
        let transport = Self::new();
        transport.own_calendar.store(false, Ordering::SeqCst);
        transport
    }

    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.save_gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn saves(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_save).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls").push(call);
    }

    fn next_id(&self, prefix: &str) -> CalendarId {
        CalendarId(format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn take_save_failure(&self) -> bool {
        self.fail_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.save_gate {
            gate.acquire().await.expect("gate").forget();
        }
    }

    fn rendered(name: &str) -> String {
        format!(r#"<svg viewBox="0 0 1000 700"><text>{name}</text></svg>"#)
    }
}

#[async_trait]
impl CalendarTransport for FakeTransport {
    async fn create_default(&self) -> Result<SessionCalendarResponse> {
        self.record(Call::CreateDefault);
        if self.fail_default.load(Ordering::SeqCst) {
            return Err(anyhow!("renderer unavailable"));
        }
        let id = self
            .default_has_id
            .load(Ordering::SeqCst)
            .then(|| self.next_id("default"));
        Ok(SessionCalendarResponse {
            id,
            name: None,
            configuration: self.stored_configuration.lock().expect("configuration").clone(),
            svg: RENDERED_SVG.to_string(),
        })
    }

    async fn create_from_template(
        &self,
        template_id: &TemplateId,
    ) -> Result<SessionCalendarResponse> {
        self.record(Call::FromTemplate(template_id.to_string()));
        Ok(SessionCalendarResponse {
            id: Some(self.next_id("template")),
            name: Some("Moon phases".to_string()),
            configuration: self.stored_configuration.lock().expect("configuration").clone(),
            svg: RENDERED_SVG.to_string(),
        })
    }

    async fn fetch_calendar(&self, calendar_id: &CalendarId) -> Result<LoadCalendarResponse> {
        self.record(Call::Fetch(calendar_id.to_string()));
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset"));
        }
        Ok(LoadCalendarResponse {
            calendar: StoredCalendar {
                id: calendar_id.clone(),
                name: Some("Family 2026".to_string()),
                configuration: self.stored_configuration.lock().expect("configuration").clone(),
                svg: Some(RENDERED_SVG.to_string()),
            },
            is_own_calendar: self.own_calendar.load(Ordering::SeqCst),
        })
    }

    async fn copy_to_session(&self, calendar_id: &CalendarId) -> Result<CopyToSessionResponse> {
        self.record(Call::Copy(calendar_id.to_string()));
        let delay = self.copy_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(anyhow!("copy refused"));
        }
        Ok(CopyToSessionResponse {
            id: self.next_id("copy"),
        })
    }

    async fn autosave(
        &self,
        calendar_id: &CalendarId,
        request: &SaveCalendarRequest,
    ) -> Result<AutosaveResponse> {
        self.record(Call::Autosave(calendar_id.to_string(), request.clone()));
        self.wait_for_gate().await;
        if self.take_save_failure() {
            return Err(anyhow!("database locked"));
        }
        Ok(AutosaveResponse {
            svg: Self::rendered(&request.name),
        })
    }

    async fn save_new(&self, request: &SaveCalendarRequest) -> Result<SaveNewResponse> {
        self.record(Call::SaveNew(request.clone()));
        self.wait_for_gate().await;
        if self.take_save_failure() {
            return Err(anyhow!("database locked"));
        }
        Ok(SaveNewResponse {
            id: self.next_id("saved"),
            svg: Some(Self::rendered(&request.name)),
        })
    }
}
