use std::sync::Arc;

use anyhow::Result;
use print_layout::{Rulers, Viewport};
use shared::domain::{CalendarReference, Ownership};
use tokio::sync::{broadcast, Mutex};

use crate::{
    autosave::{AutosaveScheduler, FlushOutcome, SaveStatus},
    config::EditorSettings,
    controller::{CalendarDocument, EditorEvent, SessionController},
    error::SessionError,
    session::EditSession,
    transport::{CalendarTransport, HttpCalendarTransport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Editing(Ownership),
    SavePending,
    SaveFailed,
}

/// What a calendar-editing view binds to: one session, its autosave
/// scheduler, and the preview viewport.
pub struct CalendarEditor {
    controller: Arc<SessionController>,
    scheduler: Arc<AutosaveScheduler>,
    viewport: Mutex<Viewport>,
}

impl CalendarEditor {
    pub fn new(transport: Arc<dyn CalendarTransport>, settings: &EditorSettings) -> Self {
        let controller = SessionController::new(transport, settings.page);
        let scheduler = AutosaveScheduler::new(controller.clone(), settings.debounce());
        let viewport = Viewport::new(settings.page, settings.zoom, settings.initial_viewport_width_px);
        Self {
            controller,
            scheduler,
            viewport: Mutex::new(viewport),
        }
    }

    pub fn connect(settings: &EditorSettings) -> Result<Self> {
        let transport = HttpCalendarTransport::new(&settings.api_base_url, settings.request_timeout())?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub async fn open(&self, reference: CalendarReference) -> Result<(), SessionError> {
        self.controller.bootstrap(reference).await
    }

    /// Applies a view edit and schedules the autosave for it.
    pub async fn update_document<R>(&self, edit: impl FnOnce(&mut CalendarDocument) -> R) -> R {
        let result = self.controller.update_document(edit).await;
        self.scheduler.notify_mutation().await;
        result
    }

    pub async fn notify_mutation(&self) {
        self.scheduler.notify_mutation().await;
    }

    pub async fn flush(&self) -> Result<FlushOutcome, SessionError> {
        self.scheduler.flush().await
    }

    pub async fn session(&self) -> EditSession {
        self.controller.session().await
    }

    pub async fn document(&self) -> CalendarDocument {
        self.controller.document().await
    }

    pub async fn current_svg(&self) -> Option<String> {
        self.controller.current_svg().await
    }

    pub async fn phase(&self) -> SessionPhase {
        let session = self.controller.session().await;
        if session.is_initializing() {
            return SessionPhase::Bootstrapping;
        }
        match self.scheduler.status().await {
            SaveStatus::Pending | SaveStatus::InFlight => SessionPhase::SavePending,
            SaveStatus::Failed => SessionPhase::SaveFailed,
            SaveStatus::Idle => SessionPhase::Editing(session.ownership()),
        }
    }

    pub async fn zoom(&self) -> f64 {
        self.viewport.lock().await.zoom()
    }

    pub async fn zoom_in(&self) -> f64 {
        self.viewport.lock().await.zoom_in()
    }

    pub async fn zoom_out(&self) -> f64 {
        self.viewport.lock().await.zoom_out()
    }

    pub async fn reset_zoom(&self, available_width_px: f64) -> f64 {
        self.viewport.lock().await.reset(available_width_px)
    }

    pub async fn rulers(&self) -> Rulers {
        self.viewport.lock().await.rulers()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EditorEvent> {
        self.controller.subscribe_events()
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
