use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use print_layout::{PageLayout, PrintLayoutTransformer, PrintPage};
use shared::{
    calendar::CalendarConfiguration,
    domain::{CalendarId, CalendarReference},
    protocol::{SaveCalendarRequest, StoredCalendar},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    autosave::AutosaveTarget,
    error::SessionError,
    session::{EditSession, SessionSnapshot, SessionTransition},
    transport::CalendarTransport,
};

pub const DEFAULT_CALENDAR_NAME: &str = "My Calendar";

/// The in-memory calendar the view edits. Only its state at send time is
/// ever saved.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDocument {
    pub name: String,
    pub configuration: CalendarConfiguration,
}

impl Default for CalendarDocument {
    fn default() -> Self {
        Self {
            name: DEFAULT_CALENDAR_NAME.to_string(),
            configuration: CalendarConfiguration::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub calendar_id: CalendarId,
    pub first_save: bool,
}

#[derive(Debug, Clone)]
pub enum EditorEvent {
    SessionChanged(SessionSnapshot),
    PreviewUpdated { passthrough: bool },
    Saved { calendar_id: CalendarId },
    LoadFellBack { message: String },
    CopyFailed { message: String },
    SaveFailed { message: String },
}

struct ControllerState {
    session: EditSession,
    document: CalendarDocument,
    page: Option<PrintPage>,
}

pub struct SessionController {
    transport: Arc<dyn CalendarTransport>,
    transformer: PrintLayoutTransformer,
    state: Mutex<ControllerState>,
    copy_gate: Mutex<()>,
    events: broadcast::Sender<EditorEvent>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn CalendarTransport>, layout: PageLayout) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            transport,
            transformer: PrintLayoutTransformer::new(layout),
            state: Mutex::new(ControllerState {
                session: EditSession::default(),
                document: CalendarDocument::default(),
                page: None,
            }),
            copy_gate: Mutex::new(()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub async fn session(&self) -> EditSession {
        self.state.lock().await.session.clone()
    }

    pub async fn document(&self) -> CalendarDocument {
        self.state.lock().await.document.clone()
    }

    /// Does not schedule a save; the caller decides whether the edit counts
    /// as a mutation.
    pub async fn update_document<R>(&self, edit: impl FnOnce(&mut CalendarDocument) -> R) -> R {
        let mut guard = self.state.lock().await;
        edit(&mut guard.document)
    }

    pub async fn current_page(&self) -> Option<PrintPage> {
        self.state.lock().await.page.clone()
    }

    pub async fn current_svg(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .page
            .as_ref()
            .map(|page| page.svg.clone())
    }

    /// Resolves how the visit starts. A reference that fails to load falls
    /// back to a default calendar instead of blocking editing.
    pub async fn bootstrap(&self, reference: CalendarReference) -> Result<(), SessionError> {
        self.transition(SessionTransition::BeginBootstrap).await?;

        let resolved = match self.load_from_reference(&reference).await {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(error = %err, "session: reference did not resolve, using a default calendar");
                self.emit(EditorEvent::LoadFellBack {
                    message: err.to_string(),
                });
                false
            }
        };

        let outcome = if resolved {
            Ok(())
        } else {
            self.initialize_default().await
        };

        self.transition(SessionTransition::FinishBootstrap).await?;
        outcome
    }

    /// `Ok(false)` means there was nothing to resolve.
    pub async fn load_from_reference(
        &self,
        reference: &CalendarReference,
    ) -> Result<bool, SessionError> {
        match reference {
            CalendarReference::Calendar(calendar_id) => {
                let loaded = self
                    .transport
                    .fetch_calendar(calendar_id)
                    .await
                    .map_err(|source| SessionError::Load {
                        reference: format!("calendar {calendar_id}"),
                        source,
                    })?;

                let transition = if loaded.is_own_calendar {
                    SessionTransition::ResolveOwned(calendar_id.clone())
                } else {
                    SessionTransition::ResolveShared(calendar_id.clone())
                };
                let StoredCalendar {
                    name,
                    configuration,
                    svg,
                    ..
                } = loaded.calendar;
                self.install(Some(transition), name, configuration, svg)
                    .await?;

                info!(
                    calendar_id = %calendar_id,
                    own_calendar = loaded.is_own_calendar,
                    "session: loaded calendar"
                );
                Ok(true)
            }
            CalendarReference::Template(template_id) => {
                let load_error = |source| SessionError::Load {
                    reference: format!("template {template_id}"),
                    source,
                };
                let created = self
                    .transport
                    .create_from_template(template_id)
                    .await
                    .map_err(load_error)?;
                let Some(calendar_id) = created.id else {
                    return Err(load_error(anyhow!(
                        "template instantiation returned no calendar id"
                    )));
                };

                info!(
                    template_id = %template_id,
                    calendar_id = %calendar_id,
                    "session: instantiated template"
                );
                self.install(
                    Some(SessionTransition::ResolveOwned(calendar_id)),
                    created.name,
                    created.configuration,
                    Some(created.svg),
                )
                .await?;
                Ok(true)
            }
            CalendarReference::None => Ok(false),
        }
    }

    pub async fn initialize_default(&self) -> Result<(), SessionError> {
        let created = self
            .transport
            .create_default()
            .await
            .map_err(|source| SessionError::Load {
                reference: "default calendar".to_string(),
                source,
            })?;

        info!(
            calendar_id = ?created.id.as_ref().map(CalendarId::as_str),
            "session: started default calendar"
        );
        self.install(
            created.id.map(SessionTransition::ResolveOwned),
            created.name,
            created.configuration,
            Some(created.svg),
        )
        .await
    }

    /// Copy-on-write. A shared calendar is duplicated into the visitor's
    /// session before anything is written; other sessions pass straight
    /// through.
    pub async fn begin_edit(&self) -> Result<(), SessionError> {
        let _gate = self.copy_gate.lock().await;

        let Some(original) = self.session().await.original_calendar_id().cloned() else {
            return Ok(());
        };

        let copied = match self.transport.copy_to_session(&original).await {
            Ok(copied) => copied,
            Err(source) => {
                warn!(
                    original_calendar_id = %original,
                    error = %source,
                    "session: copy-on-write failed, calendar stays read-only"
                );
                self.emit(EditorEvent::CopyFailed {
                    message: source.to_string(),
                });
                return Err(SessionError::Copy { original, source });
            }
        };

        let snapshot = {
            let mut guard = self.state.lock().await;
            guard
                .session
                .apply(SessionTransition::CopiedToSession(copied.id.clone()))?;
            guard.session.snapshot()
        };
        info!(
            original_calendar_id = %original,
            calendar_id = %copied.id,
            "session: copied shared calendar into session"
        );
        self.emit(EditorEvent::SessionChanged(snapshot));
        Ok(())
    }

    /// Sends the document as it is right now. Upserts by id once one exists,
    /// otherwise creates the calendar and records its id.
    pub async fn persist_latest(&self) -> Result<SaveReceipt, SessionError> {
        let (calendar_id, request) = {
            let guard = self.state.lock().await;
            if let Some(original) = guard.session.original_calendar_id() {
                return Err(SessionError::NotCopied {
                    original: original.clone(),
                });
            }
            (
                guard.session.calendar_id().cloned(),
                SaveCalendarRequest {
                    configuration: guard.document.configuration.with_derived(),
                    name: guard.document.name.clone(),
                },
            )
        };

        let result = match &calendar_id {
            Some(id) => self
                .transport
                .autosave(id, &request)
                .await
                .map(|res| (id.clone(), Some(res.svg), false)),
            None => self
                .transport
                .save_new(&request)
                .await
                .map(|res| (res.id, res.svg, true)),
        };

        let (saved_id, svg, first_save) = match result {
            Ok(saved) => saved,
            Err(source) => {
                warn!(
                    calendar_id = ?calendar_id.as_ref().map(CalendarId::as_str),
                    error = %source,
                    "autosave: save failed, next edit retries"
                );
                self.emit(EditorEvent::SaveFailed {
                    message: source.to_string(),
                });
                return Err(SessionError::Save {
                    calendar_id,
                    source,
                });
            }
        };

        let page = svg.map(|svg| self.transformer.transform(&svg));
        let snapshot = {
            let mut guard = self.state.lock().await;
            if first_save {
                guard
                    .session
                    .apply(SessionTransition::FirstSaved(saved_id.clone()))?;
            }
            if let Some(page) = &page {
                guard.page = Some(page.clone());
            }
            guard.session.snapshot()
        };

        info!(calendar_id = %saved_id, first_save, "autosave: saved");
        self.emit(EditorEvent::Saved {
            calendar_id: saved_id.clone(),
        });
        if first_save {
            self.emit(EditorEvent::SessionChanged(snapshot));
        }
        if let Some(page) = page {
            self.emit(EditorEvent::PreviewUpdated {
                passthrough: page.is_passthrough(),
            });
        }

        Ok(SaveReceipt {
            calendar_id: saved_id,
            first_save,
        })
    }

    async fn install(
        &self,
        transition: Option<SessionTransition>,
        name: Option<String>,
        mut configuration: CalendarConfiguration,
        svg: Option<String>,
    ) -> Result<(), SessionError> {
        configuration.restore_events_from_derived();
        let page = svg.map(|svg| self.transformer.transform(&svg));
        let passthrough = page.as_ref().map(PrintPage::is_passthrough);

        let snapshot = {
            let mut guard = self.state.lock().await;
            if let Some(transition) = transition {
                guard.session.apply(transition)?;
            }
            guard.document = CalendarDocument {
                name: name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CALENDAR_NAME.to_string()),
                configuration,
            };
            guard.page = page;
            guard.session.snapshot()
        };

        self.emit(EditorEvent::SessionChanged(snapshot));
        if let Some(passthrough) = passthrough {
            self.emit(EditorEvent::PreviewUpdated { passthrough });
        }
        Ok(())
    }

    async fn transition(&self, transition: SessionTransition) -> Result<(), SessionError> {
        let snapshot = {
            let mut guard = self.state.lock().await;
            guard.session.apply(transition)?;
            guard.session.snapshot()
        };
        self.emit(EditorEvent::SessionChanged(snapshot));
        Ok(())
    }

    fn emit(&self, event: EditorEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AutosaveTarget for SessionController {
    async fn is_initializing(&self) -> bool {
        self.state.lock().await.session.is_initializing()
    }

    async fn begin_edit(&self) -> Result<(), SessionError> {
        SessionController::begin_edit(self).await
    }

    async fn persist_latest(&self) -> Result<SaveReceipt, SessionError> {
        SessionController::persist_latest(self).await
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
