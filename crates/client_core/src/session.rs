use serde::Serialize;
use shared::domain::{CalendarId, Ownership};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Identity {
    Unsaved,
    Owned { calendar_id: CalendarId },
    ViewingShared { original_calendar_id: CalendarId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// Enter the load phase; identity resets to unsaved.
    BeginBootstrap,
    ResolveOwned(CalendarId),
    ResolveShared(CalendarId),
    FinishBootstrap,
    /// Copy-on-write of a shared calendar produced this owned id.
    CopiedToSession(CalendarId),
    /// First save of an unsaved session produced this id.
    FirstSaved(CalendarId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session transition {transition:?} is not valid from {from:?}")]
pub struct SessionTransitionError {
    pub from: Ownership,
    pub transition: SessionTransition,
}

/// Identity and ownership of the calendar being edited.
///
/// The ownership fields cannot be set independently. `ViewingShared` always
/// carries the original id and never a calendar id, and leaving it clears the
/// original id in the same step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    identity: Identity,
    is_initializing: bool,
}

impl Default for EditSession {
    fn default() -> Self {
        Self {
            identity: Identity::Unsaved,
            is_initializing: false,
        }
    }
}

impl EditSession {
    pub fn calendar_id(&self) -> Option<&CalendarId> {
        match &self.identity {
            Identity::Owned { calendar_id } => Some(calendar_id),
            Identity::Unsaved | Identity::ViewingShared { .. } => None,
        }
    }

    pub fn original_calendar_id(&self) -> Option<&CalendarId> {
        match &self.identity {
            Identity::ViewingShared {
                original_calendar_id,
            } => Some(original_calendar_id),
            Identity::Unsaved | Identity::Owned { .. } => None,
        }
    }

    pub fn ownership(&self) -> Ownership {
        match self.identity {
            Identity::Unsaved => Ownership::None,
            Identity::Owned { .. } => Ownership::Owned,
            Identity::ViewingShared { .. } => Ownership::ViewingShared,
        }
    }

    pub fn is_initializing(&self) -> bool {
        self.is_initializing
    }

    pub fn apply(&mut self, transition: SessionTransition) -> Result<(), SessionTransitionError> {
        match transition {
            SessionTransition::BeginBootstrap => {
                self.identity = Identity::Unsaved;
                self.is_initializing = true;
            }
            SessionTransition::FinishBootstrap => self.is_initializing = false,
            SessionTransition::ResolveOwned(calendar_id) => {
                self.identity = Identity::Owned { calendar_id };
            }
            SessionTransition::ResolveShared(original_calendar_id) => {
                self.identity = Identity::ViewingShared {
                    original_calendar_id,
                };
            }
            SessionTransition::CopiedToSession(calendar_id)
                if matches!(self.identity, Identity::ViewingShared { .. }) =>
            {
                self.identity = Identity::Owned { calendar_id };
            }
            SessionTransition::FirstSaved(calendar_id)
                if matches!(self.identity, Identity::Unsaved) =>
            {
                self.identity = Identity::Owned { calendar_id };
            }
            transition => {
                return Err(SessionTransitionError {
                    from: self.ownership(),
                    transition,
                })
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            calendar_id: self.calendar_id().cloned(),
            ownership: self.ownership(),
            original_calendar_id: self.original_calendar_id().cloned(),
            is_initializing: self.is_initializing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub calendar_id: Option<CalendarId>,
    pub ownership: Ownership,
    pub original_calendar_id: Option<CalendarId>,
    pub is_initializing: bool,
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
