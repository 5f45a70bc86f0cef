use shared::domain::CalendarId;
use thiserror::Error;

use crate::session::SessionTransitionError;

/// Everything here is scoped to one operation; the session stays usable.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load {reference}: {source}")]
    Load {
        reference: String,
        source: anyhow::Error,
    },
    #[error("failed to copy shared calendar {original} into this session: {source}")]
    Copy {
        original: CalendarId,
        source: anyhow::Error,
    },
    #[error("calendar {original} is shared and has not been copied into this session")]
    NotCopied { original: CalendarId },
    #[error("failed to save calendar: {source}")]
    Save {
        calendar_id: Option<CalendarId>,
        source: anyhow::Error,
    },
    #[error(transparent)]
    Transition(#[from] SessionTransitionError),
}

impl SessionError {
    /// Copy and save failures are retried by the next mutation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Copy { .. } | Self::Save { .. } | Self::NotCopied { .. }
        )
    }
}
