//! Edit-session core of the calendar editor: who owns the calendar being
//! edited, when it is saved, and what the preview shows.

pub mod autosave;
pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod session;
pub mod transport;

pub use autosave::{AutosaveScheduler, AutosaveTarget, FlushOutcome, SaveStatus};
pub use config::{load_settings, load_settings_from, EditorSettings};
pub use controller::{CalendarDocument, EditorEvent, SaveReceipt, SessionController};
pub use editor::{CalendarEditor, SessionPhase};
pub use error::SessionError;
pub use session::{EditSession, SessionSnapshot, SessionTransition, SessionTransitionError};
pub use transport::{CalendarTransport, HttpCalendarTransport};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
