mod events;
mod exam_session;
mod history;
mod navigation;
mod snapshot;
mod store;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SessionError, SessionStoreError};
pub use events::SessionEvent;
pub use exam_session::ExamSession;
pub use history::{SessionHistoryService, SessionResultId, SessionResultListItem};
pub use navigation::{NavigationController, NavigationTile, TileCategory};
pub use snapshot::{SessionProgress, SessionSnapshot};
pub use store::{SessionPhase, SessionState, SessionStateStore};
pub use workflow::{FinalizedSession, SessionLoopService};
