#![forbid(unsafe_code)]

pub mod error;
pub mod results_client;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use error::{ResultsClientError, SessionError, SessionStoreError};
pub use results_client::{ResultPayload, ResultSubmitter, ResultsClient, ResultsClientConfig};

pub use sessions::{
    ExamSession, FinalizedSession, NavigationController, NavigationTile, SessionEvent,
    SessionHistoryService, SessionLoopService, SessionPhase, SessionProgress, SessionResultId,
    SessionResultListItem, SessionSnapshot, SessionState, SessionStateStore, TileCategory,
};
