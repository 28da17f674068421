pub mod context;
pub mod vm;

pub use context::{SessionContext, UiApp, UserProfile, build_session_context};
