use std::sync::Arc;

use services::SessionLoopService;

/// The person taking the exam, as far as the screens care.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub display_name: String,
}

impl UserProfile {
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

pub trait UiApp: Send + Sync {
    fn user_profile(&self) -> Option<UserProfile>;

    fn session_loop(&self) -> Arc<SessionLoopService>;
}

/// Everything the session screens need from the outside, passed explicitly.
#[derive(Clone)]
pub struct SessionContext {
    user: Option<UserProfile>,
    session_loop: Arc<SessionLoopService>,
}

impl SessionContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            user: app.user_profile(),
            session_loop: app.session_loop(),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Display name with a neutral fallback for anonymous sessions.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.display_name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or("Guest")
    }

    /// The service every intent on the session screen goes through.
    #[must_use]
    pub fn session_loop(&self) -> &SessionLoopService {
        &self.session_loop
    }
}

// Provided by the composition root (`crates/app`).

/// Build a `SessionContext` from a UI-facing app implementation.
#[must_use]
pub fn build_session_context(app: &Arc<dyn UiApp>) -> SessionContext {
    SessionContext::new(app)
}
