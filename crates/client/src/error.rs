//! Error taxonomy shared by the repository client and the session controller.

/// Everything a scene operation can fail with.
///
/// `Validation` and `Precondition` are raised locally and never reach the
/// network. `Network` covers transport problems (unreachable host, timeout,
/// malformed body). `Server` and `NotFound` carry the backend's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Local input problem (empty name, empty selection, ...).
    #[error("{0}")]
    Validation(String),

    /// Operation invoked in the wrong session state.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with `success: false`.
    #[error("{0}")]
    Server(String),

    /// The server does not know the requested scene.
    #[error("{0}")]
    NotFound(String),
}

impl SessionError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Validation(msg) | SessionError::Server(msg) | SessionError::NotFound(msg) => {
                msg.clone()
            }
            SessionError::Precondition(_) => {
                "This action is not available right now. Make sure a scene is loaded and try again."
                    .to_string()
            }
            SessionError::Network(_) => {
                "Could not reach the scene server. Check your connection and that the server is running, then try again."
                    .to_string()
            }
        }
    }

    /// Re-issuing the same call may succeed without changing the input.
    pub fn is_retriable(&self) -> bool {
        matches!(self, SessionError::Network(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Validation(_) => "validation",
            SessionError::Precondition(_) => "precondition",
            SessionError::Network(_) => "network",
            SessionError::Server(_) => "server",
            SessionError::NotFound(_) => "not_found",
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
