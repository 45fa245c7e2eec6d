use thiserror::Error;

pub type Result<T> = std::result::Result<T, FocusError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FocusError {
    #[error("remote store unreachable: {0}")]
    Connection(String),
    #[error("not authenticated: {0}")]
    Auth(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("remote store is missing collections: {0:?}")]
    MissingSchema(Vec<String>),
    #[error("unexpected response from remote store: {0}")]
    Protocol(String),
}

impl FocusError {
    /// Short machine-friendly tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Auth(_) => "auth",
            Self::Validation(_) => "validation",
            Self::Playback(_) => "playback",
            Self::MissingSchema(_) => "missing_schema",
            Self::Protocol(_) => "protocol",
        }
    }
}
