/// Failures raised by engine operations before any mutation takes place.
///
/// Per-row problems inside a batch never surface here; they are tallied as
/// skipped rows instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("{what} is empty")]
    EmptyInput { what: &'static str },

    #[error("set the active session before appending")]
    NoSession,

    #[error("invalid course: {0}")]
    InvalidCourse(String),

    #[error("invalid credits: {0}")]
    InvalidCredits(String),

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("invalid intake: {0}")]
    InvalidIntake(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput { .. } => "empty_input",
            Self::NoSession => "no_session",
            Self::InvalidCourse(_) => "invalid_course",
            Self::InvalidCredits(_) => "invalid_credits",
            Self::InvalidSession(_) => "invalid_session",
            Self::InvalidIntake(_) => "invalid_intake",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
