use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("A request is already in progress")]
    InFlight,
    #[error("verification flow closed")]
    Cancelled,
}

impl FlowError {
    /// HTTP status of a server rejection.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text for the inline message region, falling back to `fallback` when
    /// the error carries nothing readable.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
