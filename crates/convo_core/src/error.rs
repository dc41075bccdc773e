use thiserror::Error;

/// Errors raised by the numerical core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The sample grid cannot support integration (too short, unordered, non-finite).
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A signal (or surface function) produced an undefined value.
    #[error("{signal} evaluated to {value} at t = {time}")]
    Evaluation {
        signal: String,
        time: f64,
        value: f64,
    },

    /// A settings struct failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl Error {
    pub(crate) fn grid(message: impl Into<String>) -> Self {
        Error::InvalidGrid(message.into())
    }

    pub(crate) fn settings(message: impl Into<String>) -> Self {
        Error::InvalidSettings(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
