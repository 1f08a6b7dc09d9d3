use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by the experiment and analysis halves.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("incomplete data: {0}")]
    IncompleteData(String),
    #[error("fit did not converge: {0}")]
    FitConvergence(String),
    #[error("session log row {row}: {reason}")]
    InputIntegrity { row: usize, reason: String },
    /// A single value failed to decode outside of any log row.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("session log i/o: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    IncompleteData,
    FitConvergence,
    InputIntegrity,
    Io,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn incomplete(msg: impl Into<String>) -> Self {
        Error::IncompleteData(msg.into())
    }

    pub fn fit(msg: impl Into<String>) -> Self {
        Error::FitConvergence(msg.into())
    }

    pub fn integrity(row: usize, reason: impl Into<String>) -> Self {
        Error::InputIntegrity {
            row,
            reason: reason.into(),
        }
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Error::InvalidValue(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::IncompleteData(_) => ErrorKind::IncompleteData,
            Error::FitConvergence(_) => ErrorKind::FitConvergence,
            Error::InputIntegrity { .. } | Error::InvalidValue(_) => ErrorKind::InputIntegrity,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}
