use thiserror::Error as ThisError;

/// Cover-page field that extraction could not locate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Category,
    Title,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    InvalidArgument,
    InvalidGroup,
    InvalidLimit,
    DuplicateName,
    Extraction(MissingField),
    UnknownCategory,
    Storage,
    Closed,
    Internal,
}

#[derive(Debug, Clone, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error {
            kind,
            context: context.into(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Rejected input that retrying will never fix
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidArgument | ErrorKind::InvalidGroup | ErrorKind::InvalidLimit
        )
    }

    pub fn missing(field: MissingField) -> Self {
        let name = match field {
            MissingField::Category => "subject",
            MissingField::Title => "title/topic",
            MissingField::Question => "research question",
        };
        Error::new(
            ErrorKind::Extraction(field),
            format!("Invalid essay: no {} found", name),
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error {
            kind: ErrorKind::Storage,
            context: err.to_string(),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error {
            kind: ErrorKind::InvalidArgument,
            context: format!("Invalid pattern: {}", err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::InvalidArgument,
            context: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
