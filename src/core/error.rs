use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilmErrorKind {
    Error,
    Warning,
    Io,
    VersionMismatch,
    GeometryMismatch,
}

#[derive(Debug, Clone)]
pub struct FilmError {
    pub kind: FilmErrorKind,
    pub message: String,
}

impl FilmError {
    pub fn error(msg: &str) -> Self {
        FilmError {
            kind: FilmErrorKind::Error,
            message: String::from(msg),
        }
    }

    pub fn warning(msg: &str) -> Self {
        FilmError {
            kind: FilmErrorKind::Warning,
            message: String::from(msg),
        }
    }

    pub fn version_mismatch(msg: &str) -> Self {
        FilmError {
            kind: FilmErrorKind::VersionMismatch,
            message: String::from(msg),
        }
    }

    pub fn geometry_mismatch(msg: &str) -> Self {
        FilmError {
            kind: FilmErrorKind::GeometryMismatch,
            message: String::from(msg),
        }
    }
}

impl fmt::Display for FilmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FilmError {}

impl From<std::io::Error> for FilmError {
    fn from(e: std::io::Error) -> Self {
        FilmError {
            kind: FilmErrorKind::Io,
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for FilmError {
    fn from(e: serde_json::Error) -> Self {
        FilmError {
            kind: FilmErrorKind::Io,
            message: e.to_string(),
        }
    }
}
