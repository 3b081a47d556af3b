use rusqlite::ffi;
use thiserror::Error;

/// Failures raised by database operations.
///
/// `Validation`, `NotFound` and `Forbidden` are caller-correctable and carry
/// a message fit to show the client. The rest are internal faults.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Storage-level constraint kinds we translate into validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Unique,
    Check,
    ForeignKey,
}

pub fn constraint_violation(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(Constraint::Unique)
                }
                ffi::SQLITE_CONSTRAINT_CHECK => Some(Constraint::Check),
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Map a rusqlite error to `Validation(message)` when it is a violation of
/// one of `kinds`, otherwise pass it through.
pub(crate) fn on_constraint(err: rusqlite::Error, kinds: &[Constraint], message: &str) -> Error {
    match constraint_violation(&err) {
        Some(kind) if kinds.contains(&kind) => Error::Validation(message.to_string()),
        _ => Error::Sqlite(err),
    }
}
