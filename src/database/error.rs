use std::fmt::{self, Display};

use crate::error::{Error, HtmlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryErrorKind {
    Conflict,
    MissingReference,
    Constraint,
    Other,
}

/// Storage failure, converted into an [`Error`] before it reaches the caller.
#[derive(Debug)]
pub struct QueryError {
    info: String,
    kind: QueryErrorKind,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            kind: QueryErrorKind::Other,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => Self {
                info: format!("{e}"),
                kind: QueryErrorKind::Conflict,
            },
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => Self {
                info: format!("{e}"),
                kind: QueryErrorKind::MissingReference,
            },
            sqlx::Error::Database(e) if e.is_check_violation() => Self {
                info: format!("{e}"),
                kind: QueryErrorKind::Constraint,
            },
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::Conflict => {
                log::debug!("Unique constraint rejected a write: {}", value.info);
                HtmlError::InvalidRequest.new("Object already exists.")
            }
            QueryErrorKind::MissingReference => {
                log::debug!("Foreign key rejected a write: {}", value.info);
                HtmlError::NotFound.new("Referenced object does not exist.")
            }
            QueryErrorKind::Constraint => {
                log::debug!("Check constraint rejected a write: {}", value.info);
                HtmlError::InvalidRequest.default()
            }
            QueryErrorKind::Other => {
                log::error!("Query failed: {}", value.info);
                HtmlError::InternalServerError.default()
            }
        }
    }
}

/// Malformed query string or form value.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclassified_query_failure_is_internal() {
        let error: Error = QueryError::new(String::from("connection reset")).into();
        assert_eq!(error.code, 500);
    }

    #[test]
    fn missing_row_is_internal() {
        let error: Error = QueryError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(error.code, 500);
    }

    #[test]
    fn type_error_keeps_its_message() {
        let error: Error = TypeError::new("Invalid value for 'page'").into();
        assert_eq!(error.code, 400);
        assert_eq!(error.info.as_deref(), Some("Invalid value for 'page'"));
    }
}
