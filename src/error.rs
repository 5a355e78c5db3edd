use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    path::PathBuf,
};

use serde_json::json;
use warp::{
    http::StatusCode,
    reject::Reject,
    reply::{self, Response},
    Reply,
};

/// Per-field validation messages, keyed by payload field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error surfaced to the HTTP caller.
#[derive(Debug, Clone)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
    pub fields: Option<FieldErrors>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Unauthorized => 401,
            HtmlError::Forbidden => 403,
            HtmlError::NotFound => 404,
            HtmlError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
            fields: None,
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::Forbidden => "You do not have permission to perform this action.",
            HtmlError::NotFound => "Not found.",
            HtmlError::InternalServerError => "Internal server error.",
        };
        self.new(info)
    }
}

impl Error {
    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            code: 400,
            info: None,
            fields: Some(fields),
        }
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        add_field_error(&mut fields, field, message);
        Self::validation(fields)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn to_response(&self) -> Response {
        let body = match (&self.fields, &self.info) {
            (Some(fields), _) => json!(fields),
            (None, Some(info)) if self.code == 400 => json!({ "errors": info }),
            (None, Some(info)) => json!({ "detail": info }),
            (None, None) => json!({ "detail": self.status().canonical_reason().unwrap_or("") }),
        };

        reply::with_status(reply::json(&body), self.status()).into_response()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.info, &self.fields) {
            (Some(info), _) => write!(f, "{} ({})", self.code, info),
            (None, Some(fields)) => write!(f, "{} ({:?})", self.code, fields),
            (None, None) => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

impl Reject for Error {}

impl Reply for Error {
    fn into_response(self) -> Response {
        self.to_response()
    }
}

pub fn add_field_error(fields: &mut FieldErrors, field: &str, message: &str) {
    fields
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

/// Shopping list document could not be produced. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read font {path}: {source}")]
    FontFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to register font: {0}")]
    Font(String),

    #[error("failed to write document: {0}")]
    Document(String),
}

impl From<RenderError> for Error {
    fn from(value: RenderError) -> Self {
        log::error!("Shopping list rendering failed: {value}");
        HtmlError::InternalServerError.new("Could not render the shopping list.")
    }
}
