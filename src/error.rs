use std::{fmt, sync::OnceLock};

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Debug details (`err`) are only rendered in development. Set once at
/// startup; later calls are ignored.
pub fn expose_error_details(enabled: bool) {
    if EXPOSE_DETAILS.set(enabled).is_err() {
        tracing::warn!("error detail exposure already configured");
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorSource {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "errorSources", skip_serializing_if = "Vec::is_empty", default)]
    pub error_sources: Vec<ErrorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(&self).unwrap_or_default())
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,
    InvalidToken,
    ServerError,
    EmailExist,
    UserNoLongerExist,
    TokenNotProvided,
    PermissionDenied,
    UserNotAuthenticated,
    InvalidIdentifier,
    ParcelNotFound,
    UserNotFound,
}

impl ToString for ErrorMessage {
    fn to_string(&self) -> String {
        self.to_str().to_owned()
    }
}

impl ErrorMessage {
    fn to_str(&self) -> String {
        match self {
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
            ErrorMessage::EmailExist => "User Already Exists".to_string(),
            ErrorMessage::UserNoLongerExist => "User belonging to this token no longer exists".to_string(),
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => format!("Password must not be more than {} characters", max_length),
            ErrorMessage::InvalidToken => "Authentication token is invalid or expired".to_string(),
            ErrorMessage::TokenNotProvided => "You are not logged in, please provide a token".to_string(),
            ErrorMessage::PermissionDenied => "You are not allowed to perform this action".to_string(),
            ErrorMessage::UserNotAuthenticated => "Authentication required. Please log in.".to_string(),
            ErrorMessage::InvalidIdentifier => "Invalid identifier. Please provide a valid id".to_string(),
            ErrorMessage::ParcelNotFound => "Parcel Not Found".to_string(),
            ErrorMessage::UserNotFound => "User Not Found".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub sources: Vec<ErrorSource>,
    pub detail: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
            sources: Vec::new(),
            detail: None,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::CONFLICT)
    }

    pub fn with_sources(mut self, sources: Vec<ErrorSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn into_http_response(self) -> Response {
        let expose = EXPOSE_DETAILS.get().copied().unwrap_or(false);
        self.render(expose)
    }

    fn render(self, expose: bool) -> Response {
        let json_response = Json(ErrorResponse {
            success: false,
            message: self.message.clone(),
            error_sources: self.sources,
            err: if expose { self.detail } else { None },
        });

        (self.status, json_response).into_response()
    }
}

/// Maps `validator` failures to one source per field.
pub fn validation_error(errors: &validator::ValidationErrors) -> HttpError {
    let mut sources: Vec<ErrorSource> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| ErrorSource {
                path: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    sources.sort_by(|a, b| a.path.cmp(&b.path));

    HttpError::bad_request("Validation Error")
        .with_sources(sources)
        .with_detail(errors.to_string())
}

/// Path identifiers that are not UUIDs surface as a cast error.
pub fn parse_id(raw: &str) -> Result<uuid::Uuid, HttpError> {
    uuid::Uuid::parse_str(raw).map_err(|e| {
        HttpError::bad_request(ErrorMessage::InvalidIdentifier.to_string())
            .with_detail(format!("{raw}: {e}"))
    })
}

/// Body extraction failures, rendered in the error envelope.
pub fn json_rejection(rejection: JsonRejection) -> HttpError {
    HttpError::new(rejection.body_text(), rejection.status())
}

/// Query string extraction failures.
pub fn query_rejection(rejection: QueryRejection) -> HttpError {
    HttpError::bad_request(rejection.body_text())
}

/// `users_email_key` -> `email`, `parcels_tracking_id_key` -> `tracking_id`.
pub fn duplicate_field(constraint: Option<&str>) -> String {
    let Some(name) = constraint else {
        return "value".to_string();
    };
    let trimmed = name.strip_suffix("_key").unwrap_or(name);
    for table in ["users_", "parcels_", "auth_providers_"] {
        if let Some(field) = trimmed.strip_prefix(table) {
            return field.to_string();
        }
    }
    trimmed.to_string()
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}
