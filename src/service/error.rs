use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{duplicate_field, ErrorMessage, HttpError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Parcel {0} not found")]
    ParcelNotFound(Uuid),

    #[error("Parcel with tracking id {0} not found")]
    TrackingIdNotFound(String),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Business-rule violation such as an ineligible status transition.
    #[error("{0}")]
    BadRequest(String),

    #[error("Parcel {0} was modified concurrently, please retry")]
    Conflict(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ParcelNotFound(_)
            | ServiceError::TrackingIdNotFound(_)
            | ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,

            ServiceError::Conflict(_) => StatusCode::CONFLICT,

            ServiceError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ServiceError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Database(_) | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorMessage> for ServiceError {
    fn from(message: ErrorMessage) -> Self {
        ServiceError::Other(message.to_string())
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();

        match error {
            ServiceError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                let field = duplicate_field(db.constraint());
                HttpError::unique_constraint_violation(format!("{field} already exists"))
                    .with_detail(error.to_string())
            }

            ServiceError::Database(sqlx::Error::RowNotFound) => {
                HttpError::not_found("Requested record was not found").with_detail(error.to_string())
            }

            ServiceError::Database(_) | ServiceError::Other(_) => {
                tracing::error!("{}", error);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
                    .with_detail(error.to_string())
            }

            ServiceError::ParcelNotFound(_) | ServiceError::TrackingIdNotFound(_) => {
                HttpError::new(ErrorMessage::ParcelNotFound.to_string(), status)
                    .with_detail(error.to_string())
            }

            ServiceError::UserNotFound(_) => {
                HttpError::new(ErrorMessage::UserNotFound.to_string(), status)
                    .with_detail(error.to_string())
            }

            ServiceError::Conflict(_) => HttpError::conflict(error.to_string()),

            ServiceError::Forbidden(_) | ServiceError::Unauthorized(_) | ServiceError::BadRequest(_) => {
                HttpError::new(error.to_string(), status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_errors_keep_their_status() {
        let err: HttpError = ServiceError::forbidden("Only the sender can cancel this parcel").into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "Only the sender can cancel this parcel");

        let err: HttpError = ServiceError::bad_request("Parcel is already cancelled").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: HttpError = ServiceError::Conflict(Uuid::nil()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_uses_generic_message() {
        let err: HttpError = ServiceError::ParcelNotFound(Uuid::new_v4()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Parcel Not Found");
        assert!(err.detail.is_some());
    }

    #[test]
    fn unclassified_errors_become_500() {
        let err: HttpError = ServiceError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, ErrorMessage::ServerError.to_string());

        let err: HttpError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
