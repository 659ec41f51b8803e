use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    InternalServerError(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
    AuthError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::DatabaseError(err) => write!(f, "Database Error: {}", err),
            ApiError::AuthError(msg) => write!(f, "Auth Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::Forbidden(_) => HttpResponse::Forbidden().json(error_response),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::DatabaseError(_) => HttpResponse::InternalServerError().json(error_response),
            ApiError::AuthError(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::InternalServerError(_) => HttpResponse::InternalServerError().json(error_response),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl ApiError {
    /// Message without the category prefix, as shown inline to the user.
    pub fn detail(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ValidationError(msg)
            | ApiError::AuthError(msg) => msg.clone(),
            ApiError::DatabaseError(err) => err.to_string(),
        }
    }

    pub fn medication_not_found(sap_code: i64) -> Self {
        ApiError::NotFound(format!("Medication with SAP code {} not found", sap_code))
    }

    pub fn method_not_found(method_id: i64) -> Self {
        ApiError::NotFound(format!("Repackaging method {} not found", method_id))
    }

    pub fn method_not_linked(sap_code: i64, method_id: i64) -> Self {
        ApiError::BadRequest(format!(
            "Repackaging method {} is not registered for medication SAP {}",
            method_id, sap_code
        ))
    }

    pub fn session_required() -> Self {
        ApiError::Unauthorized("An active session is required".to_string())
    }

    pub fn invalid_credentials() -> Self {
        ApiError::BadRequest("Invalid email or password".to_string())
    }

    pub fn email_already_registered(email: &str) -> Self {
        ApiError::BadRequest(format!("User with email '{}' already exists", email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_detail_strips_prefix() {
        let err = ApiError::BadRequest("duplicate key".to_string());
        assert_eq!(err.to_string(), "Bad Request: duplicate key");
        assert_eq!(err.detail(), "duplicate key");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::ValidationError("x".into()).error_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::session_required().error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::medication_not_found(1001).error_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_method_not_linked_message() {
        let err = ApiError::method_not_linked(1001, 7);
        assert_eq!(
            err.detail(),
            "Repackaging method 7 is not registered for medication SAP 1001"
        );
    }
}
