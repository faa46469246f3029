//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use playcaller_core::ModelName;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;

/// One offending request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub problem: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: problem.into(),
        }
    }
}

/// Error returned by any handler or middleware
#[derive(Debug)]
pub enum ApiError {
    /// One or more situational fields missing or wrong-typed
    InvalidInput(Vec<FieldError>),
    /// Body could not be read as a JSON object, or a request was rejected as malformed
    BadRequest(String),
    /// No guest marker and no valid credential
    Denied(String),
    /// Route or resource does not exist
    NotFound(String),
    /// Required model(s) failed to load at startup
    Unavailable { message: String, models: Vec<ModelName> },
    /// Serving defect, e.g. feature/model skew
    Defect(String),
}

impl ApiError {
    /// Category reported to clients and used as a metrics label
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::BadRequest(_) => "invalid_input",
            Self::Denied(_) => "denied",
            Self::NotFound(_) => "not_found",
            Self::Unavailable { .. } => "unavailable",
            Self::Defect(_) => "defect",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Denied(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Defect(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<playcaller_core::Error> for ApiError {
    fn from(err: playcaller_core::Error) -> Self {
        let models = err.missing_models();
        if !models.is_empty() {
            return ApiError::Unavailable {
                message: err.to_string(),
                models,
            };
        }

        if !err.is_defect() {
            error!("Unexpected inference error: {}", err);
        }
        ApiError::Defect(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UsernameTaken
            | AuthError::EmailTaken
            | AuthError::InvalidEmail(_)
            | AuthError::EmptyField(_) => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::UnknownUser => ApiError::Denied(err.to_string()),
            AuthError::Storage(_) | AuthError::Internal(_) => ApiError::Defect(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let category = self.category();
        metrics::counter!("playcaller_errors_total", "category" => category).increment(1);

        let body = match self {
            ApiError::InvalidInput(fields) => json!({
                "error": {
                    "category": category,
                    "message": "invalid request fields",
                    "fields": fields,
                }
            }),
            ApiError::Unavailable { message, models } => json!({
                "error": {
                    "category": category,
                    "message": message,
                    "models": models,
                }
            }),
            ApiError::BadRequest(message)
            | ApiError::Denied(message)
            | ApiError::NotFound(message)
            | ApiError::Defect(message) => json!({
                "error": {
                    "category": category,
                    "message": message,
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playcaller_core::Error;

    #[test]
    fn test_unavailable_maps_to_503() {
        let err: ApiError = Error::PartialModelUnavailable {
            models: vec![ModelName::Coverage],
        }
        .into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.category(), "unavailable");
    }

    #[test]
    fn test_shape_mismatch_maps_to_defect() {
        let err: ApiError = Error::FeatureShapeMismatch {
            model: ModelName::Offense,
            expected: vec![],
            actual: vec![],
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.category(), "defect");
    }

    #[test]
    fn test_bad_login_is_denied() {
        let err: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
