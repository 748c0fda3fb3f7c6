//! Error taxonomy for the auth endpoints.
//!
//! Validation and rate-limit conditions are expected outcomes returned as
//! structured results; only storage and mail failures surface as 500, and
//! their detail stays in the server logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// JSON body for every error response. `field` lets a form highlight the
/// offending input; `redirect` tells the client where to restart a flow.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

#[derive(Debug)]
pub enum AuthError {
    /// Malformed or missing input; 400 with an optional field hint.
    Validation {
        message: String,
        field: Option<&'static str>,
        redirect: Option<&'static str>,
    },
    /// Bad credentials; deliberately does not say which part was wrong.
    InvalidCredentials,
    /// Missing, malformed, or expired bearer token.
    InvalidToken,
    /// Too many OTP sends or a blocked login key.
    RateLimited {
        message: String,
        retry_after_seconds: u64,
    },
    /// Duplicate registration.
    Conflict { message: &'static str },
    /// Resource referenced by a valid token no longer exists.
    NotFound { message: &'static str },
    /// Storage or mail dependency failed; detail is logged, not echoed.
    Dependency { message: &'static str },
}

impl AuthError {
    pub fn validation(message: impl Into<String>, field: Option<&'static str>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
            redirect: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Dependency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation {
                message,
                field,
                redirect,
            } => ErrorBody {
                error: message,
                field,
                redirect,
                retry_after_seconds: None,
            },
            Self::InvalidCredentials => ErrorBody {
                error: "Invalid credentials".to_string(),
                field: None,
                redirect: None,
                retry_after_seconds: None,
            },
            Self::InvalidToken => ErrorBody {
                error: "Invalid or expired token".to_string(),
                field: None,
                redirect: None,
                retry_after_seconds: None,
            },
            Self::RateLimited {
                message,
                retry_after_seconds,
            } => ErrorBody {
                error: message,
                field: None,
                redirect: None,
                retry_after_seconds: Some(retry_after_seconds),
            },
            Self::Conflict { message } | Self::NotFound { message } | Self::Dependency { message } => {
                ErrorBody {
                    error: message.to_string(),
                    field: None,
                    redirect: None,
                    retry_after_seconds: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            AuthError::validation("bad", None).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::RateLimited {
                message: "slow down".to_string(),
                retry_after_seconds: 60
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::Conflict {
                message: "Email already registered"
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::Dependency {
                message: "Something went wrong"
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_omits_empty_hints() {
        let body = ErrorBody {
            error: "Invalid email address".to_string(),
            field: Some("email"),
            redirect: None,
            retry_after_seconds: None,
        };
        let value = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(
            value.get("error").and_then(serde_json::Value::as_str),
            Some("Invalid email address")
        );
        assert_eq!(
            value.get("field").and_then(serde_json::Value::as_str),
            Some("email")
        );
        assert!(value.get("redirect").is_none());
        assert!(value.get("retry_after_seconds").is_none());
    }
}
