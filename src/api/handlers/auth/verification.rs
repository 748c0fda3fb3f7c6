//! OTP issuance and verification endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::email::OtpEmail;

use super::error::AuthError;
use super::state::AuthState;
use super::storage::user_exists;
use super::types::{SendOtpRequest, SendOtpResponse, VerifyOtpRequest, VerifyOtpResponse};
use super::utils::{gmail_address, normalize_email, valid_email};

/// Issue a 6-digit OTP and email it to the address.
#[utoipa::path(
    post,
    path = "/api/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = SendOtpResponse),
        (status = 400, description = "Invalid email", body = super::error::ErrorBody),
        (status = 409, description = "Email already registered", body = super::error::ErrorBody),
        (status = 429, description = "Too many OTP requests", body = super::error::ErrorBody),
        (status = 500, description = "Delivery failed", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn send_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> impl IntoResponse {
    let request: SendOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return AuthError::validation("Missing payload", None).into_response();
        }
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return AuthError::validation("Invalid email address", Some("email")).into_response();
    }
    if !gmail_address(&email) {
        return AuthError::validation("Only Gmail addresses are supported", Some("email"))
            .into_response();
    }

    // Registered addresses get a conflict up front so the client can steer
    // the user to login instead of burning OTP sends.
    match user_exists(&pool, &email).await {
        Ok(true) => {
            return AuthError::Conflict {
                message: "Email already registered, log in instead",
            }
            .into_response();
        }
        Ok(false) => {}
        Err(err) => {
            error!("Failed to check for existing user: {err}");
            return AuthError::Dependency {
                message: "Failed to send OTP",
            }
            .into_response();
        }
    }

    let code = match auth_state.otp().generate(&email).await {
        Ok(code) => code,
        Err(limit) => {
            return AuthError::RateLimited {
                message: limit.message(),
                retry_after_seconds: limit.retry_after.as_secs(),
            }
            .into_response();
        }
    };

    let mailer = auth_state.mailer();
    let otp_email = OtpEmail {
        to_email: email.clone(),
        code,
        ttl_minutes: auth_state.otp().code_ttl().as_secs() / 60,
    };
    let delivery = tokio::task::spawn_blocking(move || mailer.send(&otp_email)).await;
    match delivery {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!("Failed to send OTP email: {err}");
            return AuthError::Dependency {
                message: "Failed to send OTP email",
            }
            .into_response();
        }
        Err(err) => {
            error!("OTP mail task failed: {err}");
            return AuthError::Dependency {
                message: "Failed to send OTP email",
            }
            .into_response();
        }
    }

    info!(%email, "OTP sent");
    (
        StatusCode::OK,
        Json(SendOtpResponse {
            message: "OTP sent successfully".to_string(),
            email,
        }),
    )
        .into_response()
}

/// Check a submitted OTP and mark the email verified on success.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = VerifyOtpResponse),
        (status = 400, description = "Invalid or expired OTP", body = VerifyOtpResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return AuthError::validation("Missing payload", None).into_response();
        }
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return AuthError::validation("Invalid email address", Some("email")).into_response();
    }
    if request.otp.trim().is_empty() {
        return AuthError::validation("Missing OTP", Some("otp")).into_response();
    }

    let outcome = auth_state.otp().verify(&email, &request.otp).await;
    let status = if outcome.is_valid() {
        info!(%email, "email verified");
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (
        status,
        Json(VerifyOtpResponse {
            success: outcome.is_valid(),
            message: outcome.message().to_string(),
        }),
    )
        .into_response()
}
