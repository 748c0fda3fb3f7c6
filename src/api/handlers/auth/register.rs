//! Registration endpoint, gated on a fresh email verification.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::error::AuthError;
use super::state::AuthState;
use super::storage::insert_user;
use super::token;
use super::types::{PublicUser, RegisterRequest, TokenResponse};
use super::utils::{
    gmail_address, hash_password, is_unique_violation, normalize_email, valid_email,
    valid_full_name, valid_password,
};

/// Create the account and sign the first session token.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Invalid input or unverified email", body = super::error::ErrorBody),
        (status = 409, description = "Email already registered", body = super::error::ErrorBody),
        (status = 500, description = "Registration failed", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return AuthError::validation("Missing payload", None).into_response();
        }
    };

    if !valid_full_name(&request.full_name) {
        return AuthError::validation(
            "Full name must contain only letters and spaces",
            Some("fullName"),
        )
        .into_response();
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return AuthError::validation("Invalid email address", Some("email")).into_response();
    }
    if !gmail_address(&email) {
        return AuthError::validation("Only Gmail addresses are supported", Some("email"))
            .into_response();
    }
    if !valid_password(&request.password) {
        return AuthError::validation(
            "Password must be at least 8 characters with an uppercase letter, a lowercase letter, a digit, and a symbol",
            Some("password"),
        )
        .into_response();
    }

    // Registration only proceeds inside the thirty-minute window opened by a
    // successful OTP verification.
    if !auth_state.otp().is_verified(&email).await {
        return AuthError::Validation {
            message: "Email not verified, verify your email first".to_string(),
            field: Some("email"),
            redirect: Some("/register"),
        }
        .into_response();
    }

    let password = request.password;
    let hashed = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(Ok(hashed)) => hashed,
        Ok(Err(err)) => {
            error!("Failed to hash password: {err}");
            return AuthError::Dependency {
                message: "Registration failed",
            }
            .into_response();
        }
        Err(err) => {
            error!("Password hashing task failed: {err}");
            return AuthError::Dependency {
                message: "Registration failed",
            }
            .into_response();
        }
    };

    let user = match insert_user(&pool, request.full_name.trim(), &email, &hashed).await {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            return AuthError::Conflict {
                message: "Email already registered, log in instead",
            }
            .into_response();
        }
        Err(err) => {
            error!("Failed to insert user: {err}");
            return AuthError::Dependency {
                message: "Registration failed",
            }
            .into_response();
        }
    };

    // The mark is single-use; burn it only after the insert succeeds so a
    // failed registration does not force the user back through OTP.
    auth_state.otp().consume_verification(&email).await;

    let issued = match token::issue(
        &user,
        auth_state.token_secret(),
        auth_state.config().token_ttl_seconds(),
    ) {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to sign session token: {err}");
            return AuthError::Dependency {
                message: "Registration failed",
            }
            .into_response();
        }
    };

    info!(%email, user_id = %user.id, "user registered");
    (
        StatusCode::CREATED,
        Json(TokenResponse {
            token: issued.token,
            expires: issued.expires,
            user: PublicUser::from(&user),
            message: Some("Registration successful".to_string()),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::otp::OtpRegistry;
    use super::super::state::{AuthConfig, AuthState};
    use super::super::throttle::LoginThrottle;
    use super::{register, RegisterRequest};
    use crate::api::email::LogMailer;
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AuthConfig::new(),
            SecretString::from("test-secret"),
            Arc::new(OtpRegistry::new()),
            Arc::new(LoginThrottle::new()),
            Arc::new(LogMailer),
        ))
    }

    fn request(full_name: &str, email: &str, password: &str) -> Option<Json<RegisterRequest>> {
        Some(Json(RegisterRequest {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }))
    }

    #[tokio::test]
    async fn register_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_bad_full_name() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(
            Extension(pool),
            Extension(auth_state()),
            request("Asha42", "asha@gmail.com", "Str0ng!pass"),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_weak_password() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(
            Extension(pool),
            Extension(auth_state()),
            request("Asha Verma", "asha@gmail.com", "weakpass"),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_requires_verified_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(
            Extension(pool),
            Extension(auth_state()),
            request("Asha Verma", "asha@gmail.com", "Str0ng!pass"),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
