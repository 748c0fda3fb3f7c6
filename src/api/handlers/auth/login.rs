//! Login endpoint with per `email:address` failure throttling.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::AuthError;
use super::state::AuthState;
use super::storage::lookup_user_by_email;
use super::throttle::throttle_key;
use super::token;
use super::types::{LoginRequest, PublicUser, TokenResponse};
use super::utils::{dummy_password_check, extract_client_ip, normalize_email, verify_password};

/// Authenticate with email and password, returning a session token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Missing email or password", body = super::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = super::error::ErrorBody),
        (status = 429, description = "Too many failed attempts", body = super::error::ErrorBody),
        (status = 500, description = "Login failed", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return AuthError::validation("Missing payload", None).into_response();
        }
    };

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return AuthError::validation("Missing email", Some("email")).into_response();
    }
    if request.password.is_empty() {
        return AuthError::validation("Missing password", Some("password")).into_response();
    }

    let client_addr =
        extract_client_ip(&headers).unwrap_or_else(|| "unknown".to_string());
    let key = throttle_key(&email, &client_addr);

    // The gate runs before any credential work; a blocked request never
    // reaches the counter, so waiting out the window cannot be extended by
    // hammering the endpoint.
    if let Some(retry_after) = auth_state.throttle().check(&key).await {
        let minutes = (retry_after.as_secs() + 59) / 60;
        warn!(%email, %client_addr, "login blocked by throttle");
        return AuthError::RateLimited {
            message: format!(
                "Too many failed login attempts, try again in {} minute{}",
                minutes.max(1),
                if minutes == 1 { "" } else { "s" }
            ),
            retry_after_seconds: retry_after.as_secs(),
        }
        .into_response();
    }

    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to look up user: {err}");
            return AuthError::Dependency {
                message: "Login failed",
            }
            .into_response();
        }
    };

    let Some(user) = user else {
        // Burn the same hashing cost as a real check so response timing does
        // not reveal whether the address exists.
        let password = request.password;
        let _ = tokio::task::spawn_blocking(move || dummy_password_check(&password)).await;
        auth_state.throttle().record_outcome(&key, false).await;
        return AuthError::InvalidCredentials.into_response();
    };

    let password = request.password;
    let stored_hash = user.password_hash.clone();
    let verified =
        match tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await {
            Ok(Ok(verified)) => verified,
            Ok(Err(err)) => {
                error!("Failed to verify password: {err}");
                return AuthError::Dependency {
                    message: "Login failed",
                }
                .into_response();
            }
            Err(err) => {
                error!("Password verification task failed: {err}");
                return AuthError::Dependency {
                    message: "Login failed",
                }
                .into_response();
            }
        };

    auth_state.throttle().record_outcome(&key, verified).await;
    if !verified {
        return AuthError::InvalidCredentials.into_response();
    }

    let issued = match token::issue(
        &user,
        auth_state.token_secret(),
        auth_state.config().token_ttl_seconds(),
    ) {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to sign session token: {err}");
            return AuthError::Dependency {
                message: "Login failed",
            }
            .into_response();
        }
    };

    info!(%email, user_id = %user.id, "user logged in");
    (
        StatusCode::OK,
        Json(TokenResponse {
            token: issued.token,
            expires: issued.expires,
            user: PublicUser::from(&user),
            message: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::otp::OtpRegistry;
    use super::super::state::{AuthConfig, AuthState};
    use super::super::throttle::{throttle_key, LoginThrottle};
    use super::{login, LoginRequest};
    use crate::api::email::LogMailer;
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
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

    fn request(email: &str, password: &str) -> Option<Json<LoginRequest>> {
        Some(Json(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }))
    }

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(HeaderMap::new(), Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_missing_password() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            request("asha@gmail.com", ""),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_blocked_key_is_rejected_before_lookup() -> Result<()> {
        // A lazy pool with no server behind it proves the gate fires first:
        // reaching the lookup would error 500, not 429.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let state = auth_state();
        let key = throttle_key("asha@gmail.com", "unknown");
        for _ in 0..5 {
            state.throttle().record_outcome(&key, false).await;
        }
        let response = login(
            HeaderMap::new(),
            Extension(pool),
            Extension(state),
            request("asha@gmail.com", "Str0ng!pass"),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }
}
