//! Session endpoints: current-user lookup and token refresh.

use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::error::AuthError;
use super::state::AuthState;
use super::storage::{lookup_user_by_id, UserRecord};
use super::token::{self, Claims};
use super::types::{PublicUser, TokenResponse};

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Decode the bearer token or reject the request with a generic 401.
fn require_claims(headers: &HeaderMap, auth_state: &AuthState) -> Result<Claims, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::InvalidToken)?;
    token::verify(token, auth_state.token_secret()).map_err(|_| AuthError::InvalidToken)
}

/// Resolve the claims back to a live user row. A valid token whose user has
/// been deleted gets 404, not 401.
async fn lookup_claimed_user(
    pool: &PgPool,
    claims: &Claims,
) -> Result<UserRecord, AuthError> {
    let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    match lookup_user_by_id(pool, id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AuthError::NotFound {
            message: "User not found",
        }),
        Err(err) => {
            error!("Failed to look up user by id: {err}");
            Err(AuthError::Dependency {
                message: "Something went wrong",
            })
        }
    }
}

/// Return the profile of the authenticated user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Invalid or expired token", body = super::error::ErrorBody),
        (status = 404, description = "User no longer exists", body = super::error::ErrorBody)
    ),
    security(("bearer_token" = [])),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_claims(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };
    match lookup_claimed_user(&pool, &claims).await {
        Ok(user) => (StatusCode::OK, Json(PublicUser::from(&user))).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Exchange a valid token for a fresh one with a full TTL. Claims are
/// re-read from the database so role or name changes take effect here.
#[utoipa::path(
    post,
    path = "/api/auth/refresh-token",
    responses(
        (status = 200, description = "Fresh token", body = TokenResponse),
        (status = 401, description = "Invalid or expired token", body = super::error::ErrorBody),
        (status = 404, description = "User no longer exists", body = super::error::ErrorBody)
    ),
    security(("bearer_token" = [])),
    tag = "auth"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let claims = match require_claims(&headers, &auth_state) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };
    let user = match lookup_claimed_user(&pool, &claims).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    let issued = match token::issue(
        &user,
        auth_state.token_secret(),
        auth_state.config().token_ttl_seconds(),
    ) {
        Ok(issued) => issued,
        Err(err) => {
            error!("Failed to sign session token: {err}");
            return AuthError::Dependency {
                message: "Something went wrong",
            }
            .into_response();
        }
    };
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
    use super::super::throttle::LoginThrottle;
    use super::{extract_bearer_token, me, refresh_token, require_claims};
    use crate::api::email::LogMailer;
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
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

    #[test]
    fn extract_bearer_token_parses_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn extract_bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_bearer_token(&headers), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn require_claims_rejects_garbage_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"));
        assert!(require_claims(&headers, &auth_state()).is_err());
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = me(HeaderMap::new(), Extension(pool), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_without_token_is_unauthorized() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = refresh_token(HeaderMap::new(), Extension(pool), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
