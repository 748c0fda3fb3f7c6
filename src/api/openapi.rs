//! OpenAPI document for the service, served by Swagger UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{auth, health};

struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::verification::send_otp,
        auth::verification::verify_otp,
        auth::register::register,
        auth::login::login,
        auth::session::me,
        auth::session::refresh_token,
    ),
    components(schemas(
        health::Health,
        auth::error::ErrorBody,
        auth::types::SendOtpRequest,
        auth::types::SendOtpResponse,
        auth::types::VerifyOtpRequest,
        auth::types::VerifyOtpResponse,
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::PublicUser,
        auth::types::TokenResponse,
    )),
    modifiers(&BearerToken),
    tags(
        (name = "auth", description = "OTP verification, registration, and sessions"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
