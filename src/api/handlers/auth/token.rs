//! JWT session tokens, HS256 signed with the configured secret.

use jsonwebtoken::{
    decode, encode, errors::Error, get_current_timestamp, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::storage::UserRecord;

/// Claims carried by a session token. `sub` is the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub full_name: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

/// A freshly signed token together with its expiry (unix seconds).
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires: u64,
}

/// Sign a session token for `user`, valid for `ttl_seconds`.
///
/// # Errors
/// Returns an error if signing fails.
pub fn issue(
    user: &UserRecord,
    secret: &SecretString,
    ttl_seconds: u64,
) -> Result<IssuedToken, Error> {
    let now = get_current_timestamp();
    let expires = now + ttl_seconds;
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        full_name: user.full_name.clone(),
        email: user.email.clone(),
        iat: now,
        exp: expires,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )?;
    Ok(IssuedToken { token, expires })
}

/// Decode and validate a session token, checking signature and expiry.
///
/// # Errors
/// Returns an error for a bad signature, malformed token, or expired claims.
pub fn verify(token: &str, secret: &SecretString) -> Result<Claims, Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
