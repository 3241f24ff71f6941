// src/utils/jwt.rs
//
// Identity of the caller. Tokens are minted by the identity provider and
// verified here with the shared HS256 secret.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const ADMIN_ROLE: &str = "admin";

/// Longest lifetime `sign_jwt` will put on a token.
const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Claims carried by an access token.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    pub role: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: i64, role: &str, ttl: chrono::Duration) -> Self {
        let exp = Utc::now()
            .checked_add_signed(ttl)
            .map_or(0, |at| at.timestamp().max(0) as usize);
        Self {
            sub: user_id.to_string(),
            role: role.to_owned(),
            exp,
        }
    }

    /// Numeric user id carried in `sub`.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid subject in token".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn sign(&self, secret: &str) -> Result<String, AppError> {
        encode(
            &Header::new(Algorithm::HS256),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::InternalServerError(e.to_string()))
    }
}

/// Issues a token for `user_id` valid for `ttl_seconds`.
pub fn sign_jwt(user_id: i64, role: &str, secret: &str, ttl_seconds: u64) -> Result<String, AppError> {
    let ttl = chrono::Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64);
    Claims::new(user_id, role, ttl).sign(secret)
}

/// Checks signature, algorithm and expiry; `sub` and `exp` must be present.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::AuthError("Token expired".to_string()),
            _ => AppError::AuthError("Invalid token".to_string()),
        })
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))
}

/// Verifies the bearer token and puts its `Claims` into the request
/// extensions for the attempt handlers.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verify_jwt(bearer_token(req.headers())?, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Lets only admins through. Layered inside `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    if !claims.is_admin() {
        tracing::warn!(sub = %claims.sub, "Non-admin tried to manage assessments");
        return Err(AppError::Forbidden("Admin role required".to_string()));
    }

    Ok(next.run(req).await)
}
