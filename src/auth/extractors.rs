use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::Claims, jwt::JwtKeys};
use crate::error::AppError;

/// Verified caller identity. Extracting it is the auth gate: a missing or
/// malformed `Authorization: Bearer <token>` header, or a token that fails
/// verification, rejects the request with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Owner id for records created by this caller.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.0
            .user_id
            .ok_or_else(|| AppError::Unauthorized("Token carries no user id".into()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;

        let token = bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;

        let keys = JwtKeys::from_ref(state);
        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                warn!(error = %e, "token rejected");
                Err(AppError::Unauthorized("Unauthorized".into()))
            }
        }
    }
}

// Expect "Bearer <token>"
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
