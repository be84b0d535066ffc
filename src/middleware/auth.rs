//! Bearer token authentication
//!
//! Tokens are HS256 JWTs whose `sub` claim is the guest's user id. The
//! middleware validates the token and injects an [`AuthenticatedUser`] into
//! the request extensions; handlers read it back with `Extension`.

use crate::error::{AppError, AppErrorKind, AuthenticationError};
use crate::middleware::error::get_request_id_from_headers;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GuestClaims {
    pub sub: String,
    pub exp: usize,
}

/// The caller, as established by a valid bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Signing keys shared by the middleware and token issuance
#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `user_id` valid for `ttl`.
    pub fn issue(&self, user_id: Uuid, ttl: chrono::Duration) -> Result<String, AppError> {
        let claims = GuestClaims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign token: {}", e)))
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let token_data = decode::<GuestClaims>(token, &self.decoding, &Validation::default())
            .map_err(|e| AppError::unauthenticated(e.to_string()))?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| AppError::unauthenticated("subject is not a user id"))?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ============================================================================
// Guest Authentication Middleware
// ============================================================================

pub async fn guest_auth_middleware(
    State(auth): State<Arc<JwtAuth>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request_id = get_request_id_from_headers(req.headers());
    let with_request_id = |err: AppError| match &request_id {
        Some(id) => err.with_request_id(id.clone()),
        None => err,
    };

    let token = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            with_request_id(AppError::new(AppErrorKind::Authentication(
                AuthenticationError::MissingToken,
            )))
        })?;

    let user = auth.authenticate(token.trim()).map_err(with_request_id)?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
