//! Bearer session authentication.
//!
//! Account registration and login are external collaborators; their
//! interface to this service is an HMAC-signed session token carrying a
//! user id and expiry. The extractors below turn the `Authorization`
//! header into a typed user context.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;
use vaultstream_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize, Deserialize)]
struct SessionEnvelope {
    user_id: Uuid,
    expires_at: u64,
    sig: String,
}

fn canonical(user_id: Uuid, expires_at: u64) -> String {
    format!("session\n{}\n{}", user_id, expires_at)
}

fn sign(secret: &[u8], user_id: Uuid, expires_at: u64) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(canonical(user_id, expires_at).as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Mint a session token. Exposed for the account service and the test
/// suite; this API only verifies.
pub fn mint_session(secret: &[u8], user_id: Uuid, ttl: Duration) -> String {
    let expires_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        + ttl.as_secs();

    let envelope = SessionEnvelope {
        user_id,
        expires_at,
        sig: hex::encode(sign(secret, user_id, expires_at)),
    };
    let json = serde_json::to_vec(&envelope).expect("session envelope serializes");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

/// Verify a session token; returns the authenticated user id.
pub fn verify_session(secret: &[u8], token: &str) -> Result<Uuid, AppError> {
    let invalid = || AppError::Unauthorized("Invalid session token".to_string());

    let json = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| invalid())?;
    let envelope: SessionEnvelope = serde_json::from_slice(&json).map_err(|_| invalid())?;

    let sig = hex::decode(&envelope.sig).map_err(|_| invalid())?;
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(canonical(envelope.user_id, envelope.expires_at).as_bytes());
    mac.verify_slice(&sig).map_err(|_| invalid())?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    if now > envelope.expires_at {
        return Err(AppError::Unauthorized(
            "Session token has expired".to_string(),
        ));
    }

    Ok(envelope.user_id)
}

/// Authenticated caller. Rejects the request when the bearer token is
/// missing or invalid.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: Uuid,
}

/// Caller identity when present. A missing header is `None`; a header that
/// is present but invalid is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct OptionalUserContext(pub Option<UserContext>);

impl OptionalUserContext {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.map(|ctx| ctx.user_id)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))?;
    Ok(Some(token.to_string()))
}

impl FromRequestParts<Arc<AppState>> for UserContext {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;
        let user_id = verify_session(state.config.signing_secret_bytes(), &token)?;
        Ok(UserContext { user_id })
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalUserContext {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(OptionalUserContext(None)),
            Some(token) => {
                let user_id = verify_session(state.config.signing_secret_bytes(), &token)?;
                Ok(OptionalUserContext(Some(UserContext { user_id })))
            }
        }
    }
}
