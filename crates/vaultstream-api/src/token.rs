//! Signed stream tokens.
//!
//! Every playlist and segment request carries a bearer token binding
//! `(video_id, resource, optional user_id)` to an expiry. The MAC is
//! HMAC-SHA256 over a canonical serialization of the claims; the token is
//! the base64url-encoded JSON of the claims plus the hex-encoded MAC.
//! Tokens are stateless: rotating the secret invalidates everything
//! outstanding.

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;
use vaultstream_core::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            // A tampered token usually fails to decode at all; both cases
            // surface as an invalid signature.
            TokenError::Malformed | TokenError::BadSignature => AppError::InvalidSignature,
            TokenError::Expired => AppError::TokenExpired,
        }
    }
}

/// Verified token contents. `resource` is the final path segment the token
/// authorizes (e.g. `master.m3u8`, `720p_007.ts`); callers MUST cross-check
/// it against the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamClaims {
    pub video_id: Uuid,
    pub resource: String,
    pub user_id: Option<Uuid>,
    pub expires_at: u64,
}

#[derive(Serialize, Deserialize)]
struct TokenEnvelope {
    #[serde(flatten)]
    claims: StreamClaims,
    sig: String,
}

#[derive(Clone)]
pub struct StreamSigner {
    secret: Vec<u8>,
    default_ttl: Duration,
}

impl StreamSigner {
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        Self {
            secret: secret.to_vec(),
            default_ttl,
        }
    }

    /// Mint a token for one resource. `ttl` falls back to the configured
    /// default.
    pub fn mint(
        &self,
        video_id: Uuid,
        resource: &str,
        user_id: Option<Uuid>,
        ttl: Option<Duration>,
    ) -> String {
        let expires_at = now_epoch_secs() + ttl.unwrap_or(self.default_ttl).as_secs();
        let claims = StreamClaims {
            video_id,
            resource: resource.to_string(),
            user_id,
            expires_at,
        };

        let sig = hex::encode(self.sign_canonical(&claims));
        let envelope = TokenEnvelope { claims, sig };
        let json = serde_json::to_vec(&envelope).expect("token envelope serializes");

        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    /// Mint one token per resource, all with the same expiry semantics.
    pub fn mint_many(
        &self,
        video_id: Uuid,
        resources: &[String],
        user_id: Option<Uuid>,
        ttl: Option<Duration>,
    ) -> HashMap<String, String> {
        resources
            .iter()
            .map(|resource| {
                (
                    resource.clone(),
                    self.mint(video_id, resource, user_id, ttl),
                )
            })
            .collect()
    }

    /// Decode, recompute the MAC, compare in constant time, check expiry.
    pub fn verify(&self, token: &str) -> Result<StreamClaims, TokenError> {
        let json = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        let envelope: TokenEnvelope =
            serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        let sig = hex::decode(&envelope.sig).map_err(|_| TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(canonical(&envelope.claims).as_bytes());
        mac.verify_slice(&sig).map_err(|_| TokenError::BadSignature)?;

        if now_epoch_secs() > envelope.claims.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(envelope.claims)
    }

    fn sign_canonical(&self, claims: &StreamClaims) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(canonical(claims).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Deterministic MAC input. The resource charset excludes newlines, so the
/// separator is unambiguous.
fn canonical(claims: &StreamClaims) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        claims.video_id,
        claims.resource,
        claims.expires_at,
        claims
            .user_id
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string())
    )
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
