use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AppConfig, Env},
    models::{Actor, TokenResponse, UserId},
    policy::{FrozenAccountError, check_issuable},
    repository::{Repository, RepositoryState},
};

/// Claims
///
/// Payload of an access token signed with the configured HS256 secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: UserId,
    pub exp: usize,
    pub iat: usize,
}

/// TokenError
///
/// Why `POST /token` refused to issue a token. The HTTP layer answers the
/// first two identically so a caller cannot learn whether an account exists
/// or is frozen.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Frozen(#[from] FrozenAccountError),
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

pub fn encode_token(user_id: UserId, config: &AppConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + config.token_ttl_secs as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// issue_token
///
/// Credential issuance: verify the password first, then ask the account
/// gate, then sign. A wrong password on a frozen account therefore reports
/// `InvalidCredentials`, never `Frozen`.
pub async fn issue_token(
    repo: &dyn Repository,
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<TokenResponse, TokenError> {
    let user = repo
        .verify_credentials(username, password)
        .await
        .ok_or(TokenError::InvalidCredentials)?;

    check_issuable(&Actor::from(&user))?;

    let access = encode_token(user.id, config)?;
    tracing::info!(user_id = user.id, "access token issued");

    Ok(TokenResponse {
        access,
        token_type: "Bearer".to_string(),
        expires_in: config.token_ttl_secs,
    })
}

/// Actor Extractor
///
/// Resolves the request's identity without requiring one:
/// 1. `Env::Local` only: an `x-user-id` header naming an existing user.
/// 2. No `Authorization` header: the anonymous actor.
/// 3. A Bearer token: decoded, then the user is reloaded so staff and freeze
///    flags are current.
///
/// Rejection: `401` when a token is present but malformed, expired, or names
/// a user that no longer exists.
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = id_str.trim().parse::<UserId>() {
                        if let Some(user) = repo.get_user(user_id).await {
                            return Ok(Actor::from(&user));
                        }
                    }
                }
            }
        }

        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Actor::anonymous());
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = match decode_token(token, &config.jwt_secret) {
            Ok(claims) => claims,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("expired access token"),
                    other => tracing::debug!("rejected access token: {:?}", other),
                }
                return Err(StatusCode::UNAUTHORIZED);
            }
        };

        // A deleted user keeps a cryptographically valid token until expiry.
        let user = repo
            .get_user(claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Actor::from(&user))
    }
}

/// AuthUser
///
/// An [`Actor`] that is known to be authenticated. Rejects anonymous
/// requests with `401`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;
        if !actor.is_authenticated {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(AuthUser(actor))
    }
}
