use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{PublicUser, UserRole};

/// Claims embedded in the signed access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // user UUID
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

/// The caller behind a verified access token. Inserted by the authorization
/// gate and handed to handlers as an extractor argument.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub claims: Claims,
}

/// What a successful login hands back to the transport layer.
/// `refresh_token` is the raw value; only its hash is persisted.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Result of a rotation: a new access token and the replacement refresh token.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}
