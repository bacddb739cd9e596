use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult, RejectReason},
    models::{
        auth::{LoginOutcome, SessionTokens},
        refresh_token::TokenState,
        user::{PublicUser, User},
    },
    services::{
        metrics::{LOGINS_COUNTER, LOGOUTS_COUNTER, REFRESHES_COUNTER},
        password::SecretHasher,
        refresh_tokens::RefreshTokenStore,
        tokens::{generate_refresh_token, hash_refresh_token, TokenSigner},
        users::UserRepository,
    },
};

/// Login, refresh-token rotation and logout.
///
/// A refresh token moves ACTIVE -> REVOKED on rotation or logout, or
/// ACTIVE -> EXPIRED as time passes. Neither end state leads back.
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    hasher: SecretHasher,
    signer: TokenSigner,
    refresh_ttl: Duration,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: SecretHasher,
        signer: TokenSigner,
        refresh_ttl_days: u64,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            signer,
            refresh_ttl: Duration::days(refresh_ttl_days as i64),
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginOutcome> {
        let user = match self.users.find_by_email(email).await? {
            Some(u) => u,
            None => {
                LOGINS_COUNTER.with_label_values(&["unknown_email"]).inc();
                return Err(AuthError::UserNotFound(email.to_string()));
            }
        };

        if !self.hasher.verify_async(password, &user.password_hash).await? {
            LOGINS_COUNTER.with_label_values(&["bad_password"]).inc();
            warn!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::Unauthorized(RejectReason::InvalidCredentials));
        }

        let tokens = self.issue(&user).await?;
        LOGINS_COUNTER.with_label_values(&["success"]).inc();
        info!(user_id = %user.id, "login succeeded");

        Ok(LoginOutcome {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: PublicUser::from(&user),
        })
    }

    /// Exchanges a refresh token for a new access token and a replacement
    /// refresh token. The presented token is revoked before anything is issued.
    pub async fn refresh(&self, raw_refresh_token: &str) -> AuthResult<SessionTokens> {
        let token_hash = hash_refresh_token(raw_refresh_token);

        let consumed = match self.refresh_tokens.consume(&token_hash).await? {
            Some(t) => t,
            None => {
                let reason = self.classify_rejection(&token_hash).await?;
                REFRESHES_COUNTER.with_label_values(&[reason.as_str()]).inc();
                warn!(reason = reason.as_str(), "refresh rejected");
                return Err(AuthError::Unauthorized(reason));
            }
        };

        let user = match self.users.find_by_id(consumed.user_id).await? {
            Some(u) => u,
            None => {
                REFRESHES_COUNTER
                    .with_label_values(&[RejectReason::UserGone.as_str()])
                    .inc();
                warn!(user_id = %consumed.user_id, "refresh rejected: user no longer exists");
                return Err(AuthError::Unauthorized(RejectReason::UserGone));
            }
        };

        let tokens = self.issue(&user).await?;
        REFRESHES_COUNTER.with_label_values(&["rotated"]).inc();
        info!(user_id = %user.id, "refresh token rotated");
        Ok(tokens)
    }

    /// Revokes the presented refresh token. Absent, unknown and already
    /// revoked tokens are all fine.
    pub async fn logout(&self, raw_refresh_token: Option<&str>) -> AuthResult<()> {
        LOGOUTS_COUNTER.inc();
        let Some(raw) = raw_refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(());
        };
        if self.refresh_tokens.revoke_by_hash(&hash_refresh_token(raw)).await? {
            info!("refresh token revoked on logout");
        }
        Ok(())
    }

    /// Ends every session of `user_id`, e.g. after a credential change.
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> AuthResult<u64> {
        let revoked = self.refresh_tokens.revoke_all_by_user_id(user_id).await?;
        info!(user_id = %user_id, revoked, "revoked all refresh tokens");
        Ok(revoked)
    }

    async fn issue(&self, user: &User) -> AuthResult<SessionTokens> {
        let access_token = self.signer.sign_for(user)?;

        let refresh_token = generate_refresh_token();
        let expires_at = Utc::now() + self.refresh_ttl;
        self.refresh_tokens
            .create(user.id, &hash_refresh_token(&refresh_token), expires_at)
            .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Works out why `consume` found nothing usable. The read may be newer
    /// than the failed consume; a row that looks active here lost a race.
    async fn classify_rejection(&self, token_hash: &str) -> AuthResult<RejectReason> {
        let reason = match self.refresh_tokens.find_by_hash(token_hash).await? {
            None => RejectReason::UnknownRefreshToken,
            Some(t) => match t.state_at(Utc::now()) {
                TokenState::Expired => RejectReason::ExpiredRefreshToken,
                TokenState::Revoked | TokenState::Active => RejectReason::RevokedRefreshToken,
            },
        };
        Ok(reason)
    }
}
