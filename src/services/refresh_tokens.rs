//! Persistence for refresh-token records.
//!
//! Rows are looked up by the SHA-256 of the raw token and only ever
//! soft-revoked. Every mutation is a single conditional statement so
//! concurrent callers cannot both observe the same row as active.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::refresh_token::RefreshToken,
};

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshToken>;

    /// Returns the record whatever its state; callers decide usability.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Revokes the row if it is not already revoked. `false` means nothing changed.
    async fn revoke_by_hash(&self, token_hash: &str) -> AuthResult<bool>;

    /// Atomically revokes the row only if it is currently usable and returns it.
    /// At most one caller per hash ever gets `Some`.
    async fn consume(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Revokes every still-active row of the user; returns how many changed.
    async fn revoke_all_by_user_id(&self, user_id: Uuid) -> AuthResult<u64>;

    async fn count_active(&self) -> AuthResult<i64>;
}

const COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, revoked_at";

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(&format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(&format!(
            "SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW()
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn consume(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(&format!(
            "UPDATE refresh_tokens SET revoked_at = NOW()
             WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
             RETURNING {COLUMNS}"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn revoke_all_by_user_id(&self, user_id: Uuid) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW()
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_active(&self) -> AuthResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM refresh_tokens
             WHERE revoked_at IS NULL AND expires_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

/// Process-local store keyed by token hash. Each operation holds the lock
/// for its whole read-modify-write, matching the conditional SQL above.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    rows: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> AuthResult<std::sync::MutexGuard<'_, HashMap<String, RefreshToken>>> {
        self.rows
            .lock()
            .map_err(|_| AuthError::Internal("refresh token store lock poisoned".into()))
    }

    /// All rows of a user, oldest first.
    pub fn tokens_for_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
        let mut tokens: Vec<RefreshToken> = self
            .rows()?
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshToken> {
        let mut rows = self.rows()?;
        if rows.contains_key(token_hash) {
            return Err(AuthError::Internal("duplicate refresh token hash".into()));
        }
        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
            revoked_at: None,
        };
        rows.insert(token_hash.to_string(), token.clone());
        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.rows()?.get(token_hash).cloned())
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> AuthResult<bool> {
        let mut rows = self.rows()?;
        match rows.get_mut(token_hash) {
            Some(t) if t.revoked_at.is_none() => {
                t.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn consume(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        let mut rows = self.rows()?;
        let now = Utc::now();
        match rows.get_mut(token_hash) {
            Some(t) if t.is_usable_at(now) => {
                t.revoked_at = Some(now);
                Ok(Some(t.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn revoke_all_by_user_id(&self, user_id: Uuid) -> AuthResult<u64> {
        let mut rows = self.rows()?;
        let now = Utc::now();
        let mut revoked = 0;
        for t in rows
            .values_mut()
            .filter(|t| t.user_id == user_id && t.revoked_at.is_none())
        {
            t.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn count_active(&self) -> AuthResult<i64> {
        let now = Utc::now();
        Ok(self.rows()?.values().filter(|t| t.is_usable_at(now)).count() as i64)
    }
}
