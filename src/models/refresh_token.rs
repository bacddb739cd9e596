use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    /// SHA-256 hex digest of the raw token.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Revoked,
    Expired,
}

impl RefreshToken {
    /// Revocation wins over expiry: a revoked token stays revoked after it expires.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked_at.is_some() {
            TokenState::Revoked
        } else if self.expires_at <= now {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == TokenState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration, revoked: bool) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "0".repeat(64),
            expires_at: now + expires_in,
            created_at: now,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn fresh_token_is_active() {
        let t = token(Duration::days(7), false);
        assert_eq!(t.state_at(Utc::now()), TokenState::Active);
        assert!(t.is_usable_at(Utc::now()));
    }

    #[test]
    fn expiry_is_exclusive_of_the_boundary() {
        let t = token(Duration::days(7), false);
        assert_eq!(t.state_at(t.expires_at), TokenState::Expired);
    }

    #[test]
    fn revoked_and_expired_reports_revoked() {
        let t = token(Duration::seconds(-10), true);
        assert_eq!(t.state_at(Utc::now()), TokenState::Revoked);
    }
}
