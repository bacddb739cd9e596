use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::user::{NewUser, User},
};

/// User lookup consumed by the session layer. `count` and `create_first_user`
/// exist for the first-run setup flow only.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    async fn count(&self) -> AuthResult<i64>;

    /// Inserts `user` only if no user exists yet. `None` means setup already happened.
    async fn create_first_user(&self, user: NewUser) -> AuthResult<Option<User>>;
}

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn count(&self) -> AuthResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_first_user(&self, user: NewUser) -> AuthResult<Option<User>> {
        // NOT EXISTS alone races under READ COMMITTED; the lock serialises setups.
        let mut tx = self.pool.begin().await?;
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, name, password_hash, role)
             SELECT $1, $2, $3, $4, $5
             WHERE NOT EXISTS (SELECT 1 FROM users)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(created)
    }
}

/// Process-local user table for tests and local tooling.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> AuthResult<std::sync::MutexGuard<'_, Vec<User>>> {
        self.users
            .lock()
            .map_err(|_| AuthError::Internal("user repository lock poisoned".into()))
    }

    /// Inserts unconditionally, bypassing the first-user rule.
    pub fn insert(&self, user: NewUser) -> AuthResult<User> {
        let mut users = self.users()?;
        insert_row(&mut users, user)
    }

    pub fn remove(&self, id: Uuid) -> AuthResult<bool> {
        let mut users = self.users()?;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

fn insert_row(users: &mut Vec<User>, user: NewUser) -> AuthResult<User> {
    if users.iter().any(|u| u.email == user.email) {
        return Err(AuthError::Validation(format!("email {} already taken", user.email)));
    }
    let now = Utc::now();
    let row = User {
        id: Uuid::new_v4(),
        email: user.email,
        name: user.name,
        password_hash: user.password_hash,
        role: user.role.to_string(),
        created_at: now,
        updated_at: now,
    };
    users.push(row.clone());
    Ok(row)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.users()?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.users()?.iter().find(|u| u.id == id).cloned())
    }

    async fn count(&self) -> AuthResult<i64> {
        Ok(self.users()?.len() as i64)
    }

    async fn create_first_user(&self, user: NewUser) -> AuthResult<Option<User>> {
        let mut users = self.users()?;
        if !users.is_empty() {
            return Ok(None);
        }
        insert_row(&mut users, user).map(Some)
    }
}
