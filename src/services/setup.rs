use std::sync::Arc;

use tracing::info;

use crate::{
    error::{AuthError, AuthResult},
    models::user::{NewUser, PublicUser, SetupRequest, SetupStatus, UserRole},
    services::{password::SecretHasher, users::UserRepository},
};

const MIN_PASSWORD_LEN: usize = 8;

/// First-run provisioning: creates the single superadmin while the user table is empty.
pub struct SetupService {
    users: Arc<dyn UserRepository>,
    hasher: SecretHasher,
}

impl SetupService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: SecretHasher) -> Self {
        Self { users, hasher }
    }

    pub async fn status(&self) -> AuthResult<SetupStatus> {
        Ok(SetupStatus {
            required: self.users.count().await? == 0,
        })
    }

    pub async fn create_superadmin(&self, req: SetupRequest) -> AuthResult<PublicUser> {
        validate(&req)?;

        // Cheap pre-check so a completed setup does not pay for an Argon2 hash.
        if self.users.count().await? > 0 {
            return Err(AuthError::SetupCompleted);
        }

        let password_hash = self.hasher.hash_async(&req.password).await?;
        let user = self
            .users
            .create_first_user(NewUser {
                name: req.name.trim().to_string(),
                email: req.email.trim().to_string(),
                password_hash,
                role: UserRole::SuperAdmin,
            })
            .await?
            .ok_or(AuthError::SetupCompleted)?;

        info!(user_id = %user.id, "superadmin created by first-run setup");
        Ok(PublicUser::from(&user))
    }
}

fn validate(req: &SetupRequest) -> AuthResult<()> {
    if req.name.trim().is_empty() {
        return Err(AuthError::Validation("name must not be empty".into()));
    }
    let email = req.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(AuthError::Validation("email must be a valid address".into())),
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
