//! Argon2id password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=…`) so salt and work factor
//! travel with the hash; verification never needs the current config.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::{
    config::PasswordConfig,
    error::{AuthError, AuthResult},
};

#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    pub fn new(config: &PasswordConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Internal(format!("invalid Argon2 params: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))
    }

    /// `Ok(false)` on mismatch. Only a digest that cannot be parsed is an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AuthError::Internal(format!("stored password hash is malformed: {e}")))?;
        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(format!("password verification failed: {e}"))),
        }
    }

    /// Runs [`verify`](Self::verify) on the blocking pool; Argon2 is deliberately slow.
    pub async fn verify_async(&self, plaintext: &str, digest: &str) -> AuthResult<bool> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        let digest = digest.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))?
    }

    pub async fn hash_async(&self, plaintext: &str) -> AuthResult<String> {
        let hasher = self.clone();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> SecretHasher {
        SecretHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = cheap();
        let digest = hasher.hash("correct horse").unwrap();

        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &digest).unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let hasher = cheap();
        let digest = hasher.hash("correct").unwrap();

        assert!(!hasher.verify("wrong", &digest).unwrap());
    }

    #[test]
    fn test_salt_differs_per_hash() {
        let hasher = cheap();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_digest_from_other_work_factor_still_verifies() {
        let digest = cheap().hash("pw").unwrap();
        let stronger = SecretHasher::new(&PasswordConfig {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();

        assert!(stronger.verify("pw", &digest).unwrap());
    }

    #[test]
    fn test_malformed_digest_is_error() {
        assert!(cheap().verify("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = SecretHasher::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_async_verify() {
        let hasher = cheap();
        let digest = hasher.hash_async("pw").await.unwrap();
        assert!(hasher.verify_async("pw", &digest).await.unwrap());
        assert!(!hasher.verify_async("nope", &digest).await.unwrap());
    }
}
