use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{
    error::{AuthError, AuthResult, RejectReason},
    models::{auth::Claims, user::User},
};

/// Raw refresh tokens are this many random bytes, hex-encoded.
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// HS256 signer for short-lived access tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        }
    }

    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign access token: {e}")))
    }

    /// Builds `{sub, email, role, iat, exp}` for `user` and signs it.
    pub fn sign_for(&self, user: &User) -> AuthResult<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role(),
            iat: now,
            exp: now + self.ttl_seconds as usize,
        };
        self.sign(&claims)
    }

    /// Bad signature, expiry and malformed input all collapse into the same rejection.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::Unauthorized(RejectReason::InvalidAccessToken))
    }
}

/// Fresh opaque refresh token: 512 bits from the OS RNG, hex-encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest; the only form in which a refresh token is stored.
pub fn hash_refresh_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "Ada".into(),
            password_hash: String::new(),
            role: "superadmin".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = TokenSigner::new("access-secret", 900);
        let u = user();
        let token = signer.sign_for(&u).unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, u.id.to_string());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, UserRole::SuperAdmin);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenSigner::new("one", 900).sign_for(&user()).unwrap();
        let err = TokenSigner::new("two", 900).verify(&token).unwrap_err();
        assert_eq!(err.reject_reason(), Some(RejectReason::InvalidAccessToken));
    }

    #[test]
    fn test_expired_rejected() {
        let signer = TokenSigner::new("access-secret", 900);
        let now = Utc::now().timestamp() as usize;
        let token = signer
            .sign(&Claims {
                sub: Uuid::new_v4().to_string(),
                email: "a@x.com".into(),
                role: UserRole::Dev,
                iat: now - 1000,
                exp: now - 100,
            })
            .unwrap();

        let err = signer.verify(&token).unwrap_err();
        assert_eq!(err.reject_reason(), Some(RejectReason::InvalidAccessToken));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = TokenSigner::new("access-secret", 900);
        let token = signer.sign_for(&user()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = TokenSigner::new("other", 900).sign_for(&user()).unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;

        assert!(signer.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_malformed_rejected() {
        let signer = TokenSigner::new("access-secret", 900);
        for garbage in ["", "abc", "a.b.c", "Bearer xyz"] {
            let err = signer.verify(garbage).unwrap_err();
            assert_eq!(err.reject_reason(), Some(RejectReason::InvalidAccessToken));
        }
    }

    #[test]
    fn test_refresh_token_shape() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();

        assert_eq!(a.len(), REFRESH_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_token_hash_is_stable_sha256() {
        // sha256("abc")
        assert_eq!(
            hash_refresh_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let raw = generate_refresh_token();
        assert_eq!(hash_refresh_token(&raw), hash_refresh_token(&raw));
        assert_ne!(hash_refresh_token(&raw), raw);
    }
}
