use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_access_secret: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_days: u64,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Adds `Secure` to the refresh-token cookie. On when `APP_ENV=production`.
    pub cookie_secure: bool,
    pub password: PasswordConfig,
}

/// Argon2id work factor applied to newly hashed passwords.
/// Existing hashes are verified with the parameters embedded in the digest.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP baseline for Argon2id: 19 MiB, 2 passes, 1 lane
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

const MAX_ACCESS_TOKEN_TTL_SECONDS: u64 = 24 * 60 * 60;
const MAX_REFRESH_TOKEN_TTL_DAYS: u64 = 365;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = PasswordConfig::default();
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_access_secret: required("JWT_ACCESS_SECRET")?,
            access_token_ttl_seconds: bounded(
                "ACCESS_TOKEN_TTL_SECONDS",
                env::var("ACCESS_TOKEN_TTL_SECONDS")
                    .unwrap_or_else(|_| "900".into())
                    .parse()?,
                MAX_ACCESS_TOKEN_TTL_SECONDS,
            )?,
            refresh_token_ttl_days: bounded(
                "REFRESH_TOKEN_TTL_DAYS",
                env::var("REFRESH_TOKEN_TTL_DAYS")
                    .unwrap_or_else(|_| "7".into())
                    .parse()?,
                MAX_REFRESH_TOKEN_TTL_DAYS,
            )?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            cookie_secure: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            password: PasswordConfig {
                memory_kib: optional_parse("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
                iterations: optional_parse("ARGON2_ITERATIONS", defaults.iterations)?,
                parallelism: optional_parse("ARGON2_PARALLELISM", defaults.parallelism)?,
            },
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
}

fn bounded(key: &str, value: u64, max: u64) -> anyhow::Result<u64> {
    if value == 0 || value > max {
        anyhow::bail!("{} must be between 1 and {}, got {}", key, max, value);
    }
    Ok(value)
}

fn optional_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(v) if !v.is_empty() => Ok(v.parse()?),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_bounds() {
        assert_eq!(bounded("REFRESH_TOKEN_TTL_DAYS", 7, MAX_REFRESH_TOKEN_TTL_DAYS).unwrap(), 7);
        assert_eq!(
            bounded("ACCESS_TOKEN_TTL_SECONDS", MAX_ACCESS_TOKEN_TTL_SECONDS, MAX_ACCESS_TOKEN_TTL_SECONDS)
                .unwrap(),
            MAX_ACCESS_TOKEN_TTL_SECONDS
        );

        let err = bounded("REFRESH_TOKEN_TTL_DAYS", u64::MAX, MAX_REFRESH_TOKEN_TTL_DAYS).unwrap_err();
        assert!(err.to_string().contains("REFRESH_TOKEN_TTL_DAYS"));
        assert!(bounded("ACCESS_TOKEN_TTL_SECONDS", 0, MAX_ACCESS_TOKEN_TTL_SECONDS).is_err());
    }
}
