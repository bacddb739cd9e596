pub mod auth;
pub mod metrics;
pub mod password;
pub mod refresh_tokens;
pub mod setup;
pub mod tokens;
pub mod users;
