/// Revoke every active refresh token of one user, forcing re-login everywhere.
/// Run after a credential change or a suspected token leak.
///
/// Usage: revoke-sessions --email EMAIL
use anyhow::Context;
use clap::Parser;
use sprintflow_api::{
    db,
    services::{
        refresh_tokens::{PgRefreshTokenStore, RefreshTokenStore},
        users::{PgUserRepository, UserRepository},
    },
};

#[derive(Parser)]
#[command(name = "revoke-sessions", about = "Revoke all refresh tokens of a user")]
struct Args {
    /// Email of the user whose sessions are revoked
    #[arg(long)]
    email: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;
    let pool = db::create_pool(&database_url, 2).await?;

    let user = PgUserRepository::new(pool.clone())
        .find_by_email(&args.email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No account found for email {}", args.email))?;

    let revoked = PgRefreshTokenStore::new(pool)
        .revoke_all_by_user_id(user.id)
        .await?;

    tracing::info!("Revoked {} refresh token(s) for {}", revoked, args.email);
    Ok(())
}
