use std::sync::Arc;

use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge};
use tracing::{debug, warn};

use crate::services::refresh_tokens::RefreshTokenStore;

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "auth_logins_total",
        "Login attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref REFRESHES_COUNTER: CounterVec = register_counter_vec!(
        "auth_refreshes_total",
        "Refresh-token rotations by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref LOGOUTS_COUNTER: Counter = register_counter!(
        "auth_logouts_total",
        "Logout requests"
    ).unwrap();

    // ── Session state ───────────────────────────────────────────────────────
    pub static ref ACTIVE_REFRESH_TOKENS_GAUGE: Gauge = register_gauge!(
        "auth_active_refresh_tokens",
        "Refresh tokens neither revoked nor expired"
    ).unwrap();
}

/// Spawn the background collector (refreshes every 5 minutes).
pub fn start(store: Arc<dyn RefreshTokenStore>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = collect(store.as_ref()).await {
                warn!("Metrics: collection failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
        }
    });
}

async fn collect(store: &dyn RefreshTokenStore) -> anyhow::Result<()> {
    let active = store.count_active().await?;
    ACTIVE_REFRESH_TOKENS_GAUGE.set(active as f64);
    debug!("Metrics: {} active refresh token(s)", active);
    Ok(())
}
