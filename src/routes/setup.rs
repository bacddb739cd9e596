use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AuthError,
    models::user::{PublicUser, SetupRequest, SetupStatus},
    AppState,
};

/// GET /setup/status reports whether the first superadmin still has to be created.
pub async fn status(State(state): State<AppState>) -> Result<Json<SetupStatus>, AuthError> {
    state.setup.status().await.map(Json)
}

/// POST /setup
pub async fn create_superadmin(
    State(state): State<AppState>,
    payload: Result<Json<SetupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let Json(body) = payload?;
    let user = state.setup.create_superadmin(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
