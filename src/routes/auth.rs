use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{AuthError, RejectReason},
    models::{
        auth::{AuthenticatedUser, Claims, LoginResponse, RefreshResponse},
        user::LoginRequest,
    },
    AppState,
};

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Extract a named cookie value from request headers.
fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(&prefix)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
}

/// `Set-Cookie` value carrying a refresh token. Max-Age tracks the token's own validity window.
fn refresh_cookie(state: &AppState, token: &str) -> String {
    let max_age = state.sessions.refresh_ttl().num_seconds();
    let mut cookie =
        format!("{REFRESH_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}");
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_refresh_cookie(state: &AppState) -> String {
    let mut cookie = format!("{REFRESH_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0");
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(body) = payload?;
    let outcome = state.sessions.login(&body.email, &body.password).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, refresh_cookie(&state, &outcome.refresh_token))],
        Json(LoginResponse {
            access_token: outcome.access_token,
            user: outcome.user,
        }),
    )
        .into_response())
}

/// POST /auth/refresh rotates the refresh-token cookie.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let raw = get_cookie(&headers, REFRESH_COOKIE)
        .ok_or(AuthError::Unauthorized(RejectReason::MissingRefreshToken))?;

    let tokens = state.sessions.refresh(&raw).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, refresh_cookie(&state, &tokens.refresh_token))],
        Json(RefreshResponse {
            access_token: tokens.access_token,
        }),
    )
        .into_response())
}

/// POST /auth/logout always returns 204 and the cookie is cleared either way.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let raw = get_cookie(&headers, REFRESH_COOKIE);
    state.sessions.logout(raw.as_deref()).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_refresh_cookie(&state))],
    )
        .into_response())
}

/// GET /auth/me returns the decoded access-token claims of the caller.
pub async fn me(user: AuthenticatedUser) -> Json<Claims> {
    Json(user.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=abc123; other=1"),
        );
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_ignores_prefix_collisions_and_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("old_refresh_token=x; refresh_token="),
        );
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE), None);
    }

    #[test]
    fn test_get_cookie_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("refresh_token=zz"));
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("zz"));
    }
}
