use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::{AuthError, RejectReason},
    models::auth::{AuthenticatedUser, Claims},
    services::tokens::TokenSigner,
    AppState,
};

/// Routes reachable without an access token. Everything else goes through the gate.
pub static PUBLIC_ROUTES: &[(Method, &str)] = &[
    (Method::POST, "/auth/login"),
    (Method::POST, "/auth/refresh"),
    (Method::POST, "/auth/logout"),
    (Method::GET, "/setup/status"),
    (Method::POST, "/setup"),
    (Method::GET, "/health"),
    (Method::GET, "/metrics"),
];

/// HEAD is answered by the GET handler, so it shares the GET entry.
pub fn is_public(method: &Method, path: &str) -> bool {
    let head = *method == Method::HEAD;
    PUBLIC_ROUTES
        .iter()
        .any(|(m, p)| *p == path && (m == method || (head && *m == Method::GET)))
}

/// Verifies the bearer token of every non-public request and attaches the
/// caller as an [`AuthenticatedUser`] request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if is_public(req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let user = authenticate(req.headers(), &state.signer)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub fn authenticate(headers: &HeaderMap, signer: &TokenSigner) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)
        .ok_or(AuthError::Unauthorized(RejectReason::MissingAccessToken))?;
    let claims = signer.verify(token)?;
    principal_from_claims(claims)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn principal_from_claims(claims: Claims) -> Result<AuthenticatedUser, AuthError> {
    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AuthError::Unauthorized(RejectReason::InvalidAccessToken))?;
    Ok(AuthenticatedUser {
        user_id,
        email: claims.email.clone(),
        role: claims.role,
        claims,
    })
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::Unauthorized(RejectReason::MissingAccessToken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    fn claims(sub: String) -> Claims {
        let now = Utc::now().timestamp() as usize;
        Claims {
            sub,
            email: "a@x.com".into(),
            role: UserRole::Dev,
            iat: now,
            exp: now + 60,
        }
    }

    #[test]
    fn test_public_allow_list() {
        assert!(is_public(&Method::POST, "/auth/login"));
        assert!(is_public(&Method::POST, "/auth/logout"));
        assert!(!is_public(&Method::GET, "/auth/login"));
        assert!(!is_public(&Method::GET, "/auth/me"));
        assert!(!is_public(&Method::POST, "/auth/login/"));
    }

    #[test]
    fn test_head_follows_get_entry() {
        assert!(is_public(&Method::HEAD, "/health"));
        assert!(is_public(&Method::HEAD, "/metrics"));
        assert!(is_public(&Method::HEAD, "/setup/status"));
        assert!(!is_public(&Method::HEAD, "/auth/me"));
        assert!(!is_public(&Method::HEAD, "/auth/login"));
    }

    #[test]
    fn test_bearer_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_authenticate_valid_token() {
        let signer = TokenSigner::new("s", 900);
        let id = Uuid::new_v4();
        let token = signer.sign(&claims(id.to_string())).unwrap();

        let user = authenticate(&headers(&format!("Bearer {token}")), &signer).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.role, UserRole::Dev);
    }

    #[test]
    fn test_authenticate_rejects_missing_and_invalid() {
        let signer = TokenSigner::new("s", 900);

        let err = authenticate(&HeaderMap::new(), &signer).unwrap_err();
        assert_eq!(err.reject_reason(), Some(RejectReason::MissingAccessToken));

        let err = authenticate(&headers("Bearer nope"), &signer).unwrap_err();
        assert_eq!(err.reject_reason(), Some(RejectReason::InvalidAccessToken));

        // Well-signed but the subject is not a user id
        let token = signer.sign(&claims("not-a-uuid".into())).unwrap();
        let err = authenticate(&headers(&format!("Bearer {token}")), &signer).unwrap_err();
        assert_eq!(err.reject_reason(), Some(RejectReason::InvalidAccessToken));
    }
}
