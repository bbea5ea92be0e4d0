//! services/api/src/web/middleware.rs
//!
//! Session-cookie authentication for the protected routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::state::AppState;

/// Pulls the opaque session id out of the request's `Cookie` header.
pub(crate) fn session_id_from_cookies(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|part| part.trim().strip_prefix("session="))
}

/// Rejects the request with 401 unless the session cookie resolves to a live
/// auth session; hands the resolved user id to the handler through request
/// extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id = session_id_from_cookies(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let user_id = state
        .identity
        .validate_auth_session(session_id)
        .await
        .map_err(|e| {
            warn!("Rejected a request with an invalid session cookie: {e:?}");
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_id_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_id_from_cookies(&headers), Some("abc-123"));
    }

    #[test]
    fn missing_or_foreign_cookies_yield_none() {
        assert_eq!(session_id_from_cookies(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_id_from_cookies(&headers), None);
    }
}
