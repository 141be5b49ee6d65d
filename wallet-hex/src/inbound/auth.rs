//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use wallet_types::{ErrorResponse, LedgerStore, RateSource};

use super::handlers::{ApiError, AppState, AuthenticatedUser};

/// Paths reachable without a key.
const PUBLIC_PREFIXES: &[&str] = &["/api-docs", "/swagger-ui"];
const PUBLIC_PATHS: &[&str] = &["/health", "/api/v1/register"];

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    let key = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!key.is_empty()).then_some(key)
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Resolves the bearer key to a user and stores it as an [`AuthenticatedUser`]
/// request extension. Unknown or missing keys get 401.
pub async fn auth_middleware<S: LedgerStore, R: RateSource>(
    State(state): State<Arc<AppState<S, R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(api_key) = extract_api_key(auth_header) else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    match state.service.authenticate(api_key).await {
        Ok(Some(user_id)) => {
            request.extensions_mut().insert(AuthenticatedUser(user_id));
            next.run(request).await
        }
        Ok(None) => unauthorized_response("Invalid API key"),
        Err(e) => ApiError(e).into_response(),
    }
}

fn unauthorized_response(message: &str) -> Response {
    tracing::debug!(reason = message, "unauthenticated request");
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: StatusCode::UNAUTHORIZED.as_u16(),
            kind: "Unauthorized".into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_api_key_bearer() {
        assert_eq!(extract_api_key(Some("Bearer wk_test_123")), Some("wk_test_123"));
    }

    #[test]
    fn test_extract_api_key_raw() {
        assert_eq!(extract_api_key(Some("wk_test_123")), Some("wk_test_123"));
    }

    #[test]
    fn test_extract_api_key_empty() {
        assert_eq!(extract_api_key(None), None);
        assert_eq!(extract_api_key(Some("Bearer ")), None);
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/v1/register"));
        assert!(is_public("/swagger-ui/index.html"));
        assert!(is_public("/api-docs/openapi.json"));
        assert!(!is_public("/api/v1/balance"));
    }
}
