use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::{ApiError, AppState};
use crate::services::hash::sha224_hex;

/// Operator authentication. Accepts the configured key via:
/// 1. `X-Api-Key` header
/// 2. `Authorization: Bearer <api_key>` header
///
/// With no key configured every operator route is refused.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config().server.api_key.as_deref() else {
        return ApiError::Forbidden("Operator API is disabled: no api_key configured".to_string())
            .into_response();
    };

    match extract_api_key(&headers) {
        Some(key) if keys_match(&key, expected) => {
            tracing::Span::current().record("user_id", "operator");
            next.run(request).await
        }
        _ => ApiError::Unauthorized("Unauthorized".to_string()).into_response(),
    }
}

/// Digests first, so neither the key length nor a shared prefix shows in timing.
fn keys_match(presented: &str, expected: &str) -> bool {
    let a = sha224_hex(presented);
    let b = sha224_hex(expected);
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}
