//! Proxy data-plane callback, client subscriptions and operator controls.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::validation::{validate_account_id, validate_kick_ids};
use super::{
    ApiError, ApiResponse, AppState, ConnectionUrlRequest, Hysteria2AuthRequest,
    Hysteria2AuthResponse, KickRequest, KickResponse, ReleaseListResponse, ReleaseQuery,
    SubscribeUrlRequest, UrlResponse,
};
use crate::services::ClientFamily;
use crate::services::subscription::Delivery;

/// `POST /hui/hysteria2/auth`
///
/// Always 200. The reply is held until the configured floor has elapsed so
/// grants and denials take the same time.
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Hysteria2AuthRequest>, JsonRejection>,
) -> Json<Hysteria2AuthResponse> {
    let started = Instant::now();
    let floor = Duration::from_millis(state.config().server.auth_min_response_ms);

    // A malformed body is just another denial.
    let payload = payload.map_or_else(
        |e| {
            tracing::debug!(error = %e, "Unreadable auth callback body");
            Hysteria2AuthRequest::default()
        },
        |Json(p)| p,
    );

    let reply = match state.shared.access_service.authenticate(&payload.auth).await {
        Ok(grant) => {
            tracing::debug!(
                account_id = grant.account_id,
                addr = %payload.addr,
                tx = payload.tx,
                "Proxy session accepted"
            );
            Hysteria2AuthResponse::granted(grant.username)
        }
        Err(_) => Hysteria2AuthResponse::denied(),
    };

    tokio::time::sleep_until(started + floor).await;
    Json(reply)
}

/// `GET /hui/{connection_secret}`
///
/// The client family comes from `User-Agent`, the proxy host from `Host`.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(connection_secret): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_agent = header_str(&headers, header::USER_AGENT);
    let host = header_str(&headers, header::HOST);
    let family = ClientFamily::detect(user_agent);

    let subscription = state
        .shared
        .subscription_service
        .build(&connection_secret, family, host)
        .await?;

    let mut response = (StatusCode::OK, subscription.body).into_response();

    if let Delivery::Attachment {
        filename,
        update_interval_hours,
    } = &subscription.delivery
    {
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_DISPOSITION,
            header_value(&format!("attachment; filename={filename}"))?,
        );
        headers.insert(
            "profile-update-interval",
            HeaderValue::from(*update_interval_hours),
        );
        headers.insert(
            "subscription-userinfo",
            header_value(&subscription.user_info)?,
        );
    }

    Ok(response)
}

/// `POST /api/hysteria2/kick`
pub async fn kick(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<KickRequest>,
) -> Result<Json<ApiResponse<KickResponse>>, ApiError> {
    let ids = validate_kick_ids(&payload.ids)?;
    let updated = state
        .shared
        .kick_service
        .kick(ids, payload.kick_until)
        .await?;
    Ok(Json(ApiResponse::success(KickResponse { updated })))
}

/// `GET /api/hysteria2/releases?min_version=&asset=`
pub async fn list_releases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReleaseQuery>,
) -> Result<Json<ApiResponse<ReleaseListResponse>>, ApiError> {
    let service = &state.shared.release_service;
    let min_version = query
        .min_version
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| service.default_min_version().to_string());

    let versions = service
        .list_compatible(Some(min_version.as_str()), query.asset.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(ReleaseListResponse {
        min_version,
        versions,
    })))
}

/// `POST /api/hysteria2/url`
pub async fn connection_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConnectionUrlRequest>,
) -> Result<Json<ApiResponse<UrlResponse>>, ApiError> {
    let account_id = validate_account_id(payload.account_id)?;
    let url = state
        .shared
        .subscription_service
        .connection_url(account_id, &payload.hostname)
        .await?;

    Ok(Json(ApiResponse::success(UrlResponse { url })))
}

/// `POST /api/hysteria2/subscribe-url`
pub async fn subscribe_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubscribeUrlRequest>,
) -> Result<Json<ApiResponse<UrlResponse>>, ApiError> {
    let account_id = validate_account_id(payload.account_id)?;
    let url = state
        .shared
        .subscription_service
        .subscribe_url(account_id, &payload.protocol, &payload.host)
        .await?;

    Ok(Json(ApiResponse::success(UrlResponse { url })))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::internal(format!("Invalid header value '{value}': {e}")))
}
