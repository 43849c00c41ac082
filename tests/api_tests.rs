use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use hy2_admin::clients::github::ReleaseFeed;
use hy2_admin::config::Config;
use hy2_admin::db::{AccountRepository, Store};
use hy2_admin::models::release::{Release, ReleaseAsset};
use hy2_admin::services::release::platform_asset_name;
use hy2_admin::state::SharedState;
use tower::ServiceExt;

const API_KEY: &str = "test-operator-key";

/// Seeded by the initial migration.
const BOOTSTRAP_SECRET: &str = "admin.admin";

struct StaticFeed(Vec<Release>);

#[async_trait::async_trait]
impl ReleaseFeed for StaticFeed {
    async fn list_releases(&self) -> anyhow::Result<Vec<Release>> {
        Ok(self.0.clone())
    }
}

fn release(tag: &str) -> Release {
    Release {
        tag_name: tag.to_string(),
        assets: vec![ReleaseAsset {
            name: platform_asset_name().unwrap_or_default(),
            browser_download_url: String::new(),
        }],
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = format!(
        "sqlite:{}",
        std::env::temp_dir()
            .join(format!("hy2-admin-test-{}.db", uuid::Uuid::new_v4()))
            .display()
    );
    config.server.api_key = Some(API_KEY.to_string());
    config.server.auth_min_response_ms = 0;
    config.hysteria2.listen_port = 8443;
    config
}

async fn spawn_app_with(config: Config) -> Router {
    spawn_app_with_store(config).await.0
}

async fn spawn_app_with_store(config: Config) -> (Router, Store) {
    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open store");
    let feed = Arc::new(StaticFeed(vec![
        release("app/v2.6.0"),
        release("app/v2.4.4"),
        release("app/v2.4.3"),
        release("app/v2.3.0"),
    ]));

    let shared = Arc::new(SharedState::with_parts(config, store.clone(), feed));
    let state = hy2_admin::api::create_app_state(shared, None);
    (hy2_admin::api::router(state), store)
}

async fn spawn_app() -> Router {
    spawn_app_with(test_config()).await
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

fn auth_request(secret: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/hui/hysteria2/auth")
        .header("Content-Type", "application/json")
        .body(Body::from(
            serde_json::json!({"addr": "203.0.113.9:51234", "auth": secret, "tx": 0}).to_string(),
        ))
        .unwrap()
}

fn operator_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Api-Key", API_KEY)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_auth_callback_grants_and_denies_with_200() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(auth_request(BOOTSTRAP_SECRET)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"ok": true, "id": "admin"})
    );

    let response = app.clone().oneshot(auth_request("admin.wrong")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"ok": false, "id": ""})
    );

    let response = app.clone().oneshot(auth_request("")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], false);
}

#[tokio::test]
async fn test_auth_callback_respects_response_floor() {
    let mut config = test_config();
    config.server.auth_min_response_ms = 150;
    let app = spawn_app_with(config).await;

    let started = Instant::now();
    let response = app.clone().oneshot(auth_request("nobody.pw")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_kick_denies_until_deadline() {
    let app = spawn_app().await;
    let far_future = chrono::Utc::now().timestamp_millis() + 3_600_000;

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/kick",
            serde_json::json!({"ids": [1, 999], "kick_until": far_future}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["updated"], 1);

    let response = app.clone().oneshot(auth_request(BOOTSTRAP_SECRET)).await.unwrap();
    assert_eq!(body_json(response).await["ok"], false);

    // A deadline in the past lifts the kick.
    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/kick",
            serde_json::json!({"ids": [1], "kick_until": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(auth_request(BOOTSTRAP_SECRET)).await.unwrap();
    assert_eq!(body_json(response).await["ok"], true);
}

#[tokio::test]
async fn test_operator_routes_require_api_key() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/hysteria2/releases")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/hysteria2/releases")
                .header("Authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/hysteria2/releases")
                .header("Authorization", format!("Bearer {API_KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_operator_routes_disabled_without_key() {
    let mut config = test_config();
    config.server.api_key = None;
    let app = spawn_app_with(config).await;

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/kick",
            serde_json::json!({"ids": [1], "kick_until": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_release_listing_stops_at_floor() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/hysteria2/releases")
                .header("X-Api-Key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["min_version"], "2.4.4");
    assert_eq!(
        json["data"]["versions"],
        serde_json::json!(["v2.6.0", "v2.4.4"])
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/hysteria2/releases?min_version=banana")
                .header("X-Api-Key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clash_subscription_headers() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/hui/admin.admin")
                .header(header::USER_AGENT, "ClashMetaForAndroid/2.10")
                .header(header::HOST, "panel.example.com:8081")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=hui.yaml"
    );
    assert_eq!(headers["profile-update-interval"], "12");
    let user_info = headers["subscription-userinfo"].to_str().unwrap();
    assert!(user_info.starts_with("upload=0; download=0; total=-1; expire="));

    let yaml: serde_yaml::Value = serde_yaml::from_str(&body_text(response).await).unwrap();
    assert_eq!(yaml["proxies"][0]["server"], "panel.example.com");
    assert_eq!(yaml["proxies"][0]["port"], 8443);
    assert_eq!(yaml["proxies"][0]["password"], BOOTSTRAP_SECRET);
}

#[tokio::test]
async fn test_v2rayn_subscription_is_base64_url() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/hui/admin.admin")
                .header(header::USER_AGENT, "v2rayN/6.23")
                .header(header::HOST, "panel.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());

    let decoded = String::from_utf8(STANDARD.decode(body_text(response).await).unwrap()).unwrap();
    assert!(decoded.starts_with("hysteria2://admin.admin@panel.example.com:8443/"));
}

#[tokio::test]
async fn test_subscription_unknown_secret_is_404() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/hui/ghost.secret")
                .header(header::HOST, "panel.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_connection_and_subscribe_urls() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/url",
            serde_json::json!({"account_id": 1, "hostname": "proxy.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let url = body_json(response).await["data"]["url"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(url.starts_with("hysteria2://admin.admin@proxy.example.com:8443/"));

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/subscribe-url",
            serde_json::json!({"account_id": 1, "protocol": "https", "host": "panel.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["url"],
        "https://panel.example.com/hui/admin.admin"
    );

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/subscribe-url",
            serde_json::json!({"account_id": 1, "protocol": "ftp", "host": "panel.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/url",
            serde_json::json!({"account_id": 42, "hostname": "proxy.example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["database"], true);
    assert!(json["data"]["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_auth_callback_malformed_body_is_denied() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/hui/hysteria2/auth")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], false);
}

#[tokio::test]
async fn test_kick_skips_non_positive_ids() {
    let app = spawn_app().await;
    let far_future = chrono::Utc::now().timestamp_millis() + 3_600_000;

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/kick",
            serde_json::json!({"ids": [1, 0, -5], "kick_until": far_future}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["updated"], 1);

    let response = app.clone().oneshot(auth_request(BOOTSTRAP_SECRET)).await.unwrap();
    assert_eq!(body_json(response).await["ok"], false);
}

#[tokio::test]
async fn test_kick_accepts_negative_deadline() {
    let (app, store) = spawn_app_with_store(test_config()).await;

    let response = app
        .clone()
        .oneshot(operator_post(
            "/api/hysteria2/kick",
            serde_json::json!({"ids": [1], "kick_until": -1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["updated"], 1);

    let account = store.accounts().find_by_id(1).await.unwrap().unwrap();
    assert_eq!(account.denied_until, Some(-1));

    let response = app.clone().oneshot(auth_request(BOOTSTRAP_SECRET)).await.unwrap();
    assert_eq!(body_json(response).await["ok"], true);
}

#[tokio::test]
async fn test_auth_callback_records_last_connection() {
    let (app, store) = spawn_app_with_store(test_config()).await;
    let accounts = store.accounts();

    let before = accounts.find_by_id(1).await.unwrap().unwrap();
    assert_eq!(before.last_connected_at, None);

    let started = chrono::Utc::now().timestamp_millis();
    let response = app.clone().oneshot(auth_request(BOOTSTRAP_SECRET)).await.unwrap();
    assert_eq!(body_json(response).await["ok"], true);

    let after = accounts.find_by_id(1).await.unwrap().unwrap();
    let seen = after.last_connected_at.expect("last_connected_at not written");
    assert!(seen >= started);

    // Denials leave it alone.
    let response = app.clone().oneshot(auth_request("admin.nope")).await.unwrap();
    assert_eq!(body_json(response).await["ok"], false);
    let again = accounts.find_by_id(1).await.unwrap().unwrap();
    assert_eq!(again.last_connected_at, Some(seen));
}
