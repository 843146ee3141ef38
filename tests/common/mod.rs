//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which starts a wiremock provider, loads a small
//! static catalog pointing at it, and builds a full [`AppContext`] with a real
//! HTTP fetcher.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxlink::catalog::{CatalogSource, CatalogStore, RawTable, StaticSource};
use voxlink::config::Config;
use voxlink::fetch::HttpFetcher;
use voxlink::server::{auth::SESSION_COOKIE_NAME, create_router, AppContext};

pub const SECRET: &str = "888";
pub const PUBLIC_BASE: &str = "https://voice.example.com/";
pub const SAMPLE_NAME: &str = "林佩璇_女聲_遠距";
pub const AUDIO: &[u8] = b"ID3\x03\x00fake-mp3-frames";

/// Test harness wrapping a fully-constructed [`AppContext`] and the mock
/// storage provider its catalog points at.
pub struct TestHarness {
    pub ctx: AppContext,
    pub provider: MockServer,
}

impl TestHarness {
    /// Harness with a shared secret configured.
    pub async fn new() -> Self {
        let mut config = Config::default();
        config.auth.secret = Some(SECRET.to_string());
        Self::with_config(config).await
    }

    /// Harness with a custom configuration. The public base URL is always
    /// [`PUBLIC_BASE`].
    pub async fn with_config(mut config: Config) -> Self {
        config.server.public_base_url = PUBLIC_BASE.to_string();

        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(AUDIO),
            )
            .mount(&provider)
            .await;

        let source: Arc<dyn CatalogSource> = Arc::new(StaticSource(catalog_table(&provider.uri())));
        let catalog = Arc::new(CatalogStore::new());
        catalog.reload(source.as_ref()).await.unwrap();

        let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(5)));
        let ctx = AppContext::new(config, catalog, Some(source), fetcher);

        Self { ctx, provider }
    }

    /// Send one request through a fresh router sharing this context.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        create_router(self.ctx.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.send(
            Request::get(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn login_request(&self, secret: &str) -> Response<Body> {
        self.send(
            Request::post("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::json!({ "secret": secret }).to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in with the configured secret and return the `Cookie` header value.
    pub async fn login(&self) -> String {
        let response = self.login_request(SECRET).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login should set the session cookie")
    }

    /// Number of requests the provider received for `path`.
    pub async fn provider_hits(&self, request_path: &str) -> usize {
        self.provider
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}

/// `name=value` of the session cookie set on a response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(SESSION_COOKIE_NAME))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .next()
}

/// Catalog with a playable entry (42), a broken one (7), and a row without
/// a link that is dropped on load.
pub fn catalog_table(provider: &str) -> RawTable {
    let row = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    RawTable {
        headers: row(&["ID", "Name", "Link_Source", "Voice", "Style"]),
        rows: vec![
            row(&["42", SAMPLE_NAME, &format!("{provider}/x?a=1"), "女聲", "廣告"]),
            row(&["7", "promo", &format!("{provider}/missing"), "男聲", "旁白"]),
            row(&["8", "no link", "", "男聲", "旁白"]),
        ],
    }
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}
