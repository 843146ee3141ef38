//! Integration tests for the delivery entry point (`GET /api/view`).

mod common;

use axum::http::StatusCode;
use common::{body_json, TestHarness, SAMPLE_NAME};
use voxlink::share;

#[tokio::test]
async fn external_share_by_id_serves_inline_player() {
    let h = TestHarness::new().await;
    let provider = h.provider.uri();

    let response = h.get("/api/view?id=42").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"], "external");
    assert_eq!(json["entry"]["id"], "42");
    assert_eq!(json["search_enabled"], false);

    assert_eq!(json["stream"]["kind"], "inline_player");
    assert_eq!(json["stream"]["url"], format!("{provider}/x?a=1&download=1"));
    assert_eq!(json["stream"]["download_suppressed"], true);
    // Everything the share viewer needs is embedded; no session route is offered.
    assert!(json["stream"].get("fetch_path").is_none());
    assert_eq!(json["redirect"]["kind"], "redirect");
    assert_eq!(json["redirect"]["variant"], "mobile");

    let data_uri = json["inline"]["data_uri"].as_str().unwrap();
    assert!(data_uri.starts_with("data:audio/mpeg;base64,"));
    assert!(json.get("playback_unavailable").is_none());
}

#[tokio::test]
async fn external_share_by_legacy_name() {
    let h = TestHarness::new().await;

    let uri = format!("/api/view?n={}", share::encode(SAMPLE_NAME));
    let response = h.get(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"], "external");
    assert_eq!(json["entry"]["id"], "42");
    assert_eq!(json["entry"]["name"], SAMPLE_NAME);
}

#[tokio::test]
async fn id_wins_over_legacy_name() {
    let h = TestHarness::new().await;

    let response = h.get("/api/view?id=7&n=whatever").await;
    let json = body_json(response.into_body()).await;
    assert_eq!(json["entry"]["id"], "7");
}

#[tokio::test]
async fn unknown_share_id_is_not_found() {
    let h = TestHarness::new().await;

    let response = h.get("/api/view?id=99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"], "not_found");
    assert_eq!(json["key"]["by"], "id");
    assert_eq!(json["key"]["value"], "99");
    assert_eq!(json["back_to"], "/");
    assert_eq!(h.provider_hits("/x").await, 0);
}

#[tokio::test]
async fn external_share_needs_no_session() {
    let mut config = voxlink::config::Config::default();
    config.auth.secret = None;
    let h = TestHarness::with_config(config).await;

    let response = h.get("/api/view?id=42").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn external_share_links_only_reachable_routes() {
    let h = TestHarness::new().await;

    let json = body_json(h.get("/api/view?id=42").await.into_body()).await;
    for channel in ["stream", "redirect"] {
        if let Some(path) = json[channel].get("fetch_path").and_then(|p| p.as_str()) {
            let response = h.get(path).await;
            assert_eq!(response.status(), StatusCode::OK, "{channel}: {path}");
        }
    }
    assert!(json["inline"]["data_uri"].is_string());
}

#[tokio::test]
async fn failed_fetch_reports_playback_unavailable() {
    let h = TestHarness::new().await;

    let response = h.get("/api/view?id=7").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"], "external");
    assert!(json.get("inline").is_none());
    assert!(json["playback_unavailable"]
        .as_str()
        .unwrap()
        .contains("404"));
    // The redirect channel stays usable.
    assert_eq!(json["redirect"]["variant"], "mobile");
}

#[tokio::test]
async fn repeated_views_fetch_once() {
    let h = TestHarness::new().await;

    for _ in 0..3 {
        let response = h.get("/api/view?id=42").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(h.provider_hits("/x").await, 1);
}

#[tokio::test]
async fn concurrent_views_share_one_fetch() {
    let h = TestHarness::new().await;

    let requests = (0..8).map(|_| h.get("/api/view?id=42"));
    let responses = futures::future::join_all(requests).await;

    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(h.provider_hits("/x").await, 1);
}

#[tokio::test]
async fn internal_view_requires_login() {
    let h = TestHarness::new().await;

    let response = h.get("/api/view").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"], "login_required");
}

#[tokio::test]
async fn internal_view_lists_catalog_after_login() {
    let h = TestHarness::new().await;
    let cookie = h.login().await;

    let response = h.get_with_cookie("/api/view", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["state"], "internal");
    assert_eq!(json["search_enabled"], true);
    assert_eq!(json["total"], 2);
    assert_eq!(json["limit"], 10);
    assert_eq!(json["has_more"], false);

    let card = &json["cards"][0];
    assert_eq!(card["preview"]["lazy"], true);
    assert_eq!(card["preview"]["fetch_path"], "/api/entries/42/inline");
    assert_eq!(card["open_source"]["variant"], "source");
    assert_eq!(card["share"]["url"], "https://voice.example.com/?id=42");

    // Previews are lazy: listing fetches nothing.
    assert_eq!(h.provider_hits("/x").await, 0);
}

#[tokio::test]
async fn internal_view_filters_and_searches() {
    let h = TestHarness::new().await;
    let cookie = h.login().await;

    let uri = format!("/api/view?voice={}", share::encode("男聲"));
    let json = body_json(h.get_with_cookie(&uri, &cookie).await.into_body()).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["cards"][0]["entry"]["id"], "7");

    let uri = format!("/api/view?voice={}", share::encode("全部"));
    let json = body_json(h.get_with_cookie(&uri, &cookie).await.into_body()).await;
    assert_eq!(json["total"], 2);

    let json = body_json(h.get_with_cookie("/api/view?q=PROMO", &cookie).await.into_body()).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["limit"], 100);
}
