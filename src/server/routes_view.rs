//! Entry point of both viewing modes.
//!
//! `GET /api/view` runs the delivery selector on the request's share
//! parameters and session cookie. External share views are resolved through
//! the fetch cache right away so the viewer gets an inline payload without a
//! cross-origin redirect chain.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use voxlink_common::LinkVariant;

use crate::catalog::SearchFilter;
use crate::delivery::{Delivery, ExternalView, RequestContext};
use crate::fetch::{InlinePayload, Resolution};
use crate::server::{auth, AppContext};

pub fn view_routes() -> Router<AppContext> {
    Router::new().route("/view", get(view))
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(rename = "id")]
    pub share_id: Option<String>,
    #[serde(rename = "n")]
    pub share_name: Option<String>,
    pub voice: Option<String>,
    pub style: Option<String>,
    pub q: Option<String>,
}

/// Filter selections meaning "no filter".
const ALL_SELECTIONS: &[&str] = &["", "all", "全部"];

fn selection(value: Option<String>) -> Option<String> {
    value.filter(|v| !ALL_SELECTIONS.contains(&v.trim().to_lowercase().as_str()))
}

impl From<ViewQuery> for RequestContext {
    fn from(q: ViewQuery) -> Self {
        Self {
            share_id: q.share_id,
            share_name: q.share_name,
            filter: SearchFilter {
                voice: selection(q.voice),
                style: selection(q.style),
                keyword: q.q,
            },
        }
    }
}

/// External view plus the outcome of the inline fetch.
#[derive(Serialize)]
struct ExternalResponse<'a> {
    state: &'static str,
    #[serde(flatten)]
    view: &'a ExternalView,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline: Option<&'a InlinePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    playback_unavailable: Option<String>,
}

impl<'a> ExternalResponse<'a> {
    fn new(view: &'a ExternalView, resolution: &'a Resolution) -> Self {
        Self {
            state: "external",
            view,
            inline: resolution.as_ref().ok().map(|payload| &**payload),
            playback_unavailable: resolution.as_ref().err().map(|e| e.to_string()),
        }
    }
}

async fn view(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Response {
    let request = RequestContext::from(query);
    let snapshot = ctx.catalog.snapshot();
    let authenticated = auth::has_valid_session(&ctx, &jar);

    match ctx.selector.select(&snapshot, &request, authenticated) {
        Delivery::External(view) => {
            let resolution = ctx
                .fetch_cache
                .resolve(view.entry.raw_link_for(LinkVariant::Player))
                .await;
            Json(ExternalResponse::new(&view, &resolution)).into_response()
        }
        delivery @ Delivery::NotFound { .. } => {
            (StatusCode::NOT_FOUND, Json(delivery)).into_response()
        }
        delivery @ Delivery::LoginRequired => {
            (StatusCode::UNAUTHORIZED, Json(delivery)).into_response()
        }
        delivery @ Delivery::Internal(_) => Json(delivery).into_response(),
    }
}
