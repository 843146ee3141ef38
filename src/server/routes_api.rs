//! Session-protected routes of the internal browse mode.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use voxlink_common::{CatalogEntry, Error, LinkVariant};

use crate::catalog::{Facets, ReloadSummary};
use crate::fetch::CacheStats;
use crate::links;
use crate::server::{error::ApiError, AppContext};
use crate::share::ShareLinks;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/entries/:id/inline", get(inline_payload))
        .route("/entries/:id/share", post(share_links))
        .route("/catalog/facets", get(facets))
        .route("/catalog/reload", post(reload_catalog))
        .route("/cache/stats", get(cache_stats))
}

fn find_entry(ctx: &AppContext, id: &str) -> Result<CatalogEntry, ApiError> {
    ctx.catalog
        .snapshot()
        .find_by_id(id)
        .cloned()
        .ok_or_else(|| Error::not_found(id).into())
}

#[derive(Serialize)]
struct PlaybackUnavailable {
    error: String,
    /// Link the client can open instead.
    fallback: String,
}

/// Lazily fetch one entry's inline payload through the cache.
async fn inline_payload(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let entry = find_entry(&ctx, &id)?;

    let response = match ctx
        .fetch_cache
        .resolve(entry.raw_link_for(LinkVariant::Player))
        .await
    {
        Ok(payload) => Json(&*payload).into_response(),
        Err(failure) => (
            StatusCode::BAD_GATEWAY,
            Json(PlaybackUnavailable {
                error: Error::fetch(failure.to_string()).to_string(),
                fallback: links::mobile(entry.raw_link_for(LinkVariant::Mobile)),
            }),
        )
            .into_response(),
    };

    Ok(response)
}

async fn share_links(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ShareLinks>, ApiError> {
    let entry = find_entry(&ctx, &id)?;
    let links = ctx.selector.share_links().for_entry(&entry);
    tracing::info!(entry_id = %entry.id, url = %links.url, "Share link minted");
    Ok(Json(links))
}

async fn facets(State(ctx): State<AppContext>) -> Json<Facets> {
    Json(ctx.catalog.snapshot().facets())
}

async fn reload_catalog(State(ctx): State<AppContext>) -> Result<Json<ReloadSummary>, ApiError> {
    let source = ctx
        .catalog_source
        .as_ref()
        .ok_or_else(|| Error::invalid_input("no catalog source configured"))?;

    ctx.catalog
        .reload(source.as_ref())
        .await
        .map(Json)
        .map_err(|e| Error::catalog(e.to_string()).into())
}

async fn cache_stats(State(ctx): State<AppContext>) -> Json<CacheStats> {
    Json(ctx.fetch_cache.stats())
}
