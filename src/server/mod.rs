use crate::catalog::{self, CatalogSource, CatalogStore};
use crate::config::Config;
use crate::delivery::DeliverySelector;
use crate::fetch::{self, CacheSettings, FetchCache, Fetcher, HttpFetcher};
use crate::session::{self, SessionStore};
use crate::share::ShareLinkBuilder;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod error;
pub mod routes_api;
pub mod routes_view;

/// Interval of the expired-session sweep.
const SESSION_SWEEP_SECS: u64 = 60;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Current catalog snapshot, replaced on reload
    pub catalog: Arc<CatalogStore>,
    /// Where reloads read from (absent when no source is configured)
    pub catalog_source: Option<Arc<dyn CatalogSource>>,
    pub fetch_cache: Arc<FetchCache>,
    pub sessions: SessionStore,
    pub selector: Arc<DeliverySelector>,
}

impl AppContext {
    /// Build a context around an explicit fetcher.
    pub fn new(
        config: Config,
        catalog: Arc<CatalogStore>,
        catalog_source: Option<Arc<dyn CatalogSource>>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let settings = CacheSettings::from(&config.cache);
        Self {
            catalog,
            catalog_source,
            fetch_cache: Arc::new(FetchCache::new(fetcher, settings)),
            sessions: SessionStore::from_config(&config.auth),
            selector: Arc::new(DeliverySelector::new(ShareLinkBuilder::new(
                config.server.public_base_url.clone(),
            ))),
            config: Arc::new(config),
        }
    }

    /// Context with the HTTP fetcher and the configured catalog source.
    pub fn from_config(config: Config) -> Self {
        let source: Option<Arc<dyn CatalogSource>> = config
            .catalog
            .source
            .as_deref()
            .map(|location| Arc::from(catalog::source_for(location)));
        let fetcher = Arc::new(HttpFetcher::new(std::time::Duration::from_secs(
            config.cache.fetch_timeout_secs,
        )));
        Self::new(config, Arc::new(CatalogStore::new()), source, fetcher)
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(&ctx))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(ctx)
}

fn api_routes(ctx: &AppContext) -> Router<AppContext> {
    // Auth routes and the view entry point are always reachable; the view
    // itself decides between external share, login, and internal listing.
    let open_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::auth_status))
        .merge(routes_view::view_routes());

    let protected_routes = routes_api::api_routes().layer(middleware::from_fn_with_state(
        ctx.clone(),
        auth::session_auth_middleware,
    ));

    open_routes.merge(protected_routes)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Spawn catalog reloads, session cleanup, and cache sweeps.
pub async fn start_background_tasks(ctx: &AppContext) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(source) = ctx.catalog_source.clone() {
        let interval = ctx.config.catalog.reload_interval_secs;
        if interval > 0 {
            handles.push(catalog::start_reload_task(
                Arc::clone(&ctx.catalog),
                source,
                interval,
            ));
        } else {
            // Failures are logged by reload; serve the empty snapshot meanwhile.
            let _ = ctx.catalog.reload(source.as_ref()).await;
        }
    }

    handles.push(session::start_cleanup_task(
        ctx.sessions.clone(),
        SESSION_SWEEP_SECS,
    ));

    let sweep = ctx.config.cache.sweep_interval_secs;
    if sweep > 0 {
        handles.push(fetch::start_sweep_task(Arc::clone(&ctx.fetch_cache), sweep));
    }

    handles
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(config);
    let tasks = start_background_tasks(&ctx).await;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in &tasks {
        task.abort();
    }
    futures::future::join_all(tasks).await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
