use crate::api;
use crate::config::AppConfig;
use crate::plugin::GoogleAnalyticsPlugin;
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub plugin: GoogleAnalyticsPlugin,
}

impl AppState {
    pub fn new(config: AppConfig, plugin: GoogleAnalyticsPlugin) -> Self {
        Self {
            config: Arc::new(config),
            plugin,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let enable_cors = state.config.enable_cors;
    let router = Router::new()
        .route("/", get(api::storefront))
        .route("/api/ga/render", post(api::render_script))
        .route("/api/ga/zones", get(api::widget_zones))
        .route("/api/ga/routes", get(api::routes))
        .route("/api/ga/cookie-info", get(api::cookie_info))
        .route(
            "/admin/ga/configure",
            get(api::get_configuration).post(api::post_configuration),
        )
        .route("/admin/ga/install", post(api::install))
        .route("/admin/ga/uninstall", post(api::uninstall))
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
