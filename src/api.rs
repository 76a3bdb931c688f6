use crate::plugin::PluginError;
use crate::renderer::{
    OrderContext, PageViewInput, StorageType, TrackingScriptRenderer, opt_out_snippet,
    site_from_store_url,
};
use crate::server::AppState;
use crate::settings::SettingsUpdate;
use crate::widget::{inject_into_zone, resolve_widget_zones};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};

const STOREFRONT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Demo Store</title>
</head>
<body>
<main id="content"><h1>Demo Store</h1></main>
<footer id="footer"></footer>
</body>
</html>"#;

fn error_response(err: PluginError) -> Response {
    let status = match &err {
        PluginError::NotInstalled => StatusCode::CONFLICT,
        _ => {
            error!(?err, "widget operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

/// Visitor flags coming from the consent banner.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VisitorQuery {
    #[serde(default = "default_consent")]
    pub consent: bool,
    #[serde(default)]
    pub optout: bool,
}

fn default_consent() -> bool {
    true
}

impl Default for VisitorQuery {
    fn default() -> Self {
        Self {
            consent: default_consent(),
            optout: false,
        }
    }
}

fn page_view_input(google_id: &str, visitor: VisitorQuery) -> PageViewInput {
    PageViewInput {
        opt_out_snippet: if visitor.optout {
            opt_out_snippet(google_id)
        } else {
            String::new()
        },
        storage_type: StorageType::from_consent(visitor.consent),
        ecommerce: String::new(),
    }
}

pub async fn storefront(
    State(state): State<AppState>,
    Query(visitor): Query<VisitorQuery>,
) -> impl IntoResponse {
    let plugin = &state.plugin;
    if !plugin.is_active().await {
        return Html(STOREFRONT_HTML.to_string()).into_response();
    }
    let settings = match plugin.settings().await {
        Ok(settings) => settings,
        Err(PluginError::NotInstalled) => {
            debug!("widget not installed; serving page without tracking");
            return Html(STOREFRONT_HTML.to_string()).into_response();
        }
        Err(err) => return error_response(err),
    };

    let input = page_view_input(&settings.google_id, visitor);
    let script = TrackingScriptRenderer::render_page_view(&settings, &input);
    let mut html = STOREFRONT_HTML.to_string();
    for zone in resolve_widget_zones(&settings) {
        match inject_into_zone(&html, &zone, &script) {
            Ok(injected) => html = injected,
            Err(err) => warn!(%zone, ?err, "failed to inject tracking script"),
        }
    }
    Html(html).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub visitor: VisitorQuery,
    #[serde(default)]
    pub order: Option<OrderContext>,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub zone: String,
    pub script: String,
}

pub async fn render_script(
    State(state): State<AppState>,
    Json(body): Json<RenderRequest>,
) -> impl IntoResponse {
    let plugin = &state.plugin;
    let settings = match plugin.settings().await {
        Ok(settings) => settings,
        Err(err) => return error_response(err),
    };
    let zones = resolve_widget_zones(&settings);
    let zone = match body.zone {
        Some(zone) if zones.contains(&zone) => zone,
        Some(zone) => {
            return (
                StatusCode::NOT_FOUND,
                format!("widget is not rendered in zone {zone}"),
            )
                .into_response();
        }
        None => zones[0].clone(),
    };

    let input = page_view_input(&settings.google_id, body.visitor);
    let order = body.order.map(|mut order| {
        if order.site.is_empty() {
            order.site = site_from_store_url(&state.config.store_url);
        }
        order.script_safe()
    });
    let script = TrackingScriptRenderer::render_tracking(&settings, &input, order.as_ref());
    Json(RenderResponse { zone, script }).into_response()
}

pub async fn widget_zones(State(state): State<AppState>) -> impl IntoResponse {
    match state.plugin.widget_zones().await {
        Ok(zones) => Json(json!({ "zones": zones })).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn routes(State(state): State<AppState>) -> impl IntoResponse {
    let plugin = &state.plugin;
    let display: Vec<_> = match plugin.widget_zones().await {
        Ok(zones) => zones
            .iter()
            .map(|zone| plugin.display_widget_route(zone))
            .collect(),
        Err(PluginError::NotInstalled) => vec![],
        Err(err) => return error_response(err),
    };
    Json(json!({
        "configuration": plugin.configuration_route(),
        "display": display,
    }))
    .into_response()
}

pub async fn cookie_info(State(state): State<AppState>) -> impl IntoResponse {
    match state.plugin.cookie_info().await {
        Some(info) => Json(info).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn get_configuration(State(state): State<AppState>) -> impl IntoResponse {
    match state.plugin.settings().await {
        Ok(settings) => Json(json!({
            "settings": settings,
            "route": state.plugin.configuration_route(),
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn post_configuration(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    match state.plugin.configure(update).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn install(State(state): State<AppState>) -> impl IntoResponse {
    match state.plugin.install().await {
        Ok(()) => Json(json!({ "state": "installed" })).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn uninstall(State(state): State<AppState>) -> impl IntoResponse {
    match state.plugin.uninstall().await {
        Ok(()) => Json(json!({ "state": "uninstalled" })).into_response(),
        Err(err) => error_response(err),
    }
}
