use crate::settings::TrackingSettings;
use async_trait::async_trait;
use kuchiki::NodeRef;
use kuchiki::traits::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

pub const DEFAULT_WIDGET_ZONE: &str = "head_html_tag";
pub const BODY_END_WIDGET_ZONE: &str = "body_end_html_tag_before";

pub const PLUGIN_AREA: &str = "SmartStore.GoogleAnalytics";
pub const PLUGIN_CONTROLLER: &str = "WidgetsGoogleAnalytics";

/// Zones the script is rendered into. Always one entry today; the host
/// contract is multi-zone.
pub fn resolve_widget_zones(settings: &TrackingSettings) -> Vec<String> {
    match settings.widget_zone.as_deref().map(str::trim) {
        Some(zone) if !zone.is_empty() => vec![zone.to_string()],
        _ => vec![DEFAULT_WIDGET_ZONE.to_string()],
    }
}

/// Route values handed to the host's MVC router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteValues {
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRoute {
    pub action: String,
    pub controller: String,
    pub route_values: RouteValues,
}

impl PluginRoute {
    pub fn configuration() -> Self {
        Self {
            action: "Configure".into(),
            controller: PLUGIN_CONTROLLER.into(),
            route_values: RouteValues {
                area: PLUGIN_AREA.into(),
                widget_zone: None,
            },
        }
    }

    pub fn display(widget_zone: &str) -> Self {
        Self {
            action: "PublicInfo".into(),
            controller: PLUGIN_CONTROLLER.into(),
            route_values: RouteValues {
                area: PLUGIN_AREA.into(),
                widget_zone: Some(widget_zone.to_string()),
            },
        }
    }
}

/// Host service deciding whether a widget is enabled for the current store.
#[async_trait]
pub trait WidgetRegistry: Send + Sync {
    async fn is_widget_active(&self, system_name: &str) -> bool;
}

/// Registry holding the set of active widget system names.
#[derive(Default)]
pub struct StaticWidgetRegistry {
    active: RwLock<HashSet<String>>,
}

impl StaticWidgetRegistry {
    pub fn new<I, S>(active: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: RwLock::new(active.into_iter().map(Into::into).collect()),
        }
    }

    pub async fn set_active(&self, system_name: &str, active: bool) {
        let mut set = self.active.write().await;
        if active {
            set.insert(system_name.to_string());
        } else {
            set.remove(system_name);
        }
    }
}

#[async_trait]
impl WidgetRegistry for StaticWidgetRegistry {
    async fn is_widget_active(&self, system_name: &str) -> bool {
        self.active.read().await.contains(system_name)
    }
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("html manipulation failed: {0}")]
    Html(String),
}

/// CSS selector of the element a zone renders into.
pub fn zone_selector(zone: &str) -> String {
    match zone {
        DEFAULT_WIDGET_ZONE => "head".to_string(),
        BODY_END_WIDGET_ZONE => "body".to_string(),
        other => format!("#{other}"),
    }
}

/// Appends `content` to the element backing `zone`. If no element matches,
/// the document is returned unchanged.
pub fn inject_into_zone(html: &str, zone: &str, content: &str) -> Result<String, InjectError> {
    let document = kuchiki::parse_html().one(html);
    let selector = zone_selector(zone);
    if !append_to_selector(&document, &selector, content)? {
        warn!(zone, %selector, "widget zone not present in document");
    }
    Ok(document.to_string())
}

fn append_to_selector(
    document: &NodeRef,
    selector: &str,
    new_html: &str,
) -> Result<bool, InjectError> {
    let mut nodes = document
        .select(selector)
        .map_err(|e| InjectError::Html(format!("query selector {selector} failed: {e:?}")))?;
    let Some(target) = nodes.next() else {
        return Ok(false);
    };

    // Parse inside a body wrapper so script and comment nodes survive in order.
    let wrapper_html = format!("<div id=\"__ga_widget_wrapper\">{new_html}</div>");
    let fragment_doc = kuchiki::parse_html().one(wrapper_html);
    let mut frag_nodes = fragment_doc
        .select("#__ga_widget_wrapper")
        .map_err(|e| InjectError::Html(format!("select wrapper failed: {e:?}")))?;
    if let Some(wrapper) = frag_nodes.next() {
        let children: Vec<_> = wrapper.as_node().children().collect();
        for child in children {
            target.as_node().append(child);
        }
    }
    Ok(true)
}
