use crate::cookies::{CookieDisclosure, resolve_cookie_disclosure};
use crate::localization::{CatalogError, PluginDescriptor, ResourceCatalog};
use crate::renderer::{OrderContext, PageViewInput, TrackingScriptRenderer};
use crate::settings::{SettingsStore, SettingsUpdate, StoreError, TrackingSettings};
use crate::template::{TemplateKind, TemplateWarning, inspect_template};
use crate::widget::{PluginRoute, WidgetRegistry, resolve_widget_zones};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Display name key used by releases that registered the widget under its
/// old system name.
pub const LEGACY_FRIENDLY_NAME_KEY: &str = "Plugins.FriendlyName.Widgets.GoogleAnalytics";

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("settings store failed: {0}")]
    Store(#[from] StoreError),
    #[error("resource catalog failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("widget is not installed")]
    NotInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Uninstalled,
    Installed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureOutcome {
    pub settings: TrackingSettings,
    pub warnings: Vec<TemplateWarning>,
}

/// The Google Analytics widget as seen by the host application.
#[derive(Clone)]
pub struct GoogleAnalyticsPlugin {
    descriptor: Arc<PluginDescriptor>,
    settings: Arc<dyn SettingsStore>,
    resources: Arc<dyn ResourceCatalog>,
    widgets: Arc<dyn WidgetRegistry>,
}

impl GoogleAnalyticsPlugin {
    pub fn new(
        descriptor: PluginDescriptor,
        settings: Arc<dyn SettingsStore>,
        resources: Arc<dyn ResourceCatalog>,
        widgets: Arc<dyn WidgetRegistry>,
    ) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            settings,
            resources,
            widgets,
        }
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub async fn state(&self) -> Result<PluginState, PluginError> {
        Ok(match self.settings.load().await? {
            Some(_) => PluginState::Installed,
            None => PluginState::Uninstalled,
        })
    }

    /// Creates default settings unless a record already exists, then imports
    /// the bundled resources. Safe to run repeatedly.
    pub async fn install(&self) -> Result<(), PluginError> {
        if self.settings.load().await?.is_none() {
            self.settings.save(&TrackingSettings::default()).await?;
            info!(plugin = %self.descriptor.system_name, "created default tracking settings");
        }
        let imported = self.resources.import_resources(&self.descriptor).await?;
        info!(
            plugin = %self.descriptor.system_name,
            version = %self.descriptor.version,
            imported,
            "plugin installed"
        );
        Ok(())
    }

    /// Removes resources and settings. Missing pieces are skipped silently.
    pub async fn uninstall(&self) -> Result<(), PluginError> {
        let mut removed = self
            .resources
            .delete_resources(&self.descriptor.resource_root_key, true)
            .await?;
        for key in [
            LEGACY_FRIENDLY_NAME_KEY.to_string(),
            self.descriptor.friendly_name_key(),
            self.descriptor.description_key(),
        ] {
            removed += self.resources.delete_resources(&key, false).await?;
        }
        self.settings.delete().await?;
        info!(plugin = %self.descriptor.system_name, removed, "plugin uninstalled");
        Ok(())
    }

    /// Current settings; rendering before install is refused.
    pub async fn settings(&self) -> Result<TrackingSettings, PluginError> {
        self.settings.load().await?.ok_or(PluginError::NotInstalled)
    }

    pub async fn configure(
        &self,
        update: SettingsUpdate,
    ) -> Result<ConfigureOutcome, PluginError> {
        let mut settings = self.settings().await?;
        settings.apply(update);

        let warnings: Vec<TemplateWarning> = [
            (TemplateKind::Tracking, &settings.tracking_script),
            (TemplateKind::Ecommerce, &settings.ecommerce_script),
            (TemplateKind::EcommerceDetail, &settings.ecommerce_detail_script),
        ]
        .into_iter()
        .flat_map(|(kind, template)| inspect_template(kind, template))
        .collect();
        for warning in &warnings {
            warn!(%warning, "saved template with placeholder issue");
        }

        self.settings.save(&settings).await?;
        info!(
            google_id = %settings.google_id,
            zone = ?settings.widget_zone,
            "tracking settings updated"
        );
        Ok(ConfigureOutcome { settings, warnings })
    }

    pub async fn widget_zones(&self) -> Result<Vec<String>, PluginError> {
        Ok(resolve_widget_zones(&self.settings().await?))
    }

    pub fn configuration_route(&self) -> PluginRoute {
        PluginRoute::configuration()
    }

    pub fn display_widget_route(&self, widget_zone: &str) -> PluginRoute {
        PluginRoute::display(widget_zone)
    }

    pub async fn is_active(&self) -> bool {
        let system_name = &self.descriptor.system_name;
        self.widgets.is_widget_active(system_name).await
    }

    pub async fn cookie_info(&self) -> Option<CookieDisclosure> {
        let active = self.is_active().await;
        resolve_cookie_disclosure(active, self.resources.as_ref()).await
    }

    /// Script for one widget zone, taken from a single settings snapshot.
    pub async fn render(
        &self,
        input: &PageViewInput,
        order: Option<&OrderContext>,
    ) -> Result<String, PluginError> {
        let snapshot = self.settings().await?;
        Ok(TrackingScriptRenderer::render_tracking(&snapshot, input, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::InMemoryResourceCatalog;
    use crate::settings::InMemorySettingsStore;
    use crate::widget::StaticWidgetRegistry;

    struct Harness {
        plugin: GoogleAnalyticsPlugin,
        store: Arc<InMemorySettingsStore>,
        catalog: Arc<InMemoryResourceCatalog>,
    }

    fn harness(active: bool) -> Harness {
        let store = Arc::new(InMemorySettingsStore::new());
        let catalog = Arc::new(InMemoryResourceCatalog::default());
        let descriptor = PluginDescriptor::bundled().unwrap();
        let registry = if active {
            StaticWidgetRegistry::new([descriptor.system_name.clone()])
        } else {
            StaticWidgetRegistry::default()
        };
        let plugin = GoogleAnalyticsPlugin::new(
            descriptor,
            store.clone(),
            catalog.clone(),
            Arc::new(registry),
        );
        Harness {
            plugin,
            store,
            catalog,
        }
    }

    #[tokio::test]
    async fn install_is_reentrant_and_keeps_existing_settings() {
        let h = harness(true);
        assert_eq!(h.plugin.state().await.unwrap(), PluginState::Uninstalled);
        h.plugin.install().await.unwrap();
        assert_eq!(h.plugin.state().await.unwrap(), PluginState::Installed);

        h.plugin
            .configure(SettingsUpdate {
                google_id: Some("UA-5-5".into()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();
        h.plugin.install().await.unwrap();
        let settings = h.store.load().await.unwrap().unwrap();
        assert_eq!(settings.google_id, "UA-5-5");
    }

    #[tokio::test]
    async fn uninstall_removes_everything_and_tolerates_repeat() {
        let h = harness(true);
        h.plugin.uninstall().await.unwrap();
        h.plugin.install().await.unwrap();
        assert!(!h.catalog.is_empty().await);

        h.plugin.uninstall().await.unwrap();
        assert_eq!(h.plugin.state().await.unwrap(), PluginState::Uninstalled);
        assert!(h.catalog.is_empty().await);
        h.plugin.uninstall().await.unwrap();
    }

    #[tokio::test]
    async fn render_before_install_is_refused() {
        let h = harness(true);
        let err = h
            .plugin
            .render(&PageViewInput::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotInstalled));
    }

    #[tokio::test]
    async fn configure_reports_template_warnings_but_saves() {
        let h = harness(true);
        h.plugin.install().await.unwrap();
        let outcome = h
            .plugin
            .configure(SettingsUpdate {
                tracking_script: Some("<script>ga('create', '{GOOGLEID}');</script>".into()),
                widget_zone: Some("footer".into()),
                ..SettingsUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.warnings.len(), 3);
        assert_eq!(h.plugin.widget_zones().await.unwrap(), vec!["footer"]);
        let script = h
            .plugin
            .render(&PageViewInput::default(), None)
            .await
            .unwrap();
        assert_eq!(script, "<script>ga('create', 'UA-0000000-0');</script>");
    }

    #[tokio::test]
    async fn cookie_info_follows_widget_activation() {
        let inactive = harness(false);
        inactive.plugin.install().await.unwrap();
        assert!(inactive.plugin.cookie_info().await.is_none());

        let active = harness(true);
        active.plugin.install().await.unwrap();
        let info = active.plugin.cookie_info().await.unwrap();
        assert_eq!(info.category, crate::cookies::CookieCategory::Analytics);
    }
}
