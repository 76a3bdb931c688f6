use ga_widget::localization::InMemoryResourceCatalog;
use ga_widget::settings::{
    DEFAULT_ECOMMERCE_DETAIL_SCRIPT, DEFAULT_ECOMMERCE_SCRIPT, DEFAULT_TRACKING_SCRIPT,
};
use ga_widget::{
    GoogleAnalyticsPlugin, InMemorySettingsStore, PageViewInput, PluginDescriptor, PluginState,
    SettingsStore, SettingsUpdate, StaticWidgetRegistry, TrackingScriptRenderer,
};
use std::sync::Arc;

fn build() -> (
    GoogleAnalyticsPlugin,
    Arc<InMemorySettingsStore>,
    Arc<InMemoryResourceCatalog>,
) {
    let descriptor = PluginDescriptor::bundled().expect("bundled descriptor");
    let store = Arc::new(InMemorySettingsStore::new());
    let catalog = Arc::new(InMemoryResourceCatalog::default());
    let registry = Arc::new(StaticWidgetRegistry::new([descriptor.system_name.clone()]));
    let plugin = GoogleAnalyticsPlugin::new(descriptor, store.clone(), catalog.clone(), registry);
    (plugin, store, catalog)
}

#[tokio::test]
async fn install_then_render_page_view() {
    let (plugin, store, _catalog) = build();
    plugin.install().await.unwrap();

    let settings = store.load().await.unwrap().expect("settings after install");
    assert_eq!(settings.google_id, "UA-0000000-0");
    assert_eq!(settings.tracking_script, DEFAULT_TRACKING_SCRIPT);
    assert_eq!(settings.ecommerce_script, DEFAULT_ECOMMERCE_SCRIPT);
    assert_eq!(settings.ecommerce_detail_script, DEFAULT_ECOMMERCE_DETAIL_SCRIPT);

    plugin
        .configure(SettingsUpdate {
            google_id: Some("UA-123-1".into()),
            ..SettingsUpdate::default()
        })
        .await
        .unwrap();
    let script = plugin.render(&PageViewInput::default(), None).await.unwrap();
    let expected = DEFAULT_TRACKING_SCRIPT
        .replace("{OPTOUTCOOKIE}", "")
        .replace("{GOOGLEID}", "UA-123-1")
        .replace("{STORAGETYPE}", "")
        .replace("{ECOMMERCE}", "");
    assert_eq!(script, expected);

    let snapshot = plugin.settings().await.unwrap();
    assert_eq!(
        TrackingScriptRenderer::render_page_view(&snapshot, &PageViewInput::default()),
        script
    );
}

#[tokio::test]
async fn uninstall_after_install_clears_state_and_is_repeatable() {
    let (plugin, store, catalog) = build();
    plugin.install().await.unwrap();
    assert_eq!(plugin.state().await.unwrap(), PluginState::Installed);
    let root_key = plugin.descriptor().resource_root_key.clone();
    assert!(catalog.contains(&format!("{root_key}.CookieInfo")).await);

    plugin.uninstall().await.unwrap();
    assert!(store.load().await.unwrap().is_none());
    assert!(!catalog.contains(&format!("{root_key}.CookieInfo")).await);
    assert!(!catalog.contains(&format!("{root_key}.GoogleId")).await);
    assert_eq!(plugin.state().await.unwrap(), PluginState::Uninstalled);

    plugin.uninstall().await.unwrap();
    assert_eq!(plugin.state().await.unwrap(), PluginState::Uninstalled);
}

#[tokio::test]
async fn reinstall_after_uninstall_restores_defaults() {
    let (plugin, _store, _catalog) = build();
    plugin.install().await.unwrap();
    plugin
        .configure(SettingsUpdate {
            widget_zone: Some("footer".into()),
            ..SettingsUpdate::default()
        })
        .await
        .unwrap();
    plugin.uninstall().await.unwrap();
    plugin.install().await.unwrap();
    assert_eq!(plugin.widget_zones().await.unwrap(), vec!["head_html_tag"]);
    let info = plugin.cookie_info().await.expect("active widget discloses cookie");
    assert_eq!(info.name, "Google Analytics");
}
