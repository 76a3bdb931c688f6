use clap::Parser;
use ga_widget::config::{AppConfig, Cli};
use ga_widget::server::{self, AppState};
use ga_widget::{
    FsSettingsStore, GoogleAnalyticsPlugin, InMemoryResourceCatalog, InMemorySettingsStore,
    PluginDescriptor, SettingsStore, StaticWidgetRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::load(Cli::parse())?;

    let settings_store: Arc<dyn SettingsStore> = match &config.settings_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using file settings store");
            Arc::new(FsSettingsStore::new(path.clone()))
        }
        None => {
            tracing::info!("using in-memory settings store");
            Arc::new(InMemorySettingsStore::new())
        }
    };
    let descriptor = PluginDescriptor::bundled()?;
    let registry = if config.widget_active {
        StaticWidgetRegistry::new([descriptor.system_name.clone()])
    } else {
        StaticWidgetRegistry::default()
    };
    let plugin = GoogleAnalyticsPlugin::new(
        descriptor,
        settings_store,
        Arc::new(InMemoryResourceCatalog::new(config.language.clone())),
        Arc::new(registry),
    );
    if config.auto_install {
        plugin.install().await?;
    }

    let addr: SocketAddr = config.bind_addr;
    let state = AppState::new(config, plugin);
    tracing::info!(%addr, "starting ga-widget demo host");
    server::run(addr, state).await?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
