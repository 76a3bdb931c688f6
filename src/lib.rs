//! Google Analytics storefront widget.
//!
//! Renders the page view and e-commerce tracking scripts from admin-editable
//! templates, tells the host which widget zones to render into, and handles
//! install/uninstall of the settings record and localized resources.

pub mod api;
pub mod config;
pub mod cookies;
pub mod localization;
pub mod plugin;
pub mod renderer;
pub mod server;
pub mod settings;
pub mod template;
pub mod widget;

pub use cookies::{CookieCategory, CookieDisclosure};
pub use localization::{InMemoryResourceCatalog, PluginDescriptor, ResourceCatalog};
pub use plugin::{GoogleAnalyticsPlugin, PluginError, PluginState};
pub use renderer::{LineItem, OrderContext, PageViewInput, StorageType, TrackingScriptRenderer};
pub use settings::{
    FsSettingsStore, InMemorySettingsStore, SettingsStore, SettingsUpdate, TrackingSettings,
};
pub use widget::{PluginRoute, StaticWidgetRegistry, WidgetRegistry};
