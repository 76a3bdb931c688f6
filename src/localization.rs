use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const BUNDLED_DESCRIPTOR: &str = include_str!("../resources/plugin.toml");

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid plugin descriptor: {0}")]
    Descriptor(#[from] toml::de::Error),
    #[error("resource store unavailable: {0}")]
    Unavailable(String),
}

/// Static plugin metadata plus the localized strings it ships with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub system_name: String,
    pub friendly_name: String,
    pub version: semver::Version,
    pub resource_root_key: String,
    /// language code -> resource key -> value
    #[serde(default)]
    pub resources: BTreeMap<String, BTreeMap<String, String>>,
}

impl PluginDescriptor {
    pub fn from_toml(raw: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_toml(BUNDLED_DESCRIPTOR)
    }

    pub fn friendly_name_key(&self) -> String {
        format!("Plugins.FriendlyName.{}", self.system_name)
    }

    pub fn description_key(&self) -> String {
        format!("Plugins.Description.{}", self.system_name)
    }
}

/// Host localization service.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// Lookup misses are resolved by the implementation; the result is used
    /// as-is by callers.
    async fn get_resource(&self, key: &str) -> String;
    async fn import_resources(&self, descriptor: &PluginDescriptor)
    -> Result<usize, CatalogError>;
    /// With `recursive`, removes `prefix` and every key below `prefix.`;
    /// otherwise only the exact key. Missing keys are not an error.
    async fn delete_resources(&self, prefix: &str, recursive: bool)
    -> Result<usize, CatalogError>;
}

/// In-process catalog. Misses return the key itself.
pub struct InMemoryResourceCatalog {
    language: String,
    entries: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryResourceCatalog {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .values()
            .any(|lang| lang.contains_key(key))
    }
}

impl Default for InMemoryResourceCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

fn matches_prefix(key: &str, prefix: &str, recursive: bool) -> bool {
    if key.eq_ignore_ascii_case(prefix) {
        return true;
    }
    recursive
        && key.len() > prefix.len()
        && key.is_char_boundary(prefix.len())
        && key[..prefix.len()].eq_ignore_ascii_case(prefix)
        && key[prefix.len()..].starts_with('.')
}

#[async_trait]
impl ResourceCatalog for InMemoryResourceCatalog {
    async fn get_resource(&self, key: &str) -> String {
        let entries = self.entries.read().await;
        let found = entries
            .get(&self.language)
            .and_then(|strings| strings.get(key))
            .or_else(|| {
                entries
                    .get(DEFAULT_LANGUAGE)
                    .and_then(|strings| strings.get(key))
            });
        match found {
            Some(value) => value.clone(),
            None => {
                debug!(key, language = %self.language, "resource not found");
                key.to_string()
            }
        }
    }

    async fn import_resources(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<usize, CatalogError> {
        let mut entries = self.entries.write().await;
        let mut imported = 0;
        for (language, strings) in &descriptor.resources {
            let target = entries.entry(language.clone()).or_default();
            for (key, value) in strings {
                target.insert(key.clone(), value.clone());
                imported += 1;
            }
        }
        debug!(plugin = %descriptor.system_name, imported, "imported resources");
        Ok(imported)
    }

    async fn delete_resources(
        &self,
        prefix: &str,
        recursive: bool,
    ) -> Result<usize, CatalogError> {
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for strings in entries.values_mut() {
            let before = strings.len();
            strings.retain(|key, _| !matches_prefix(key, prefix, recursive));
            removed += before - strings.len();
        }
        Ok(removed)
    }
}
