use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub const DEFAULT_GOOGLE_ID: &str = "UA-0000000-0";

pub const DEFAULT_TRACKING_SCRIPT: &str = r#"<!-- Google code for Analytics tracking -->
<script>
	{OPTOUTCOOKIE}

    (function(i,s,o,g,r,a,m){i['GoogleAnalyticsObject']=r;i[r]=i[r]||function(){
    (i[r].q=i[r].q||[]).push(arguments)},i[r].l=1*new Date();a=s.createElement(o),
    m=s.getElementsByTagName(o)[0];a.async=1;a.src=g;m.parentNode.insertBefore(a,m)
    })(window,document,'script','//www.google-analytics.com/analytics.js','ga');

    ga('create', '{GOOGLEID}', 'auto');
	ga('set', 'anonymizeIp', true);
    ga('send', 'pageview');

	{STORAGETYPE}

    {ECOMMERCE}
</script>"#;

pub const DEFAULT_ECOMMERCE_SCRIPT: &str = r#"ga('require', 'ecommerce');
ga('ecommerce:addTransaction', {
    'id': '{ORDERID}',
    'affiliation': '{SITE}',
    'revenue': '{TOTAL}',
    'shipping': '{SHIP}',
    'tax': '{TAX}',
    'currency': '{CURRENCY}'
});

{DETAILS}

ga('ecommerce:send');"#;

pub const DEFAULT_ECOMMERCE_DETAIL_SCRIPT: &str = r#"ga('ecommerce:addItem', {
    'id': '{ORDERID}',
    'name': '{PRODUCTNAME}',
    'sku': '{PRODUCTSKU}',
    'category': '{CATEGORYNAME}',
    'price': '{UNITPRICE}',
    'quantity': '{QUANTITY}'
});
"#;

/// Persisted widget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSettings {
    pub google_id: String,
    pub tracking_script: String,
    pub ecommerce_script: String,
    pub ecommerce_detail_script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_zone: Option<String>,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            google_id: DEFAULT_GOOGLE_ID.to_string(),
            tracking_script: DEFAULT_TRACKING_SCRIPT.to_string(),
            ecommerce_script: DEFAULT_ECOMMERCE_SCRIPT.to_string(),
            ecommerce_detail_script: DEFAULT_ECOMMERCE_DETAIL_SCRIPT.to_string(),
            widget_zone: None,
        }
    }
}

/// Partial update coming from the admin configuration screen.
///
/// `None` leaves a field unchanged. A blank `widget_zone` clears the override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub tracking_script: Option<String>,
    #[serde(default)]
    pub ecommerce_script: Option<String>,
    #[serde(default)]
    pub ecommerce_detail_script: Option<String>,
    #[serde(default)]
    pub widget_zone: Option<String>,
}

impl TrackingSettings {
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(id) = update.google_id {
            self.google_id = id.trim().to_string();
        }
        if let Some(script) = update.tracking_script {
            self.tracking_script = script;
        }
        if let Some(script) = update.ecommerce_script {
            self.ecommerce_script = script;
        }
        if let Some(script) = update.ecommerce_detail_script {
            self.ecommerce_detail_script = script;
        }
        if let Some(zone) = update.widget_zone {
            let zone = zone.trim();
            self.widget_zone = (!zone.is_empty()).then(|| zone.to_string());
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Host configuration store holding the widget's settings record.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Option<TrackingSettings>, StoreError>;
    async fn save(&self, settings: &TrackingSettings) -> Result<(), StoreError>;
    /// Removing a record that does not exist is not an error.
    async fn delete(&self) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemorySettingsStore {
    record: RwLock<Option<TrackingSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<Option<TrackingSettings>, StoreError> {
        Ok(self.record.read().await.clone())
    }

    async fn save(&self, settings: &TrackingSettings) -> Result<(), StoreError> {
        *self.record.write().await = Some(settings.clone());
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        self.record.write().await.take();
        Ok(())
    }
}

/// JSON file backed store for the demo host and local development.
pub struct FsSettingsStore {
    path: PathBuf,
}

impl FsSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SettingsStore for FsSettingsStore {
    async fn load(&self) -> Result<Option<TrackingSettings>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, settings: &TrackingSettings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(settings)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "saved tracking settings");
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
