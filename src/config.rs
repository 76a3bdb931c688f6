use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration for the demo storefront host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// JSON file for the settings record; in-memory when unset.
    pub settings_path: Option<PathBuf>,
    pub store_url: String,
    pub language: String,
    pub widget_active: bool,
    pub auto_install: bool,
    pub enable_cors: bool,
}

/// Command line overrides; anything not given falls back to the environment.
#[derive(Debug, Default, Parser)]
#[command(name = "ga-widget", about = "Demo storefront host for the Google Analytics widget")]
pub struct Cli {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long)]
    pub bind: Option<String>,
    /// Path of the JSON settings file
    #[arg(long)]
    pub settings_path: Option<PathBuf>,
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(Cli::default())
    }

    pub fn load(cli: Cli) -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = cli
            .bind
            .or_else(|| std::env::var("BIND_ADDR").ok())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("failed to parse BIND_ADDR")?;

        let settings_path = cli
            .settings_path
            .or_else(|| std::env::var("GA_SETTINGS_PATH").ok().map(PathBuf::from));

        let store_url =
            std::env::var("GA_STORE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        url::Url::parse(&store_url).context("failed to parse GA_STORE_URL")?;

        let language = std::env::var("GA_LANGUAGE").unwrap_or_else(|_| "en".to_string());

        Ok(Self {
            bind_addr,
            settings_path,
            store_url,
            language,
            widget_active: env_flag("GA_WIDGET_ACTIVE", true),
            auto_install: env_flag("GA_AUTO_INSTALL", true),
            enable_cors: env_flag("ENABLE_CORS", false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_bind_and_settings_path() {
        let cli = Cli::parse_from([
            "ga-widget",
            "--bind",
            "127.0.0.1:9099",
            "--settings-path",
            "/tmp/ga.json",
        ]);
        let config = AppConfig::load(cli).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9099".parse().unwrap());
        assert_eq!(config.settings_path, Some(PathBuf::from("/tmp/ga.json")));
    }

    #[test]
    fn rejects_bad_bind_address() {
        let cli = Cli {
            bind: Some("not-an-addr".into()),
            settings_path: None,
        };
        assert!(AppConfig::load(cli).is_err());
    }
}
