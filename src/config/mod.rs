use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub agent: AgentConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the provisioning backend.
    pub base_url: String,
    /// Lead capture webhook URL. Empty disables the notification.
    pub lead_webhook_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.snowie.ai".to_string(),
            lead_webhook_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub default_name: String,
    pub default_personality: String,
    /// Provider identifier sent with create-room requests.
    pub provider: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_name: "Maya".to_string(),
            default_personality: "Friendly, professional, and helpful customer support agent"
                .to_string(),
            provider: "thunderemotionlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Media connector implementation ("loopback" is the only built-in).
    pub connector: String,
    /// Hard cap on a resume attempt, in seconds.
    pub resume_timeout_seconds: u64,
    /// Minimum time the outbound-calling screen stays visible after success.
    pub calling_success_display_ms: u64,
    /// Minimum time the outbound-calling screen stays visible after failure.
    pub calling_failure_display_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connector: "loopback".to_string(),
            resume_timeout_seconds: 10,
            calling_success_display_ms: 5000,
            calling_failure_display_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3878 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.connector, "loopback");
        assert_eq!(config.session.resume_timeout_seconds, 10);
        assert_eq!(config.api.port, 3878);
        assert_eq!(config.agent.default_name, "Maya");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:9000");
        assert_eq!(config.agent.provider, "thunderemotionlite");
        assert_eq!(config.session.calling_success_display_ms, 5000);
    }
}
