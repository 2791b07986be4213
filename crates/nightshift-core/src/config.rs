use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{NightshiftError, Result};

pub const DEFAULT_ENDPOINT_ID: &str = "1";
pub const DEFAULT_RESTART_TIME: &str = "03:00";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Top-level config (nightshift.toml + NIGHTSHIFT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightshiftConfig {
    pub portainer: PortainerConfig,
    pub restart: RestartConfig,
}

/// Connection settings for the Portainer instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortainerConfig {
    /// Base URL, e.g. "https://portainer.example.com".
    pub url: String,
    /// Which managed Docker environment to target.
    #[serde(default = "default_endpoint_id")]
    pub endpoint_id: String,
    /// Static API key. Mutually exclusive with username/password.
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// What to restart and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    /// Container name or ID prefix as the operator knows it.
    pub container: String,
    /// Daily restart time, "HH:MM" 24-hour local time.
    #[serde(default = "default_restart_time")]
    pub time: String,
    /// How often the loop checks the clock, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_endpoint_id() -> String {
    DEFAULT_ENDPOINT_ID.to_string()
}
fn default_restart_time() -> String {
    DEFAULT_RESTART_TIME.to_string()
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl NightshiftConfig {
    /// Load config from a TOML file with NIGHTSHIFT_* env var overrides.
    ///
    /// Env keys use `__` as the nesting separator, e.g.
    /// `NIGHTSHIFT_PORTAINER__API_KEY` maps to `portainer.api_key`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or("nightshift.toml");

        let config: NightshiftConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("NIGHTSHIFT_").split("__"))
            .extract()
            .map_err(|e| NightshiftError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Reject configurations the daemon cannot run with. Called once at
    /// startup; any error here terminates the process.
    pub fn validate(&self) -> Result<()> {
        if self.portainer.url.trim().is_empty() {
            return Err(NightshiftError::Config(
                "portainer.url must be set".to_string(),
            ));
        }
        if self.restart.container.trim().is_empty() {
            return Err(NightshiftError::Config(
                "restart.container must be set".to_string(),
            ));
        }

        let has_key = self.portainer.api_key.is_some();
        let has_user = self.portainer.username.is_some();
        let has_pass = self.portainer.password.is_some();

        if has_key && (has_user || has_pass) {
            return Err(NightshiftError::Config(
                "portainer.api_key and portainer.username/password are mutually \
                 exclusive — configure exactly one credential"
                    .to_string(),
            ));
        }
        if !has_key {
            if !has_user && !has_pass {
                return Err(NightshiftError::Config(
                    "no credential configured — set portainer.api_key or both \
                     portainer.username and portainer.password"
                        .to_string(),
                ));
            }
            if !(has_user && has_pass) {
                return Err(NightshiftError::Config(
                    "portainer.username and portainer.password must both be set"
                        .to_string(),
                ));
            }
        }

        if self.restart.poll_interval_secs == 0 {
            return Err(NightshiftError::Config(
                "restart.poll_interval_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> NightshiftConfig {
        NightshiftConfig {
            portainer: PortainerConfig {
                url: "https://portainer.local".to_string(),
                endpoint_id: default_endpoint_id(),
                api_key: Some("ptr_key".to_string()),
                username: None,
                password: None,
            },
            restart: RestartConfig {
                container: "nginx".to_string(),
                time: default_restart_time(),
                poll_interval_secs: default_poll_interval_secs(),
            },
        }
    }

    #[test]
    fn api_key_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn login_config_is_valid() {
        let mut config = base_config();
        config.portainer.api_key = None;
        config.portainer.username = Some("admin".to_string());
        config.portainer.password = Some("hunter2".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_url_is_rejected() {
        let mut config = base_config();
        config.portainer.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_container_is_rejected() {
        let mut config = base_config();
        config.restart.container = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let mut config = base_config();
        config.portainer.api_key = None;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no credential"));
    }

    #[test]
    fn both_credential_kinds_are_rejected() {
        let mut config = base_config();
        config.portainer.username = Some("admin".to_string());
        config.portainer.password = Some("hunter2".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn username_without_password_is_rejected() {
        let mut config = base_config();
        config.portainer.api_key = None;
        config.portainer.username = Some("admin".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = base_config();
        config.restart.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
