//! Configuration for Daemon AI
//!
//! Loaded once at startup from the environment and passed explicitly to the
//! components that perform transport. Nothing mutates it afterwards.
//!
//! Recognized variables:
//! - `DAEMON_API_BASE`: base URL of the daemon backend used by the client
//! - `DAEMON_SERVER_ADDR`: listen address of the backend server
//! - `DAEMON_LLM_BASE_URL`: OpenAI-compatible API root
//! - `DAEMON_SUGGESTION_MODEL`, `DAEMON_SPAN_MODEL`: model names
//! - `DAEMON_REQUEST_TIMEOUT_SECS`: per-request timeout
//! - `OPENAI_API_KEY`: LLM credential (backend only)

use crate::error::{DaemonError, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::debug;

/// Default backend base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Default listen address for `daemon-ai serve`
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8000";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Backend base URL (no trailing slash)
    pub api_base: String,

    /// Backend listen address
    pub server_addr: String,

    /// OpenAI-compatible API root
    pub llm_base_url: String,

    /// Credential for the LLM API (empty when not configured)
    #[serde(default)]
    pub openai_api_key: String,

    /// Model used for questions, answers and rewrites
    pub suggestion_model: String,

    /// Model used to locate the highlighted span
    pub span_model: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            llm_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: String::new(),
            suggestion_model: "gpt-3.5-turbo".to_string(),
            span_model: "gpt-4.1-nano-2025-04-14".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(None)
    }

    /// Load from an explicit variable map (or the process environment when `None`)
    pub fn from_vars(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = Self::default();
        let api_key = match &vars {
            Some(map) => map.get("OPENAI_API_KEY").cloned(),
            None => env::var("OPENAI_API_KEY").ok(),
        };

        let mut builder = Config::builder()
            .set_default("api_base", defaults.api_base)?
            .set_default("server_addr", defaults.server_addr)?
            .set_default("llm_base_url", defaults.llm_base_url)?
            .set_default("openai_api_key", defaults.openai_api_key)?
            .set_default("suggestion_model", defaults.suggestion_model)?
            .set_default("span_model", defaults.span_model)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .add_source(Environment::with_prefix("DAEMON").source(vars));

        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            builder = builder.set_override("openai_api_key", key)?;
        }

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        config.llm_base_url = config.llm_base_url.trim_end_matches('/').to_string();
        config.validate()?;

        debug!(
            "Configuration loaded: api_base={}, server_addr={}",
            config.api_base, config.server_addr
        );
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn with_overrides(
        mut self,
        api_base: Option<String>,
        server_addr: Option<String>,
    ) -> Result<Self> {
        if let Some(api_base) = api_base {
            self.api_base = api_base.trim_end_matches('/').to_string();
        }
        if let Some(server_addr) = server_addr {
            self.server_addr = server_addr;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        for (name, url) in [("api_base", &self.api_base), ("llm_base_url", &self.llm_base_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DaemonError::Config(config::ConfigError::Message(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                ))));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(DaemonError::Config(config::ConfigError::Message(
                "request_timeout_secs must be positive".to_string(),
            )));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Parsed backend listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server_addr.parse().map_err(|e| {
            DaemonError::Config(config::ConfigError::Message(format!(
                "Invalid server_addr '{}': {}",
                self.server_addr, e
            )))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether an LLM credential is available
    pub fn has_api_key(&self) -> bool {
        !self.openai_api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.has_api_key());
    }

    /// Collects formatted log output for inspection
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_loading_without_key_is_quiet() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            AppConfig::from_vars(vars(&[])).unwrap();
        });
        assert!(captured.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("DAEMON_API_BASE", "https://daemons.example.com/"),
            ("DAEMON_SERVER_ADDR", "127.0.0.1:9000"),
            ("DAEMON_REQUEST_TIMEOUT_SECS", "5"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.api_base, "https://daemons.example.com");
        assert_eq!(config.listen_addr().unwrap().port(), 9000);
        assert_eq!(config.request_timeout_secs, 5);
        assert!(config.has_api_key());
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = AppConfig::from_vars(vars(&[("DAEMON_API_BASE", "localhost:8000")]));
        assert!(matches!(err, Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = AppConfig::default()
            .with_overrides(Some("http://10.0.0.2:8000/".to_string()), None)
            .unwrap();
        assert_eq!(config.api_base, "http://10.0.0.2:8000");
        assert_eq!(config.server_addr, DEFAULT_SERVER_ADDR);

        assert!(AppConfig::default()
            .with_overrides(None, Some("bad".to_string()))
            .is_err());
    }

    #[test]
    fn test_rejects_bad_listen_addr() {
        let err = AppConfig::from_vars(vars(&[("DAEMON_SERVER_ADDR", "nowhere")]));
        assert!(err.is_err());
    }
}
