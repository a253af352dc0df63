//! Configuration: built-in defaults, then a TOML file, then `CHECADOC_*`
//! environment variables.

use directories::ProjectDirs;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
pub use crate::storage::StorageConfig;
use crate::storage::BackendType;

/// File name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Location of the default config file, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("br", "checadoc", "checadoc").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_true() -> bool {
    true
}

/// One CPF lookup source, consulted in list order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpfSourceConfig {
    pub name: String,
    /// Requests go to `{base_url}/cpf/{digits}`
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// `[cpf]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpfConfig {
    pub sources: Vec<CpfSourceConfig>,
}

impl Default for CpfConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                CpfSourceConfig {
                    name: "primary-proxy".to_string(),
                    base_url: "http://127.0.0.1:3001".to_string(),
                    timeout: Duration::from_secs(15),
                    enabled: true,
                },
                CpfSourceConfig {
                    name: "secondary-proxy".to_string(),
                    base_url: "http://127.0.0.1:3002".to_string(),
                    timeout: Duration::from_secs(12),
                    enabled: true,
                },
                // Direct calls are rate limited upstream; opt in explicitly.
                CpfSourceConfig {
                    name: "receitaws".to_string(),
                    base_url: "https://www.receitaws.com.br/v1".to_string(),
                    timeout: Duration::from_secs(8),
                    enabled: false,
                },
            ],
        }
    }
}

/// `[cep]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CepConfig {
    /// Either a template containing `{cep}` or a base URL the code is appended to
    pub url_template: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for CepConfig {
    fn default() -> Self {
        Self {
            url_template: "https://viacep.com.br/ws/{cep}/json/".to_string(),
            timeout: Duration::from_secs(8),
        }
    }
}

/// `[proxy]` section, used by `checadoc serve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
    /// Primary registry; the CPF digits are appended as a path segment
    pub primary_url: String,
    /// Consulted only when the primary cannot be reached or parsed
    pub fallback_url: String,
    #[serde(with = "humantime_serde")]
    pub upstream_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            primary_url: "https://www.receitaws.com.br/v1/cpf".to_string(),
            fallback_url: "https://brasilapi.com.br/api/cpf/v1".to_string(),
            upstream_timeout: Duration::from_secs(10),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub log_level: Option<String>,
    pub user_agent: String,
    pub cpf: CpfConfig,
    pub cep: CepConfig,
    pub storage: StorageConfig,
    pub proxy: ProxyConfig,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            user_agent: format!("checadoc/{}", env!("CARGO_PKG_VERSION")),
            cpf: CpfConfig::default(),
            cep: CepConfig::default(),
            storage: StorageConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

impl CheckConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the platform config file
    /// is used when present. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.merge_env_vars();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn merge_env_vars(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `CHECADOC_*` overrides from any lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("CHECADOC_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(agent) = lookup("CHECADOC_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(url) = lookup("CHECADOC_CPF_PRIMARY_URL") {
            if let Some(source) = self.cpf.sources.get_mut(0) {
                source.base_url = url;
            }
        }
        if let Some(url) = lookup("CHECADOC_CPF_SECONDARY_URL") {
            if let Some(source) = self.cpf.sources.get_mut(1) {
                source.base_url = url;
            }
        }
        if let Some(url) = lookup("CHECADOC_CEP_URL") {
            self.cep.url_template = url;
        }
        if let Some(backend) = lookup("CHECADOC_STORAGE_BACKEND") {
            match backend.parse::<BackendType>() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => tracing::warn!("Ignoring CHECADOC_STORAGE_BACKEND: {}", e),
            }
        }
        if let Some(dir) = lookup("CHECADOC_STORAGE_DIR") {
            self.storage.base_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup("CHECADOC_PROXY_BIND") {
            self.proxy.bind = bind;
        }
    }

    pub fn validate(&self) -> Result<()> {
        for source in &self.cpf.sources {
            if source.name.trim().is_empty() {
                return Err(Error::Config("CPF source with empty name".to_string()));
            }
            if source.base_url.trim().is_empty() {
                return Err(Error::Config(format!(
                    "CPF source '{}' has no base_url",
                    source.name
                )));
            }
            if source.timeout.is_zero() {
                return Err(Error::Config(format!(
                    "CPF source '{}' has a zero timeout",
                    source.name
                )));
            }
        }
        if self.cep.url_template.trim().is_empty() {
            return Err(Error::Config("cep.url_template is empty".to_string()));
        }
        if self.cep.timeout.is_zero() || self.proxy.upstream_timeout.is_zero() {
            return Err(Error::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// The one HTTP client every resolver shares
    pub fn http_client(&self) -> Result<Client> {
        Ok(Client::builder().user_agent(&self.user_agent).build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = CheckConfig::default();
        let timeouts: Vec<u64> = config
            .cpf
            .sources
            .iter()
            .map(|s| s.timeout.as_secs())
            .collect();
        assert_eq!(timeouts, vec![15, 12, 8]);
        assert!(!config.cpf.sources[2].enabled);
        assert_eq!(config.cep.timeout, Duration::from_secs(8));
        assert!(config.cep.url_template.contains("viacep.com.br"));
        assert_eq!(config.proxy.upstream_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("checadoc/"));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CheckConfig::from_toml(
            r#"
log_level = "debug"

[cep]
timeout = "3s"

[storage]
backend = "memory"
"#,
        )
        .unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.cep.timeout, Duration::from_secs(3));
        assert_eq!(config.cep.url_template, CepConfig::default().url_template);
        assert_eq!(config.storage.backend, BackendType::Memory);
        assert_eq!(config.cpf, CpfConfig::default());
    }

    #[test]
    fn test_sources_from_toml() {
        let config = CheckConfig::from_toml(
            r#"
[[cpf.sources]]
name = "only"
base_url = "http://localhost:9000"
timeout = "1500ms"
"#,
        )
        .unwrap();

        assert_eq!(config.cpf.sources.len(), 1);
        assert_eq!(config.cpf.sources[0].timeout, Duration::from_millis(1500));
        assert!(config.cpf.sources[0].enabled);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = CheckConfig::from_toml("[cep\ntimeout = 3").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CHECADOC_LOG_LEVEL", "trace"),
            ("CHECADOC_CPF_PRIMARY_URL", "http://primary.test"),
            ("CHECADOC_CEP_URL", "http://cep.test/{cep}"),
            ("CHECADOC_STORAGE_BACKEND", "memory"),
            ("CHECADOC_STORAGE_DIR", "/tmp/checadoc-test"),
        ]
        .into_iter()
        .collect();

        let mut config = CheckConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.log_level.as_deref(), Some("trace"));
        assert_eq!(config.cpf.sources[0].base_url, "http://primary.test");
        assert_eq!(config.cpf.sources[1].base_url, "http://127.0.0.1:3002");
        assert_eq!(config.cep.url_template, "http://cep.test/{cep}");
        assert_eq!(config.storage.backend, BackendType::Memory);
        assert_eq!(config.storage.base_dir, PathBuf::from("/tmp/checadoc-test"));
    }

    #[test]
    fn test_unknown_backend_override_is_ignored() {
        let mut config = CheckConfig::default();
        config.apply_overrides(|key| {
            (key == "CHECADOC_STORAGE_BACKEND").then(|| "postgres".to_string())
        });
        assert_eq!(config.storage.backend, BackendType::File);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = CheckConfig::default();
        config.cpf.sources[0].timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CheckConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checadoc.toml");
        std::fs::write(&path, "user_agent = \"tester\"\n").unwrap();
        let config = CheckConfig::from_file(&path).unwrap();
        assert_eq!(config.user_agent, "tester");
    }
}
