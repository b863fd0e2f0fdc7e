//! Layered client configuration.
//!
//! Values are resolved file → environment → CLI, later layers winning.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! url = "https://nexusflow.example.com/api/v1"
//! token = "..."
//! timeout_secs = 30
//!
//! [defaults]
//! organization = "org_123"
//! project = "NEX"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
pub const CONFIG_FILE_NAME: &str = "nexusflow.toml";

pub const ENV_API_URL: &str = "NEXUSFLOW_API_URL";
pub const ENV_TOKEN: &str = "NEXUSFLOW_TOKEN";
pub const ENV_ORG: &str = "NEXUSFLOW_ORG";
pub const ENV_TIMEOUT: &str = "NEXUSFLOW_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub api: ApiSection,
    pub defaults: DefaultsSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSection {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultsSection {
    pub organization: Option<String>,
    /// Project id or key selected when none is given on the command line.
    pub project: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Overrides taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub organization: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub organization: Option<String>,
    pub default_project: Option<String>,
    pub timeout_secs: Option<u64>,
    /// File the values were read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            organization: None,
            default_project: None,
            timeout_secs: None,
            source: None,
        }
    }
}

impl ClientConfig {
    /// Resolve from the process environment.
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(cli: CliOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let path = match cli.config_path.clone() {
            Some(path) => Some(path),
            None => default_config_path().filter(|p| p.exists()),
        };
        if let Some(path) = path {
            let file = FileConfig::load(&path)?;
            config.apply_file(file);
            config.source = Some(path);
        }

        if let Some(url) = env(ENV_API_URL) {
            config.api_url = url;
        }
        if let Some(token) = env(ENV_TOKEN) {
            config.token = Some(token);
        }
        if let Some(org) = env(ENV_ORG) {
            config.organization = Some(org);
        }
        if let Some(raw) = env(ENV_TIMEOUT) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT))?;
            config.timeout_secs = Some(secs);
        }

        if let Some(url) = cli.api_url {
            config.api_url = url;
        }
        if let Some(token) = cli.token {
            config.token = Some(token);
        }
        if let Some(org) = cli.organization {
            config.organization = Some(org);
        }
        if let Some(secs) = cli.timeout_secs {
            config.timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.api.url {
            self.api_url = url;
        }
        self.token = file.api.token.or(self.token.take());
        self.timeout_secs = file.api.timeout_secs.or(self.timeout_secs);
        self.organization = file.defaults.organization.or(self.organization.take());
        self.default_project = file.defaults.project.or(self.default_project.take());
    }

    fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            anyhow::bail!(
                "API URL '{}' must start with http:// or https://",
                self.api_url
            );
        }
        if self.timeout_secs == Some(0) {
            anyhow::bail!("timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Token with everything but the last four characters masked. Tokens
    /// of four characters or fewer are masked entirely.
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_ref().map(|t| {
            if t.chars().count() <= 4 {
                return "****".to_string();
            }
            let visible: String = t
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{}", visible)
        })
    }
}

/// `<user config dir>/nexusflow/nexusflow.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nexusflow").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_any_layer() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let config = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path),
                ..Default::default()
            },
            no_env,
        )
        .unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.token.is_none());
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_file_values_are_applied() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
url = "https://flow.example.com/api/v1"
token = "secret-token"
timeout_secs = 15

[defaults]
organization = "org_1"
project = "NEX"
"#,
        );
        let config = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path.clone()),
                ..Default::default()
            },
            no_env,
        )
        .unwrap();
        assert_eq!(config.api_url, "https://flow.example.com/api/v1");
        assert_eq!(config.token.as_deref(), Some("secret-token"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.organization.as_deref(), Some("org_1"));
        assert_eq!(config.default_project.as_deref(), Some("NEX"));
        assert_eq!(config.source, Some(path));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[api]\nurl = \"https://file.example.com\"\n[defaults]\norganization = \"file_org\"\n",
        );
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://env.example.com"),
            (ENV_ORG, "env_org"),
        ]);
        let config = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path),
                organization: Some("cli_org".into()),
                ..Default::default()
            },
            |k| env.get(k).map(|v| v.to_string()),
        )
        .unwrap();
        assert_eq!(config.api_url, "https://env.example.com");
        assert_eq!(config.organization.as_deref(), Some("cli_org"));
    }

    #[test]
    fn test_invalid_env_timeout_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let result = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path),
                ..Default::default()
            },
            |k| (k == ENV_TIMEOUT).then(|| "soon".to_string()),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[api]\ntimeout_secs = 0\n");
        let result = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path),
                ..Default::default()
            },
            no_env,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let result = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path),
                api_url: Some("ftp://example.com".into()),
                ..Default::default()
            },
            no_env,
        );
        assert!(result.unwrap_err().to_string().contains("ftp://example.com"));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(dir.path().join("absent.toml")),
                ..Default::default()
            },
            no_env,
        );
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_malformed_config_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[api\nurl = 1");
        let result = ClientConfig::resolve_with(
            CliOverrides {
                config_path: Some(path),
                ..Default::default()
            },
            no_env,
        );
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_masked_token_shows_last_four() {
        let config = ClientConfig {
            token: Some("abcdef123456".into()),
            ..Default::default()
        };
        assert_eq!(config.masked_token().as_deref(), Some("****3456"));
        assert!(ClientConfig::default().masked_token().is_none());
    }

    #[test]
    fn test_short_token_is_fully_masked() {
        for token in ["abcd", "x"] {
            let config = ClientConfig {
                token: Some(token.into()),
                ..Default::default()
            };
            assert_eq!(config.masked_token().as_deref(), Some("****"));
        }
        let five = ClientConfig {
            token: Some("abcde".into()),
            ..Default::default()
        };
        assert_eq!(five.masked_token().as_deref(), Some("****bcde"));
    }
}
