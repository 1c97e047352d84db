use super::ConfigError;
use crate::provider::ProviderKind;
use crate::publish::RepositoryId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BRANCH_PREFIX: &str = "devcrew";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Root for logs and run workspaces. Defaults to `~/.devcrew`.
    #[serde(default)]
    pub state_root: Option<PathBuf>,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub publish: PublishSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub binary: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
            binary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PublishSettings {
    /// Target repository as `owner/name`.
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    /// Name of the environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            repository: None,
            api_base: default_api_base(),
            branch_prefix: default_branch_prefix(),
            token_env: default_token_env(),
        }
    }
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Anthropic
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECONDS
}

fn default_api_base() -> String {
    DEFAULT_GITHUB_API_BASE.to_string()
}

fn default_branch_prefix() -> String {
    DEFAULT_BRANCH_PREFIX.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.state_root {
            if !root.is_absolute() {
                return Err(ConfigError::Settings(
                    "`state_root` must be an absolute path".to_string(),
                ));
            }
        }

        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`provider.model` must be non-empty".to_string(),
            ));
        }
        if self.provider.timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "`provider.timeout_seconds` must be greater than zero".to_string(),
            ));
        }

        if let Some(repository) = &self.publish.repository {
            RepositoryId::parse(repository).map_err(|reason| {
                ConfigError::Settings(format!("`publish.repository`: {reason}"))
            })?;
        }
        let api_base = self.publish.api_base.trim();
        if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
            return Err(ConfigError::Settings(
                "`publish.api_base` must be an http(s) url".to_string(),
            ));
        }
        let prefix = self.publish.branch_prefix.trim().trim_matches('/');
        if prefix.is_empty() {
            return Err(ConfigError::Settings(
                "`publish.branch_prefix` must be non-empty".to_string(),
            ));
        }
        if prefix
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
        {
            return Err(ConfigError::Settings(format!(
                "`publish.branch_prefix` `{prefix}` is not a valid git ref component"
            )));
        }
        if self.publish.token_env.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`publish.token_env` must name an environment variable".to_string(),
            ));
        }

        Ok(())
    }
}
