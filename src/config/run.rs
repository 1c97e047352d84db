use super::{default_state_root_path, ConfigError, ProviderSettings, Settings};
use crate::publish::RepositoryId;
use std::fmt;
use std::path::PathBuf;

pub const API_BASE_OVERRIDE_ENV: &str = "DEVCREW_GITHUB_API_BASE";

/// Everything one invocation needs, resolved once at its start.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub state_root: PathBuf,
    pub provider: ProviderSettings,
    pub publish: PublishConfig,
}

#[derive(Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub repository: Option<RepositoryId>,
    pub api_base: String,
    pub branch_prefix: String,
    pub token: Option<String>,
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("repository", &self.repository)
            .field("api_base", &self.api_base)
            .field("branch_prefix", &self.branch_prefix)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RunConfig {
    /// Resolves settings against the process environment.
    pub fn from_environment(settings: &Settings) -> Result<Self, ConfigError> {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    /// Resolves settings with `lookup` standing in for environment variables.
    pub fn resolve<F>(settings: &Settings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let state_root = match &settings.state_root {
            Some(root) => root.clone(),
            None => default_state_root_path()?,
        };
        let repository = settings
            .publish
            .repository
            .as_deref()
            .map(RepositoryId::parse)
            .transpose()
            .map_err(|reason| ConfigError::Settings(format!("`publish.repository`: {reason}")))?;
        let api_base = non_empty(lookup(API_BASE_OVERRIDE_ENV))
            .unwrap_or_else(|| settings.publish.api_base.trim().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            state_root,
            provider: settings.provider.clone(),
            publish: PublishConfig {
                repository,
                api_base,
                branch_prefix: settings.publish.branch_prefix.trim().trim_matches('/').to_string(),
                token: non_empty(lookup(settings.publish.token_env.trim())),
            },
        })
    }

    pub fn log_path(&self) -> PathBuf {
        crate::shared::logging::log_path(&self.state_root)
    }

    pub fn run_workspace(&self, run_id: &str) -> PathBuf {
        self.state_root.join("runs").join(run_id)
    }
}
