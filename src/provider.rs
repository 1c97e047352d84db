use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod backend;
pub mod diagnostics;
pub mod invocation;
pub mod model_map;
pub mod output_parse;
pub mod prompt_files;
pub mod runner;

pub use backend::{CliBackend, Generation, GenerativeBackend};
pub use diagnostics::persist_invocation_log;
pub use invocation::build_invocation;
pub use model_map::{resolve_anthropic_model, resolve_model};
pub use output_parse::parse_openai_jsonl;
pub use prompt_files::write_file_backed_prompt;
pub use runner::{run_provider, RunnerBinaries};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),
    #[error("unsupported anthropic model `{0}`")]
    UnsupportedAnthropicModel(String),
    #[error("provider binary missing for {provider}: {binary}")]
    MissingBinary {
        provider: ProviderKind,
        binary: String,
        log: Box<InvocationLog>,
    },
    #[error("provider process failed for {provider} with exit code {exit_code}: {stderr}")]
    NonZeroExit {
        provider: ProviderKind,
        exit_code: i32,
        stderr: String,
        log: Box<InvocationLog>,
    },
    #[error("provider process timed out for {provider} after {timeout_ms}ms")]
    Timeout {
        provider: ProviderKind,
        timeout_ms: u64,
        log: Box<InvocationLog>,
    },
    #[error("provider output parse failure for {provider}: {reason}")]
    ParseFailure {
        provider: ProviderKind,
        reason: String,
        log: Option<Box<InvocationLog>>,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProviderError {
    pub fn invocation_log(&self) -> Option<&InvocationLog> {
        match self {
            Self::MissingBinary { log, .. }
            | Self::NonZeroExit { log, .. }
            | Self::Timeout { log, .. } => Some(log),
            Self::ParseFailure { log, .. } => log.as_deref(),
            Self::UnknownProvider(_) | Self::UnsupportedAnthropicModel(_) | Self::Io { .. } => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

impl TryFrom<&str> for ProviderKind {
    type Error = ProviderError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// One blocking call to a provider CLI.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub call_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub cwd: PathBuf,
    pub prompt: String,
    pub prompt_file: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InvocationSpec {
    pub binary: String,
    pub args: Vec<String>,
    pub resolved_model: String,
}

#[derive(Debug, Clone)]
pub struct InvocationLog {
    pub call_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub binary: String,
    pub working_directory: PathBuf,
    pub prompt_file: PathBuf,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub message: String,
    pub log: InvocationLog,
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ProviderError {
    ProviderError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!(
            ProviderKind::try_from(" OpenAI ").expect("openai"),
            ProviderKind::OpenAi
        );
        assert!(matches!(
            ProviderKind::try_from("gemini"),
            Err(ProviderError::UnknownProvider(ref name)) if name == "gemini"
        ));
    }

    #[test]
    fn provider_kind_uses_lowercase_yaml_names() {
        let kind: ProviderKind = serde_yaml::from_str("openai").expect("yaml");
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(kind.to_string(), "openai");
    }
}
