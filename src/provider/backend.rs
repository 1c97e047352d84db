use crate::config::ProviderSettings;
use crate::provider::{
    persist_invocation_log, run_provider, write_file_backed_prompt, ProviderError, ProviderRequest,
    RunnerBinaries,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

/// A text-generation service. Calls block until the reply is complete.
pub trait GenerativeBackend {
    fn invoke(&self, prompt: &str) -> Result<Generation, ProviderError>;
}

/// Runs each prompt through the configured provider CLI.
#[derive(Debug)]
pub struct CliBackend {
    settings: ProviderSettings,
    binaries: RunnerBinaries,
    workspace: PathBuf,
    calls: AtomicU32,
}

impl CliBackend {
    pub fn new(settings: ProviderSettings, workspace: impl Into<PathBuf>) -> Self {
        let binaries = RunnerBinaries::with_override(settings.kind, settings.binary.as_deref());
        Self {
            settings,
            binaries,
            workspace: workspace.into(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_runner_binaries(mut self, binaries: RunnerBinaries) -> Self {
        self.binaries = binaries;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn next_call_id(&self) -> String {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        format!("call-{n:03}")
    }
}

impl GenerativeBackend for CliBackend {
    fn invoke(&self, prompt: &str) -> Result<Generation, ProviderError> {
        fs::create_dir_all(&self.workspace).map_err(|err| ProviderError::Io {
            path: self.workspace.display().to_string(),
            source: err,
        })?;
        let call_id = self.next_call_id();
        let prompt_file = write_file_backed_prompt(&self.workspace, &call_id, prompt)?;
        let request = ProviderRequest {
            call_id,
            provider: self.settings.kind,
            model: self.settings.model.clone(),
            cwd: self.workspace.clone(),
            prompt: prompt.to_string(),
            prompt_file,
            timeout: Duration::from_secs(self.settings.timeout_seconds),
        };

        match run_provider(&request, &self.binaries) {
            Ok(result) => {
                let _ = persist_invocation_log(&self.workspace, &result.log, None);
                Ok(Generation {
                    text: result.message,
                })
            }
            Err(err) => {
                if let Some(log) = err.invocation_log() {
                    let _ = persist_invocation_log(&self.workspace, log, Some(&err.to_string()));
                }
                Err(err)
            }
        }
    }
}
