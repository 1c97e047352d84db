use crate::provider::{io_error, ProviderError};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROMPT_DIR_NAME: &str = "provider_prompts";

/// Persists a prompt under the run workspace so a failed call can be replayed.
pub fn write_file_backed_prompt(
    workspace: &Path,
    call_id: &str,
    prompt: &str,
) -> Result<PathBuf, ProviderError> {
    let prompt_dir = workspace.join(PROMPT_DIR_NAME);
    fs::create_dir_all(&prompt_dir).map_err(|err| io_error(&prompt_dir, err))?;

    let prompt_file = prompt_dir.join(format!("{call_id}_prompt.md"));
    fs::write(&prompt_file, prompt).map_err(|err| io_error(&prompt_file, err))?;
    Ok(prompt_file)
}
