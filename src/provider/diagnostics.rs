use crate::provider::InvocationLog;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const INVOCATION_DIR_NAME: &str = "provider_invocations";

pub fn persist_invocation_log(
    workspace: &Path,
    log: &InvocationLog,
    error: Option<&str>,
) -> std::io::Result<PathBuf> {
    let dir = workspace.join(INVOCATION_DIR_NAME);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.json", log.call_id));

    let mut payload = Map::from_iter([
        ("callId".to_string(), Value::String(log.call_id.clone())),
        (
            "provider".to_string(),
            Value::String(log.provider.to_string()),
        ),
        ("model".to_string(), Value::String(log.model.clone())),
        ("binary".to_string(), Value::String(log.binary.clone())),
        (
            "workingDirectory".to_string(),
            Value::String(log.working_directory.display().to_string()),
        ),
        (
            "promptFile".to_string(),
            Value::String(log.prompt_file.display().to_string()),
        ),
        (
            "exitCode".to_string(),
            match log.exit_code {
                Some(value) => Value::from(value),
                None => Value::Null,
            },
        ),
        ("timedOut".to_string(), Value::Bool(log.timed_out)),
        ("durationMs".to_string(), Value::from(log.duration_ms)),
    ]);
    if let Some(error) = error {
        payload.insert("error".to_string(), Value::String(error.to_string()));
    }

    let body = serde_json::to_vec_pretty(&Value::Object(payload)).map_err(std::io::Error::other)?;
    fs::write(&path, body)?;
    Ok(path)
}
