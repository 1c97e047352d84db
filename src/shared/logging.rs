use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn log_path(state_root: &Path) -> PathBuf {
    state_root.join("logs/devcrew.log")
}

pub fn append_log_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}

/// JSON-lines event log. Write failures never reach the caller.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.record("info", event, message, fields);
    }

    pub fn warn(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.record("warn", event, message, fields);
    }

    pub fn error(&self, event: &str, message: &str, fields: &[(&str, Value)]) {
        self.record("error", event, message, fields);
    }

    pub fn record(&self, level: &str, event: &str, message: &str, fields: &[(&str, Value)]) {
        let Some(path) = &self.path else {
            return;
        };

        let mut payload = Map::new();
        payload.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().timestamp()),
        );
        payload.insert("level".to_string(), Value::String(level.to_string()));
        payload.insert("event".to_string(), Value::String(event.to_string()));
        payload.insert("message".to_string(), Value::String(message.to_string()));
        for (key, value) in fields {
            payload.insert((*key).to_string(), value.clone());
        }

        let Ok(line) = serde_json::to_string(&Value::Object(payload)) else {
            return;
        };
        let _ = append_log_line(path, &line);
    }
}
