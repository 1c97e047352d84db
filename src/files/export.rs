use super::FileSet;
use crate::pipeline::ProjectOutput;
use crate::shared::fs_atomic::atomic_write_file;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const PROJECT_SUMMARY_FILE_NAME: &str = "project.json";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("refusing to write file `{path}`: {reason}")]
    UnsafePath { path: String, reason: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode project summary: {0}")]
    Encode(#[from] serde_json::Error),
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn unsafe_path(path: &str, reason: &str) -> ExportError {
    ExportError::UnsafePath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Maps a file-set key to a path below the export root.
///
/// Keys may use either separator style; both are treated as directory
/// separators here. `.` segments are dropped.
pub fn resolve_export_path(root: &Path, key: &str) -> Result<PathBuf, ExportError> {
    let unified = key.replace('\\', "/");
    let relative = Path::new(&unified);
    if relative.is_absolute() {
        return Err(unsafe_path(key, "path must be relative"));
    }

    let mut resolved = root.to_path_buf();
    let mut has_normal = false;
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                has_normal = true;
                resolved.push(segment);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(unsafe_path(key, "parent segments (`..`) are not allowed"))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path(key, "absolute-style segments are not allowed"))
            }
        }
    }
    if !has_normal || unified.ends_with('/') {
        return Err(unsafe_path(key, "path must name a file"));
    }

    Ok(resolved)
}

/// Writes every file of `files` below `root`, returning the written paths.
///
/// All paths are validated before anything is written.
pub fn write_file_set(root: &Path, files: &FileSet) -> Result<Vec<PathBuf>, ExportError> {
    let targets = files
        .iter()
        .map(|(key, content)| Ok((resolve_export_path(root, key)?, content)))
        .collect::<Result<Vec<_>, ExportError>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (target, content) in targets {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
        }
        atomic_write_file(&target, content.as_bytes()).map_err(|err| io_error(&target, err))?;
        written.push(target);
    }
    Ok(written)
}

pub fn write_project_summary(root: &Path, output: &ProjectOutput) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(root).map_err(|err| io_error(root, err))?;
    let path = root.join(PROJECT_SUMMARY_FILE_NAME);
    let body = serde_json::to_vec_pretty(output)?;
    atomic_write_file(&path, &body).map_err(|err| io_error(&path, err))?;
    Ok(path)
}

pub fn read_project_summary(path: &Path) -> Result<ProjectOutput, ExportError> {
    let raw = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
    Ok(serde_json::from_str(&raw)?)
}
