pub mod github;
pub mod protocol;

pub use github::GithubClient;
pub use protocol::{
    branch_name_for, is_skippable_manifest, remote_path, CommitAction, CommitRecord, PublishError,
    PublishReceipt, PublishStep, Publisher, RemoteChangeSet, CHANGE_REQUEST_BODY,
    DEFAULT_CHANGE_REQUEST_TITLE,
};

use std::fmt;

/// `owner/name` pair identifying a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

fn is_valid_repository_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

impl RepositoryId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| format!("repository `{trimmed}` must use `owner/name` format"))?;
        let name = name.strip_suffix(".git").unwrap_or(name);
        if !is_valid_repository_segment(owner) || !is_valid_repository_segment(name) {
            return Err(format!(
                "repository `{trimmed}` must use `owner/name` with ASCII letters, digits, `-`, `_` or `.`"
            ));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub default_branch: String,
}

/// A file as it currently exists on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Opaque token the host requires to overwrite this version.
    pub version_token: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Remote operations the publisher needs from a code host.
///
/// Implementations map their own "path already exists" signal to
/// [`CreateOutcome::AlreadyExists`]; every other failure is a [`HostError`].
pub trait RepositoryHost {
    fn get_repository(&self, repo: &RepositoryId) -> Result<RepositoryInfo, HostError>;

    fn get_branch_head(&self, repo: &RepositoryId, branch: &str) -> Result<String, HostError>;

    fn create_branch(
        &self,
        repo: &RepositoryId,
        branch: &str,
        from_commit: &str,
    ) -> Result<(), HostError>;

    fn create_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<CreateOutcome, HostError>;

    fn get_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
    ) -> Result<RemoteFile, HostError>;

    fn update_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
        content: &str,
        version_token: &str,
        message: &str,
    ) -> Result<(), HostError>;

    /// Returns the change request's web URL.
    fn create_change_request(
        &self,
        repo: &RepositoryId,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, HostError>;
}
