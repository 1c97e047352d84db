use crate::config::PublishConfig;
use crate::files::FileSet;
use crate::publish::{CreateOutcome, HostError, RepositoryHost, RepositoryId};
use crate::shared::logging::EventLog;
use crate::shared::redact::redact_secret;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub const DEFAULT_CHANGE_REQUEST_TITLE: &str = "Add generated project";
pub const CHANGE_REQUEST_BODY: &str =
    "This pull request was opened by devcrew with a generated project. Review the files before merging.";

const DEPENDENCY_MANIFEST: &str = "requirements.txt";
const NO_DEPENDENCIES_SENTINEL: &str = "# no external dependencies";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    ResolveRepository,
    ResolveBaseCommit,
    CreateBranch,
    CreateFile,
    FetchExistingFile,
    UpdateFile,
    OpenChangeRequest,
}

impl PublishStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolveRepository => "resolve_repository",
            Self::ResolveBaseCommit => "resolve_base_commit",
            Self::CreateBranch => "create_branch",
            Self::CreateFile => "create_file",
            Self::FetchExistingFile => "fetch_existing_file",
            Self::UpdateFile => "update_file",
            Self::OpenChangeRequest => "open_change_request",
        }
    }
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("publish is not configured: {0}")]
    Configuration(String),
    #[error("publish step `{step}` failed: {reason}")]
    RemoteOperation { step: PublishStep, reason: String },
}

impl PublishError {
    pub fn step(&self) -> Option<PublishStep> {
        match self {
            Self::Configuration(_) => None,
            Self::RemoteOperation { step, .. } => Some(*step),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub path: String,
    pub action: CommitAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub url: String,
    pub branch: String,
    pub commits: Vec<CommitRecord>,
    pub skipped: Vec<String>,
}

/// One publish attempt's worth of remote changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteChangeSet {
    pub branch_name: String,
    pub base_commit_id: String,
    pub files: Vec<(String, String)>,
    pub title: String,
    pub body: String,
}

/// `<prefix>/<YYYYMMDD-HHMMSS>` in UTC.
///
/// Two attempts within the same second against the same repository produce
/// the same name; the second one fails at branch creation.
pub fn branch_name_for(prefix: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{}",
        prefix.trim().trim_matches('/'),
        now.format("%Y%m%d-%H%M%S")
    )
}

/// A dependency manifest that declares nothing is not worth a commit.
pub fn is_skippable_manifest(path: &str, content: &str) -> bool {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    if file_name != DEPENDENCY_MANIFEST {
        return false;
    }
    let trimmed = content.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_DEPENDENCIES_SENTINEL)
}

/// Hosts expect `/` separators and no `.` segments.
pub fn remote_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

pub struct Publisher<H: RepositoryHost> {
    host: H,
    config: PublishConfig,
    log: EventLog,
}

impl<H: RepositoryHost> Publisher<H> {
    pub fn new(host: H, config: PublishConfig) -> Self {
        Self {
            host,
            config,
            log: EventLog::disabled(),
        }
    }

    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn publish(&self, files: &FileSet, title: &str) -> Result<PublishReceipt, PublishError> {
        self.publish_at(files, title, Utc::now())
    }

    /// Like [`Publisher::publish`] with an explicit clock for the branch name.
    pub fn publish_at(
        &self,
        files: &FileSet,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<PublishReceipt, PublishError> {
        let result = self.check_preconditions().and_then(|repo| {
            self.log.info(
                "publish.started",
                "publish started",
                &[
                    ("repository", Value::from(repo.to_string())),
                    ("files", Value::from(files.len())),
                ],
            );
            self.execute(repo, files, title, now)
        });

        match &result {
            Ok(receipt) => self.log.info(
                "publish.completed",
                "change request opened",
                &[
                    ("url", Value::from(receipt.url.as_str())),
                    ("branch", Value::from(receipt.branch.as_str())),
                    ("commits", Value::from(receipt.commits.len())),
                ],
            ),
            Err(err) => self.log.error(
                "publish.failed",
                &err.to_string(),
                &[(
                    "step",
                    err.step()
                        .map_or(Value::Null, |step| Value::from(step.as_str())),
                )],
            ),
        }
        result
    }

    fn check_preconditions(&self) -> Result<&RepositoryId, PublishError> {
        if self.config.token.is_none() {
            return Err(PublishError::Configuration(
                "no credential is available; set the variable named by `publish.token_env`"
                    .to_string(),
            ));
        }
        self.config.repository.as_ref().ok_or_else(|| {
            PublishError::Configuration("`publish.repository` is not set".to_string())
        })
    }

    fn remote_error(&self, step: PublishStep, detail: Option<&str>, err: HostError) -> PublishError {
        let reason = match detail {
            Some(detail) => format!("{detail}: {err}"),
            None => err.to_string(),
        };
        PublishError::RemoteOperation {
            step,
            reason: redact_secret(&reason, self.config.token.as_deref()),
        }
    }

    fn plan_change_set(
        &self,
        repo: &RepositoryId,
        files: &FileSet,
        title: &str,
        now: DateTime<Utc>,
        skipped: &mut Vec<String>,
    ) -> Result<(RemoteChangeSet, String), PublishError> {
        let info = self
            .host
            .get_repository(repo)
            .map_err(|err| self.remote_error(PublishStep::ResolveRepository, None, err))?;
        let base_commit_id = self
            .host
            .get_branch_head(repo, &info.default_branch)
            .map_err(|err| {
                self.remote_error(
                    PublishStep::ResolveBaseCommit,
                    Some(info.default_branch.as_str()),
                    err,
                )
            })?;

        let mut planned = Vec::with_capacity(files.len());
        for (path, content) in files.iter() {
            let path = remote_path(path);
            if is_skippable_manifest(&path, content) {
                self.log.info(
                    "publish.file_skipped",
                    "dependency manifest declares nothing",
                    &[("path", Value::from(path.as_str()))],
                );
                skipped.push(path);
                continue;
            }
            planned.push((path, content.to_string()));
        }

        let title = title.trim();
        let change_set = RemoteChangeSet {
            branch_name: branch_name_for(&self.config.branch_prefix, now),
            base_commit_id,
            files: planned,
            title: if title.is_empty() {
                DEFAULT_CHANGE_REQUEST_TITLE.to_string()
            } else {
                title.to_string()
            },
            body: CHANGE_REQUEST_BODY.to_string(),
        };
        Ok((change_set, info.default_branch))
    }

    fn execute(
        &self,
        repo: &RepositoryId,
        files: &FileSet,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<PublishReceipt, PublishError> {
        let mut skipped = Vec::new();
        let (change_set, default_branch) =
            self.plan_change_set(repo, files, title, now, &mut skipped)?;
        let branch = change_set.branch_name.as_str();

        self.host
            .create_branch(repo, branch, &change_set.base_commit_id)
            .map_err(|err| self.remote_error(PublishStep::CreateBranch, Some(branch), err))?;

        let mut commits = Vec::with_capacity(change_set.files.len());
        for (path, content) in &change_set.files {
            let action = self.commit_file(repo, branch, path, content)?;
            commits.push(CommitRecord {
                path: path.clone(),
                action,
            });
        }

        let url = self
            .host
            .create_change_request(
                repo,
                branch,
                &default_branch,
                &change_set.title,
                &change_set.body,
            )
            .map_err(|err| self.remote_error(PublishStep::OpenChangeRequest, None, err))?;

        Ok(PublishReceipt {
            url,
            branch: change_set.branch_name,
            commits,
            skipped,
        })
    }

    fn commit_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Result<CommitAction, PublishError> {
        let outcome = self
            .host
            .create_file(repo, branch, path, content, &format!("Add {path}"))
            .map_err(|err| self.remote_error(PublishStep::CreateFile, Some(path), err))?;
        if outcome == CreateOutcome::Created {
            return Ok(CommitAction::Created);
        }

        self.log.info(
            "publish.file_conflict",
            "path already exists on branch; updating",
            &[("path", Value::from(path))],
        );
        let existing = self
            .host
            .get_file(repo, branch, path)
            .map_err(|err| self.remote_error(PublishStep::FetchExistingFile, Some(path), err))?;
        self.host
            .update_file(
                repo,
                branch,
                path,
                content,
                &existing.version_token,
                &format!("Update {path}"),
            )
            .map_err(|err| self.remote_error(PublishStep::UpdateFile, Some(path), err))?;
        Ok(CommitAction::Updated)
    }
}
