use crate::config::PublishConfig;
use crate::publish::{CreateOutcome, HostError, RemoteFile, RepositoryHost, RepositoryId, RepositoryInfo};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("devcrew/", env!("CARGO_PKG_VERSION"));

/// [`RepositoryHost`] over the GitHub REST API.
pub struct GithubClient {
    agent: ureq::Agent,
    api_base: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn status_error(status: u16, response: ureq::Response) -> HostError {
    let body = response.into_string().unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or(body);
    HostError::Status {
        status,
        message: message.trim().to_string(),
    }
}

fn host_error(err: ureq::Error) -> HostError {
    match err {
        ureq::Error::Status(status, response) => status_error(status, response),
        ureq::Error::Transport(transport) => HostError::Transport(transport.to_string()),
    }
}

fn is_missing_sha(message: &str) -> bool {
    message.contains("\"sha\" wasn't supplied")
}

fn decode<T: for<'de> Deserialize<'de>>(response: ureq::Response) -> Result<T, HostError> {
    response
        .into_json::<T>()
        .map_err(|e| HostError::Decode(e.to_string()))
}

fn decode_content(raw: &ContentResponse) -> Result<String, HostError> {
    let Some(content) = raw.content.as_deref() else {
        return Ok(String::new());
    };
    if raw.encoding.as_deref().is_some_and(|enc| enc != "base64") {
        return Ok(content.to_string());
    }
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| HostError::Decode(format!("file content is not valid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| HostError::Decode(format!("file content is not UTF-8: {e}")))
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &PublishConfig) -> Self {
        Self::new(config.api_base.clone(), config.token.clone())
    }

    fn repo_endpoint(&self, repo: &RepositoryId, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            path
        )
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let request = self
            .agent
            .request(method, url)
            .set("accept", "application/vnd.github+json")
            .set("x-github-api-version", "2022-11-28")
            .set("user-agent", USER_AGENT);
        match &self.token {
            Some(token) => request.set("authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn get(&self, url: &str) -> Result<ureq::Response, HostError> {
        self.request("GET", url).call().map_err(host_error)
    }

    fn send(&self, method: &str, url: &str, body: Value) -> Result<ureq::Response, HostError> {
        self.request(method, url).send_json(body).map_err(host_error)
    }

    fn contents_url(&self, repo: &RepositoryId, path: &str) -> String {
        self.repo_endpoint(repo, &format!("contents/{}", encode_path(path)))
    }
}

impl RepositoryHost for GithubClient {
    fn get_repository(&self, repo: &RepositoryId) -> Result<RepositoryInfo, HostError> {
        let url = self.repo_endpoint(repo, "").trim_end_matches('/').to_string();
        let parsed: RepositoryResponse = decode(self.get(&url)?)?;
        Ok(RepositoryInfo {
            default_branch: parsed.default_branch,
        })
    }

    fn get_branch_head(&self, repo: &RepositoryId, branch: &str) -> Result<String, HostError> {
        let url = self.repo_endpoint(repo, &format!("branches/{}", encode_path(branch)));
        let parsed: BranchResponse = decode(self.get(&url)?)?;
        Ok(parsed.commit.sha)
    }

    fn create_branch(
        &self,
        repo: &RepositoryId,
        branch: &str,
        from_commit: &str,
    ) -> Result<(), HostError> {
        let url = self.repo_endpoint(repo, "git/refs");
        self.send(
            "POST",
            &url,
            json!({ "ref": format!("refs/heads/{branch}"), "sha": from_commit }),
        )?;
        Ok(())
    }

    /// GitHub answers 422 with a missing-`sha` message when the path exists.
    /// Other 422s (an invalid path, say) stay errors.
    fn create_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<CreateOutcome, HostError> {
        let url = self.contents_url(repo, path);
        let body = json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": branch,
        });
        match self.send("PUT", &url, body) {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(HostError::Status {
                status: 422,
                ref message,
            }) if is_missing_sha(message) => Ok(CreateOutcome::AlreadyExists),
            Err(err) => Err(err),
        }
    }

    fn get_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
    ) -> Result<RemoteFile, HostError> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(repo, path),
            urlencoding::encode(branch)
        );
        let parsed: ContentResponse = decode(self.get(&url)?)?;
        let content = decode_content(&parsed)?;
        Ok(RemoteFile {
            version_token: parsed.sha,
            content,
        })
    }

    fn update_file(
        &self,
        repo: &RepositoryId,
        branch: &str,
        path: &str,
        content: &str,
        version_token: &str,
        message: &str,
    ) -> Result<(), HostError> {
        let url = self.contents_url(repo, path);
        self.send(
            "PUT",
            &url,
            json!({
                "message": message,
                "content": STANDARD.encode(content.as_bytes()),
                "branch": branch,
                "sha": version_token,
            }),
        )?;
        Ok(())
    }

    fn create_change_request(
        &self,
        repo: &RepositoryId,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String, HostError> {
        let url = self.repo_endpoint(repo, "pulls");
        let parsed: PullResponse = decode(self.send(
            "POST",
            &url,
            json!({ "title": title, "body": body, "head": head, "base": base }),
        )?)?;
        Ok(parsed.html_url)
    }
}
