use crate::app::command_support::{event_log_for, load_run_config, parse_command_options};
use crate::config::RunConfig;
use crate::files::{normalize_file_set, read_project_summary, FileSet};
use crate::publish::{CommitAction, GithubClient, PublishError, PublishReceipt, Publisher};
use std::path::Path;

pub fn cmd_publish(args: &[String]) -> Result<String, String> {
    let options = parse_command_options(args, &["--config", "--title"])?;
    let [summary_path] = options.positionals.as_slice() else {
        return Err("usage: publish <project.json> [--config PATH] [--title TITLE]".to_string());
    };
    let output = read_project_summary(Path::new(summary_path)).map_err(|e| e.to_string())?;
    let config = load_run_config(&options)?;
    let files = normalize_file_set(&output.files);

    match publish_files(&config, &files, options.title.as_deref().unwrap_or("")) {
        Ok(receipt) => Ok(render_publish_success(&receipt).join("\n")),
        Err(err) => Err(render_publish_failure(&err).join("\n")),
    }
}

pub fn publish_files(
    config: &RunConfig,
    files: &FileSet,
    title: &str,
) -> Result<PublishReceipt, PublishError> {
    let client = GithubClient::from_config(&config.publish);
    Publisher::new(client, config.publish.clone())
        .with_event_log(event_log_for(config))
        .publish(files, title)
}

pub fn render_publish_success(receipt: &PublishReceipt) -> Vec<String> {
    let count = |action: CommitAction| {
        receipt
            .commits
            .iter()
            .filter(|commit| commit.action == action)
            .count()
    };
    let mut lines = vec![
        "publish_status=published".to_string(),
        format!("pull_request_url={}", receipt.url),
        format!("branch={}", receipt.branch),
        format!("files_created={}", count(CommitAction::Created)),
        format!("files_updated={}", count(CommitAction::Updated)),
    ];
    if !receipt.skipped.is_empty() {
        lines.push(format!("files_skipped={}", receipt.skipped.join(",")));
    }
    lines
}

pub fn render_publish_failure(err: &PublishError) -> Vec<String> {
    let mut lines = vec!["publish_status=failed".to_string()];
    if let Some(step) = err.step() {
        lines.push(format!("publish_step={step}"));
    }
    lines.push(format!("publish_error={err}"));
    lines
}
