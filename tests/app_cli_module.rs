use devcrew::app::command_handlers::run_cli;
use devcrew::files::{read_project_summary, write_project_summary, FileSet};
use devcrew::pipeline::ProjectOutput;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::tempdir;

const MOCK_CLAUDE: &str = r##"#!/bin/sh
prompt="$6"
case "$prompt" in
  *"senior software architect"*)
    printf '%s\n' '# Plan' '- main.py' '- pkg/__init__.py'
    ;;
  *"Python developer"*)
    cat <<'EOF'
Sure, here is the project.
```json
{"main.py": "print('hi')", "pkg/init.py": "x = 1", "requirements.txt": "# No external dependencies"}
```
EOF
    ;;
  *"QA engineer"*)
    printf '```json\n{"tests/test_main.py": "def test_ok():\\n    assert True"}\n```\n'
    ;;
  *"DevOps engineer"*)
    echo 'Run python main.py'
    ;;
  *)
    echo 'unexpected prompt' 1>&2
    exit 9
    ;;
esac
"##;

const GENERATED_FILES: &str = r##"{"main.py": "print('hi')", "pkg/init.py": "x = 1", "requirements.txt": "# No external dependencies"}"##;

/// The mock provider with a different generate-stage file map.
fn mock_claude_generating(files_json: &str) -> String {
    MOCK_CLAUDE.replace(GENERATED_FILES, files_json)
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn write_config(dir: &Path, binary: &Path, api_base: &str, token_env: &str) -> PathBuf {
    let config = format!(
        "state_root: {}\nprovider:\n  kind: anthropic\n  model: sonnet\n  timeout_seconds: 10\n  binary: {}\npublish:\n  repository: acme/widgets\n  api_base: {api_base}\n  branch_prefix: devcrew\n  token_env: {token_env}\n",
        dir.join("state").display(),
        binary.display(),
    );
    let path = dir.join("config.yaml");
    fs::write(&path, config).expect("write config");
    path
}

#[test]
fn help_lists_commands() {
    let help = run_cli(Vec::new()).expect("help");
    assert!(help.contains("run [options] [request...]"));
    assert!(help.contains("publish <project.json>"));
    assert_eq!(run_cli(args(&["help"])).expect("help"), help);
}

#[test]
fn unknown_command_is_rejected() {
    let err = run_cli(args(&["deploy"])).expect_err("unknown");
    assert!(err.starts_with("unknown command `deploy`"));
}

#[test]
fn run_prints_sections_and_exports_project() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-mock");
    write_script(&bin, MOCK_CLAUDE);
    let config = write_config(
        dir.path(),
        &bin,
        "http://127.0.0.1:9",
        "DEVCREW_TEST_TOKEN_UNSET_RUN",
    );
    let out = dir.path().join("out");

    let output = run_cli(args(&[
        "run",
        "--config",
        config.to_str().expect("utf8"),
        "--out",
        out.to_str().expect("utf8"),
        "a",
        "greeting",
        "script",
    ]))
    .expect("run");

    let plan_at = output.find("[DESIGN PLAN]").expect("plan section");
    let files_at = output.find("[FILES]").expect("files section");
    let guide_at = output.find("[DEPLOYMENT GUIDE]").expect("guide section");
    assert!(plan_at < files_at && files_at < guide_at);
    assert!(output.contains("### pkg/__init__.py"));
    assert!(output.contains("Run python main.py"));
    assert!(output.contains("publish_status=skipped"));

    assert_eq!(fs::read_to_string(out.join("main.py")).expect("main"), "print('hi')");
    assert_eq!(fs::read_to_string(out.join("pkg/__init__.py")).expect("marker"), "");
    assert_eq!(
        fs::read_to_string(out.join("tests/test_main.py")).expect("test"),
        "def test_ok():\n    assert True"
    );
    let summary = read_project_summary(&out.join("project.json")).expect("summary");
    assert_eq!(summary.request, "a greeting script");
    assert_eq!(summary.files.len(), 4);

    let log = fs::read_to_string(dir.path().join("state/logs/devcrew.log")).expect("log");
    assert!(log.contains("\"event\":\"pipeline.completed\""));
    let runs: Vec<_> = fs::read_dir(dir.path().join("state/runs"))
        .expect("runs dir")
        .collect();
    assert_eq!(runs.len(), 1);
}

#[test]
fn run_exports_current_dir_prefixed_keys() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-mock");
    write_script(
        &bin,
        &mock_claude_generating(r#"{"./main.py": "print('hi')", "./pkg/util.py": "x = 1"}"#),
    );
    let config = write_config(
        dir.path(),
        &bin,
        "http://127.0.0.1:9",
        "DEVCREW_TEST_TOKEN_UNSET_DOT",
    );
    let out = dir.path().join("out");

    let output = run_cli(args(&[
        "run",
        "--config",
        config.to_str().expect("utf8"),
        "--out",
        out.to_str().expect("utf8"),
        "greeting",
    ]))
    .expect("run");

    assert!(output.contains("[DEPLOYMENT GUIDE]"));
    assert!(output.contains(&format!("output_dir={}", out.display())));
    assert!(!output.contains("export_status=failed"));
    assert_eq!(fs::read_to_string(out.join("main.py")).expect("main"), "print('hi')");
    assert_eq!(fs::read_to_string(out.join("pkg/util.py")).expect("util"), "x = 1");
    assert!(out.join("project.json").is_file());
}

#[test]
fn run_reports_export_failure_without_discarding_output() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-mock");
    write_script(
        &bin,
        &mock_claude_generating(r#"{"main.py": "print('hi')", "../escape.py": "x = 1"}"#),
    );
    let config = write_config(
        dir.path(),
        &bin,
        "http://127.0.0.1:9",
        "DEVCREW_TEST_TOKEN_UNSET_ESCAPE",
    );
    let out = dir.path().join("out");

    let output = run_cli(args(&[
        "run",
        "--config",
        config.to_str().expect("utf8"),
        "--out",
        out.to_str().expect("utf8"),
        "greeting",
    ]))
    .expect("run");

    assert!(output.contains("[DESIGN PLAN]"));
    assert!(output.contains("### ../escape.py"));
    assert!(output.contains("Run python main.py"));
    assert!(output.contains("export_status=failed"));
    assert!(output.contains("export_error=refusing to write file `../escape.py`"));
    assert!(!output.contains("output_dir="));
    assert!(output.contains("publish_status=skipped"));
    assert!(!out.join("main.py").exists());
    assert!(!dir.path().join("escape.py").exists());
}

#[test]
fn run_with_publish_but_no_credential_still_succeeds() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-mock");
    write_script(&bin, MOCK_CLAUDE);
    let config = write_config(
        dir.path(),
        &bin,
        "http://127.0.0.1:9",
        "DEVCREW_TEST_TOKEN_UNSET_PUBLISH",
    );

    let output = run_cli(args(&[
        "run",
        "--config",
        config.to_str().expect("utf8"),
        "--publish",
        "greeting script",
    ]))
    .expect("run");
    assert!(output.contains("[DEPLOYMENT GUIDE]"));
    assert!(output.contains("publish_status=failed"));
    assert!(output.contains("publish_error=publish is not configured"));
    assert!(!output.contains("publish_step="));
}

#[test]
fn run_failure_names_the_stage() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-broken");
    write_script(
        &bin,
        "#!/bin/sh\ncase \"$6\" in *architect*) echo plan ;; *) echo 'quota exceeded' 1>&2; exit 2 ;; esac\n",
    );
    let config = write_config(dir.path(), &bin, "http://127.0.0.1:9", "UNUSED_TOKEN_VAR");

    let err = run_cli(args(&[
        "run",
        "--config",
        config.to_str().expect("utf8"),
        "greeting",
    ]))
    .expect_err("generate fails");
    assert!(err.contains("stage `generate` failed"));
    assert!(err.contains("quota exceeded"));
}

struct RecordedRequest {
    path: String,
    body: String,
}

/// Answers `expected` GitHub calls in order and returns what it received.
fn serve_github(expected: usize) -> (String, thread::JoinHandle<Vec<RecordedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base_url = format!("http://{}", listener.local_addr().expect("addr"));
    let server = thread::spawn(move || {
        let mut requests = Vec::new();
        for _ in 0..expected {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let path = request_line
                .split_whitespace()
                .nth(1)
                .unwrap_or("/")
                .to_string();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let mut body = vec![0_u8; content_length];
            reader.read_exact(&mut body).expect("body");

            let (status, response) = match path.as_str() {
                "/repos/acme/widgets" => (200, r#"{"default_branch":"main"}"#),
                "/repos/acme/widgets/branches/main" => (200, r#"{"commit":{"sha":"base"}}"#),
                "/repos/acme/widgets/git/refs" => (201, r#"{"ref":"refs/heads/x"}"#),
                "/repos/acme/widgets/pulls" => {
                    (201, r#"{"html_url":"https://github.com/acme/widgets/pull/3"}"#)
                }
                _ => (201, r#"{"content":{"sha":"s"}}"#),
            };
            let reply = format!(
                "HTTP/1.1 {status} MOCK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
                response.len()
            );
            stream.write_all(reply.as_bytes()).expect("write");
            requests.push(RecordedRequest {
                path,
                body: String::from_utf8_lossy(&body).to_string(),
            });
        }
        requests
    });
    (base_url, server)
}

#[test]
fn publish_command_opens_pull_request_for_exported_project() {
    let (base_url, server) = serve_github(5);

    let dir = tempdir().expect("tempdir");
    let token_env = "DEVCREW_TEST_TOKEN_PUBLISH_COMMAND";
    std::env::set_var(token_env, "ghp_publish_command");
    let config = write_config(dir.path(), Path::new("claude"), &base_url, token_env);
    let files: FileSet = [
        ("main.py", "print('hi')"),
        ("requirements.txt", "# No external dependencies"),
    ]
    .into_iter()
    .collect();
    let project = ProjectOutput {
        request: "greeting".to_string(),
        design_plan: "plan".to_string(),
        files,
        deployment_guide: "guide".to_string(),
    };
    let summary = write_project_summary(&dir.path().join("out"), &project).expect("summary");

    let output = run_cli(args(&[
        "publish",
        summary.to_str().expect("utf8"),
        "--config",
        config.to_str().expect("utf8"),
        "--title",
        "Greeting",
    ]))
    .expect("publish");

    assert!(output.contains("publish_status=published"));
    assert!(output.contains("pull_request_url=https://github.com/acme/widgets/pull/3"));
    assert!(output.contains("files_created=1"));
    assert!(output.contains("files_skipped=requirements.txt"));

    let requests = server.join().expect("server");
    assert_eq!(requests[3].path, "/repos/acme/widgets/contents/main.py");
}

#[test]
fn publish_command_normalizes_a_hand_edited_summary() {
    let (base_url, server) = serve_github(5);

    let dir = tempdir().expect("tempdir");
    let token_env = "DEVCREW_TEST_TOKEN_PUBLISH_EDITED";
    std::env::set_var(token_env, "ghp_publish_edited");
    let config = write_config(dir.path(), Path::new("claude"), &base_url, token_env);
    let summary = dir.path().join("project.json");
    fs::write(
        &summary,
        r#"{"request":"greeting","designPlan":"plan","files":{"pkg/init.py":"import os","  ":"x"},"deploymentGuide":"guide"}"#,
    )
    .expect("write summary");

    let output = run_cli(args(&[
        "publish",
        summary.to_str().expect("utf8"),
        "--config",
        config.to_str().expect("utf8"),
    ]))
    .expect("publish");
    assert!(output.contains("files_created=1"));

    let requests = server.join().expect("server");
    let file_puts: Vec<_> = requests
        .iter()
        .filter(|request| request.path.contains("/contents/"))
        .collect();
    assert_eq!(file_puts.len(), 1);
    assert_eq!(file_puts[0].path, "/repos/acme/widgets/contents/pkg/__init__.py");
    let body: serde_json::Value = serde_json::from_str(&file_puts[0].body).expect("json body");
    assert_eq!(body["content"], "");
}

#[test]
fn publish_command_requires_a_summary_path() {
    let err = run_cli(args(&["publish"])).expect_err("usage");
    assert!(err.starts_with("usage: publish"));
}
