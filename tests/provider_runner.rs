use devcrew::config::ProviderSettings;
use devcrew::provider::{
    run_provider, write_file_backed_prompt, CliBackend, GenerativeBackend, ProviderError,
    ProviderKind, ProviderRequest, RunnerBinaries,
};
use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn base_request(provider: ProviderKind, model: &str, cwd: &Path, call_id: &str) -> ProviderRequest {
    let prompt_file = write_file_backed_prompt(cwd, call_id, "prompt").expect("prompt file");
    ProviderRequest {
        call_id: call_id.to_string(),
        provider,
        model: model.to_string(),
        cwd: cwd.to_path_buf(),
        prompt: "prompt".to_string(),
        prompt_file,
        timeout: Duration::from_secs(1),
    }
}

#[test]
fn mocked_anthropic_success_and_model_mapping() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-mock");
    write_script(&bin, "#!/bin/sh\necho \"$2\"\necho 'anthropic response'\n");

    let request = base_request(ProviderKind::Anthropic, "sonnet", dir.path(), "call-a");
    let bins = RunnerBinaries {
        anthropic: bin.display().to_string(),
        openai: "unused".to_string(),
    };

    let result = run_provider(&request, &bins).expect("success");
    assert_eq!(result.message, "claude-sonnet-4-5\nanthropic response");
    assert_eq!(result.log.model, "claude-sonnet-4-5");
    assert_eq!(result.log.prompt_file, request.prompt_file);
}

#[test]
fn mocked_openai_jsonl_success() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("codex-mock");
    write_script(
        &bin,
        "#!/bin/sh\necho '{\"type\":\"item.completed\",\"item\":{\"type\":\"agent_message\",\"text\":\"final answer\"}}'\n",
    );

    let request = base_request(ProviderKind::OpenAi, "gpt-5.2", dir.path(), "call-b");
    let bins = RunnerBinaries {
        anthropic: "unused".to_string(),
        openai: bin.display().to_string(),
    };

    let result = run_provider(&request, &bins).expect("success");
    assert_eq!(result.message, "final answer");
}

#[test]
fn provider_is_never_asked_to_continue_a_session() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-args");
    write_script(&bin, "#!/bin/sh\nprintf '%s\\n' \"$@\"\n");

    let request = base_request(ProviderKind::Anthropic, "haiku", dir.path(), "call-c");
    let bins = RunnerBinaries {
        anthropic: bin.display().to_string(),
        openai: "unused".to_string(),
    };

    let result = run_provider(&request, &bins).expect("success");
    assert!(!result.message.contains("--continue"));
    assert!(!result.message.contains("--resume"));
    assert!(result.message.contains("-p"));
}

#[test]
fn provider_non_zero_exit_is_explicit() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-fail");
    write_script(&bin, "#!/bin/sh\necho 'boom' 1>&2\nexit 17\n");

    let request = base_request(ProviderKind::Anthropic, "opus", dir.path(), "call-d");
    let bins = RunnerBinaries {
        anthropic: bin.display().to_string(),
        openai: "unused".to_string(),
    };

    let err = run_provider(&request, &bins).expect_err("expected failure");
    match err {
        ProviderError::NonZeroExit {
            exit_code,
            stderr,
            log,
            ..
        } => {
            let log = *log;
            assert_eq!(exit_code, 17);
            assert_eq!(stderr, "boom");
            assert_eq!(log.call_id, "call-d");
            assert_eq!(log.exit_code, Some(17));
            assert!(!log.timed_out);
            assert!(log.binary.ends_with("claude-fail"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn provider_timeout_is_explicit() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-timeout");
    write_script(&bin, "#!/bin/sh\nsleep 2\necho late\n");

    let mut request = base_request(ProviderKind::Anthropic, "sonnet", dir.path(), "call-e");
    request.timeout = Duration::from_millis(100);

    let bins = RunnerBinaries {
        anthropic: bin.display().to_string(),
        openai: "unused".to_string(),
    };

    let err = run_provider(&request, &bins).expect_err("expected timeout");
    match err {
        ProviderError::Timeout { log, .. } => {
            let log = *log;
            assert_eq!(log.call_id, "call-e");
            assert!(log.timed_out);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn provider_missing_binary_is_explicit() {
    let dir = tempdir().expect("tempdir");
    let request = base_request(ProviderKind::Anthropic, "sonnet", dir.path(), "call-f");

    let bins = RunnerBinaries {
        anthropic: dir.path().join("does-not-exist").display().to_string(),
        openai: "unused".to_string(),
    };

    let err = run_provider(&request, &bins).expect_err("expected missing binary");
    match err {
        ProviderError::MissingBinary { log, .. } => {
            let log = *log;
            assert_eq!(log.exit_code, None);
            assert!(!log.timed_out);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn provider_parse_failure_is_explicit_for_openai() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("codex-bad");
    write_script(&bin, "#!/bin/sh\necho '{not-json}'\n");

    let request = base_request(ProviderKind::OpenAi, "gpt-5.2", dir.path(), "call-g");
    let bins = RunnerBinaries {
        anthropic: "unused".to_string(),
        openai: bin.display().to_string(),
    };

    let err = run_provider(&request, &bins).expect_err("expected parse failure");
    match err {
        ProviderError::ParseFailure { log, .. } => {
            let log = *log.expect("parse failure should include invocation log");
            assert_eq!(log.exit_code, Some(0));
            assert!(!log.timed_out);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn cli_backend_persists_prompt_and_invocation_per_call() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-echo");
    write_script(&bin, "#!/bin/sh\necho 'reply'\n");

    let settings = ProviderSettings {
        binary: Some(bin.display().to_string()),
        ..ProviderSettings::default()
    };
    let workspace = dir.path().join("runs/run-1");
    let backend = CliBackend::new(settings, &workspace);

    assert_eq!(backend.invoke("first prompt").expect("first").text, "reply");
    assert_eq!(backend.invoke("second prompt").expect("second").text, "reply");

    let second_prompt = fs::read_to_string(workspace.join("provider_prompts/call-002_prompt.md"))
        .expect("second prompt");
    assert_eq!(second_prompt, "second prompt");

    let record: Value = serde_json::from_str(
        &fs::read_to_string(workspace.join("provider_invocations/call-001.json"))
            .expect("invocation record"),
    )
    .expect("json");
    assert_eq!(record["callId"], "call-001");
    assert_eq!(record["provider"], "anthropic");
    assert_eq!(record["exitCode"], 0);
    assert!(record.get("error").is_none());
}

#[test]
fn cli_backend_records_failed_calls() {
    let dir = tempdir().expect("tempdir");
    let bin = dir.path().join("claude-fail");
    write_script(&bin, "#!/bin/sh\nexit 3\n");

    let settings = ProviderSettings {
        binary: Some(bin.display().to_string()),
        ..ProviderSettings::default()
    };
    let workspace = dir.path().join("run");
    let backend = CliBackend::new(settings, &workspace);

    let err = backend.invoke("prompt").expect_err("failure");
    assert!(matches!(err, ProviderError::NonZeroExit { exit_code: 3, .. }));

    let record: Value = serde_json::from_str(
        &fs::read_to_string(workspace.join("provider_invocations/call-001.json"))
            .expect("invocation record"),
    )
    .expect("json");
    assert_eq!(record["exitCode"], 3);
    assert!(record["error"]
        .as_str()
        .expect("error")
        .contains("exit code 3"));
}
