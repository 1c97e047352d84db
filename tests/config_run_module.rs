use devcrew::config::{load_settings, RunConfig, API_BASE_OVERRIDE_ENV};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn yaml_file_resolves_into_run_config() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        format!(
            "state_root: {}\npublish:\n  repository: acme/widgets\n  api_base: https://ghe.example.com/api/v3/\n  branch_prefix: /bots/devcrew/\n  token_env: CREW_TOKEN\n",
            dir.path().display()
        ),
    )
    .expect("write config");

    let settings = load_settings(Some(&path)).expect("load");
    let config =
        RunConfig::resolve(&settings, lookup(&[("CREW_TOKEN", " ghp_x ")])).expect("resolve");

    assert_eq!(config.state_root, dir.path());
    assert_eq!(config.publish.api_base, "https://ghe.example.com/api/v3");
    assert_eq!(config.publish.branch_prefix, "bots/devcrew");
    assert_eq!(config.publish.token.as_deref(), Some("ghp_x"));
    assert_eq!(
        config.publish.repository.as_ref().map(ToString::to_string),
        Some("acme/widgets".to_string())
    );
    assert_eq!(config.log_path(), dir.path().join("logs/devcrew.log"));
    assert_eq!(
        config.run_workspace("run-20240101-000000-1"),
        dir.path().join("runs/run-20240101-000000-1")
    );
}

#[test]
fn api_base_override_wins() {
    let mut settings = devcrew::config::Settings::default();
    settings.state_root = Some(PathBuf::from("/var/lib/devcrew"));
    let config = RunConfig::resolve(
        &settings,
        lookup(&[(API_BASE_OVERRIDE_ENV, "http://127.0.0.1:8080/")]),
    )
    .expect("resolve");
    assert_eq!(config.publish.api_base, "http://127.0.0.1:8080");
    assert_eq!(config.publish.token, None);
    assert_eq!(config.publish.repository, None);
}
