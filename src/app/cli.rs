#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Publish,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "publish" => CliVerb::Publish,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: devcrew <command> [options]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  run [options] [request...]           Plan, generate, verify and document a project"
            .to_string(),
        "                                       (reads the request from stdin when omitted)"
            .to_string(),
        "  publish <project.json> [options]     Open a pull request for an exported project"
            .to_string(),
        "  help                                 Show this help".to_string(),
        String::new(),
        "Options:".to_string(),
        "  --config <path>                      Settings file (default ~/.devcrew/config.yaml)"
            .to_string(),
        "  --out <dir>                          Export directory for `run`".to_string(),
        "  --publish                            Publish after a successful `run`".to_string(),
        "  --title <title>                      Pull request title".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
