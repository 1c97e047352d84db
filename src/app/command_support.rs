use crate::config::{load_settings, ConfigError, RunConfig};
use crate::shared::logging::EventLog;
use std::path::PathBuf;

/// Options shared by `run` and `publish`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub config: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub publish: bool,
    pub title: Option<String>,
    pub positionals: Vec<String>,
}

fn option_value(args: &[String], i: usize, flag: &str) -> Result<String, String> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| format!("missing value for {flag}"))
}

/// Parses `args`, accepting only the value flags in `allowed`.
/// Everything after `--` is positional.
pub fn parse_command_options(
    args: &[String],
    allowed: &[&str],
) -> Result<CommandOptions, String> {
    let mut options = CommandOptions::default();
    let mut i = 0usize;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            options.positionals.extend(args[i + 1..].iter().cloned());
            break;
        }
        if !arg.starts_with("--") {
            options.positionals.push(args[i].clone());
            i += 1;
            continue;
        }
        if !allowed.contains(&arg) {
            return Err(format!("unknown option `{arg}`"));
        }
        match arg {
            "--config" => {
                options.config = Some(PathBuf::from(option_value(args, i, arg)?));
                i += 2;
            }
            "--out" => {
                options.out = Some(PathBuf::from(option_value(args, i, arg)?));
                i += 2;
            }
            "--title" => {
                options.title = Some(option_value(args, i, arg)?);
                i += 2;
            }
            "--publish" => {
                options.publish = true;
                i += 1;
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }
    Ok(options)
}

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn load_run_config(options: &CommandOptions) -> Result<RunConfig, String> {
    let settings = load_settings(options.config.as_deref()).map_err(map_config_err)?;
    RunConfig::from_environment(&settings).map_err(map_config_err)
}

pub fn event_log_for(config: &RunConfig) -> EventLog {
    EventLog::to_file(config.log_path())
}
