use crate::app::command_handlers::publish::{
    publish_files, render_publish_failure, render_publish_success,
};
use crate::app::command_support::{event_log_for, load_run_config, parse_command_options};
use crate::files::{write_file_set, write_project_summary, ExportError};
use crate::pipeline::prompts::render_file_listing;
use crate::pipeline::{Orchestrator, ProjectOutput};
use crate::provider::CliBackend;
use crate::shared::ids::RunId;
use std::io::Read;
use std::path::Path;

const PROJECT_DIR_NAME: &str = "project";

pub fn cmd_run(args: &[String]) -> Result<String, String> {
    let options =
        parse_command_options(args, &["--config", "--out", "--publish", "--title"])?;
    let request = if options.positionals.is_empty() {
        read_stdin_request()?
    } else {
        options.positionals.join(" ")
    };
    if request.trim().is_empty() {
        return Err("usage: run [--config PATH] [--out DIR] [--publish] [--title TITLE] <request...>".to_string());
    }

    let config = load_run_config(&options)?;
    let run_id = RunId::generate(chrono::Utc::now());
    let workspace = config.run_workspace(run_id.as_str());
    let backend = CliBackend::new(config.provider.clone(), &workspace);
    let orchestrator = Orchestrator::new(backend).with_event_log(event_log_for(&config));

    let output = orchestrator
        .generate(&request)
        .map_err(|err| format!("run_id={run_id}\nrun failed: {err}"))?;

    let out_dir = options
        .out
        .clone()
        .unwrap_or_else(|| workspace.join(PROJECT_DIR_NAME));
    let mut lines = vec![
        render_project_report(&output),
        String::new(),
        format!("run_id={run_id}"),
    ];
    match export_project(&out_dir, &output) {
        Ok(()) => lines.push(format!("output_dir={}", out_dir.display())),
        Err(err) => {
            lines.push("export_status=failed".to_string());
            lines.push(format!("export_error={err}"));
        }
    }
    if options.publish {
        let title = options.title.as_deref().unwrap_or("");
        match publish_files(&config, &output.files, title) {
            Ok(receipt) => lines.extend(render_publish_success(&receipt)),
            Err(err) => lines.extend(render_publish_failure(&err)),
        }
    } else {
        lines.push("publish_status=skipped".to_string());
    }
    Ok(lines.join("\n"))
}

fn read_stdin_request() -> Result<String, String> {
    let mut request = String::new();
    std::io::stdin()
        .read_to_string(&mut request)
        .map_err(|e| format!("failed to read request from stdin: {e}"))?;
    Ok(request)
}

fn export_project(out_dir: &Path, output: &ProjectOutput) -> Result<(), ExportError> {
    write_file_set(out_dir, &output.files)?;
    write_project_summary(out_dir, output)?;
    Ok(())
}

pub fn render_project_report(output: &ProjectOutput) -> String {
    [
        "[DESIGN PLAN]".to_string(),
        output.design_plan.clone(),
        String::new(),
        "[FILES]".to_string(),
        render_file_listing(&output.files),
        String::new(),
        "[DEPLOYMENT GUIDE]".to_string(),
        output.deployment_guide.clone(),
    ]
    .join("\n")
}
