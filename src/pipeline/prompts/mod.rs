use crate::files::FileSet;

const PLAN_PROMPT_TEMPLATE: &str = include_str!("assets/stages/plan.prompt.md");
const GENERATE_PROMPT_TEMPLATE: &str = include_str!("assets/stages/generate.prompt.md");
const VERIFY_PROMPT_TEMPLATE: &str = include_str!("assets/stages/verify.prompt.md");
const PUBLISH_PREP_PROMPT_TEMPLATE: &str = include_str!("assets/stages/publish_prep.prompt.md");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptRenderError {
    #[error("unclosed placeholder in template")]
    Unclosed,
    #[error("empty placeholder in template")]
    EmptyPlaceholder,
    #[error("unknown placeholder `{0}` in template")]
    UnknownPlaceholder(String),
}

/// Replaces `{{name}}` tokens. Substituted values are not rescanned.
pub fn render_template<F>(template: &str, mut resolve: F) -> Result<String, PromptRenderError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut rendered = String::with_capacity(template.len());
    let mut cursor = template;

    while let Some(start) = cursor.find("{{") {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 2..];
        let close_offset = after_open.find("}}").ok_or(PromptRenderError::Unclosed)?;
        let token = after_open[..close_offset].trim();
        if token.is_empty() {
            return Err(PromptRenderError::EmptyPlaceholder);
        }
        let value =
            resolve(token).ok_or_else(|| PromptRenderError::UnknownPlaceholder(token.to_string()))?;
        rendered.push_str(&value);
        cursor = &after_open[close_offset + 2..];
    }

    rendered.push_str(cursor);
    Ok(rendered)
}

fn render_single(
    template: &str,
    name: &str,
    value: &str,
) -> Result<String, PromptRenderError> {
    render_template(template, |token| (token == name).then(|| value.to_string()))
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Renders files as Markdown sections, each fenced with a fence longer than
/// any backtick run inside the file.
pub fn render_file_listing(files: &FileSet) -> String {
    if files.is_empty() {
        return "(no files)".to_string();
    }
    let mut out = String::new();
    for (path, content) in files.iter() {
        let fence = "`".repeat(longest_backtick_run(content).max(2) + 1);
        out.push_str(&format!("### {path}\n{fence}\n{content}\n{fence}\n\n"));
    }
    out.trim_end().to_string()
}

pub fn plan_prompt(request: &str) -> Result<String, PromptRenderError> {
    render_single(PLAN_PROMPT_TEMPLATE, "request", request.trim())
}

pub fn generate_prompt(design_plan: &str) -> Result<String, PromptRenderError> {
    render_single(GENERATE_PROMPT_TEMPLATE, "design_plan", design_plan.trim())
}

pub fn verify_prompt(files: &FileSet) -> Result<String, PromptRenderError> {
    render_single(VERIFY_PROMPT_TEMPLATE, "files", &render_file_listing(files))
}

pub fn publish_prep_prompt(files: &FileSet) -> Result<String, PromptRenderError> {
    render_single(
        PUBLISH_PREP_PROMPT_TEMPLATE,
        "files",
        &render_file_listing(files),
    )
}
