use crate::files::{extract_file_map, merge_into, ExtractedFiles, FileSet, ParsePath};
use crate::pipeline::prompts::{generate_prompt, plan_prompt, publish_prep_prompt, verify_prompt};
use crate::pipeline::{ProjectState, StageError, StageName, StageUpdate};
use crate::provider::GenerativeBackend;
use crate::shared::logging::EventLog;
use serde_json::Value;

/// What a stage may touch while it runs.
pub struct StageContext<'a> {
    pub backend: &'a dyn GenerativeBackend,
    pub log: &'a EventLog,
}

/// One step of the pipeline. Stages read the state and return a partial
/// update; they never mutate the state themselves.
pub trait Stage {
    fn name(&self) -> StageName;
    fn run(&self, state: &ProjectState, ctx: &StageContext<'_>) -> Result<StageUpdate, StageError>;
}

pub struct PlanStage;
pub struct GenerateStage;
pub struct VerifyStage;
pub struct PublishPrepStage;

/// Stages in execution order.
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(PlanStage),
        Box::new(GenerateStage),
        Box::new(VerifyStage),
        Box::new(PublishPrepStage),
    ]
}

fn invoke_text(ctx: &StageContext<'_>, prompt: &str) -> Result<String, StageError> {
    let generation = ctx.backend.invoke(prompt)?;
    Ok(generation.text.trim().to_string())
}

fn extract_logged(
    stage: StageName,
    raw_text: &str,
    ctx: &StageContext<'_>,
) -> Result<ExtractedFiles, StageError> {
    let context = format!("{stage} stage output");
    let extracted = extract_file_map(raw_text, &context)?;
    if extracted.parse_path == ParsePath::Repaired {
        ctx.log.warn(
            "extract.repaired",
            "file mapping parsed after escaping stray backslashes",
            &[
                ("stage", Value::from(stage.as_str())),
                ("files", Value::from(extracted.entries.len())),
            ],
        );
    }
    Ok(extracted)
}

impl Stage for PlanStage {
    fn name(&self) -> StageName {
        StageName::Plan
    }

    fn run(&self, state: &ProjectState, ctx: &StageContext<'_>) -> Result<StageUpdate, StageError> {
        let prompt = plan_prompt(state.request_text())?;
        Ok(StageUpdate::design_plan(invoke_text(ctx, &prompt)?))
    }
}

impl Stage for GenerateStage {
    fn name(&self) -> StageName {
        StageName::Generate
    }

    fn run(&self, state: &ProjectState, ctx: &StageContext<'_>) -> Result<StageUpdate, StageError> {
        let plan = state
            .design_plan
            .as_deref()
            .ok_or(StageError::MissingInput("design_plan"))?;
        let raw = ctx.backend.invoke(&generate_prompt(plan)?)?.text;
        let extracted = extract_logged(self.name(), &raw, ctx)?;
        let existing = state.file_set.clone().unwrap_or_default();
        let merged = merge_into(&existing, extracted.into_batch());
        if merged.is_empty() {
            return Err(StageError::Validation(
                "generation produced no usable files".to_string(),
            ));
        }
        Ok(StageUpdate::file_set(merged))
    }
}

impl Stage for VerifyStage {
    fn name(&self) -> StageName {
        StageName::Verify
    }

    /// Only new or changed files come back; everything else is kept.
    fn run(&self, state: &ProjectState, ctx: &StageContext<'_>) -> Result<StageUpdate, StageError> {
        let files = state
            .file_set
            .as_ref()
            .ok_or(StageError::MissingInput("file_set"))?;
        let raw = ctx.backend.invoke(&verify_prompt(files)?)?.text;
        let extracted = extract_logged(self.name(), &raw, ctx)?;
        Ok(StageUpdate::file_set(merge_into(files, extracted.into_batch())))
    }
}

impl Stage for PublishPrepStage {
    fn name(&self) -> StageName {
        StageName::PublishPrep
    }

    fn run(&self, state: &ProjectState, ctx: &StageContext<'_>) -> Result<StageUpdate, StageError> {
        let files: &FileSet = state
            .file_set
            .as_ref()
            .ok_or(StageError::MissingInput("file_set"))?;
        let prompt = publish_prep_prompt(files)?;
        Ok(StageUpdate::deployment_guide(invoke_text(ctx, &prompt)?))
    }
}
