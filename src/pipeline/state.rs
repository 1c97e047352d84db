use crate::files::FileSet;
use crate::pipeline::PipelineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Plan,
    Generate,
    Verify,
    PublishPrep,
}

impl StageName {
    /// Execution order of the pipeline.
    pub const ALL: [StageName; 4] = [
        StageName::Plan,
        StageName::Generate,
        StageName::Verify,
        StageName::PublishPrep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Generate => "generate",
            Self::Verify => "verify",
            Self::PublishPrep => "publish_prep",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record threaded through one pipeline invocation.
///
/// `None` means the producing stage has not run yet; an empty value means it
/// ran and produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectState {
    request_text: String,
    pub design_plan: Option<String>,
    pub file_set: Option<FileSet>,
    pub deployment_guide: Option<String>,
}

/// Partial update returned by a stage. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageUpdate {
    pub design_plan: Option<String>,
    pub file_set: Option<FileSet>,
    pub deployment_guide: Option<String>,
}

impl StageUpdate {
    pub fn design_plan(text: String) -> Self {
        Self {
            design_plan: Some(text),
            ..Self::default()
        }
    }

    pub fn file_set(files: FileSet) -> Self {
        Self {
            file_set: Some(files),
            ..Self::default()
        }
    }

    pub fn deployment_guide(text: String) -> Self {
        Self {
            deployment_guide: Some(text),
            ..Self::default()
        }
    }
}

impl ProjectState {
    pub fn new(request_text: impl Into<String>) -> Self {
        Self {
            request_text: request_text.into(),
            design_plan: None,
            file_set: None,
            deployment_guide: None,
        }
    }

    pub fn request_text(&self) -> &str {
        &self.request_text
    }

    /// Overwrites each field the update carries. The file set is replaced
    /// wholesale; stages hand back an already merged set.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(plan) = update.design_plan {
            self.design_plan = Some(plan);
        }
        if let Some(files) = update.file_set {
            self.file_set = Some(files);
        }
        if let Some(guide) = update.deployment_guide {
            self.deployment_guide = Some(guide);
        }
    }

    pub fn into_output(self) -> Result<ProjectOutput, PipelineError> {
        Ok(ProjectOutput {
            request: self.request_text,
            design_plan: self
                .design_plan
                .ok_or(PipelineError::Incomplete("design_plan"))?,
            files: self.file_set.ok_or(PipelineError::Incomplete("file_set"))?,
            deployment_guide: self
                .deployment_guide
                .ok_or(PipelineError::Incomplete("deployment_guide"))?,
        })
    }
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutput {
    pub request: String,
    pub design_plan: String,
    pub files: FileSet,
    pub deployment_guide: String,
}
