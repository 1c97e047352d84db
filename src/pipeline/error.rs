use crate::files::ExtractionError;
use crate::pipeline::StageName;
use crate::pipeline::prompts::PromptRenderError;
use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("generative backend call failed: {0}")]
    Backend(#[from] ProviderError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("failed to render stage prompt: {0}")]
    Prompt(#[from] PromptRenderError),
    #[error("invalid file set: {0}")]
    Validation(String),
    #[error("required input `{0}` has not been produced")]
    MissingInput(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("project request must be non-empty")]
    EmptyRequest,
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: StageName,
        #[source]
        source: StageError,
    },
    #[error("pipeline finished without producing `{0}`")]
    Incomplete(&'static str),
}

impl PipelineError {
    pub fn stage(&self) -> Option<StageName> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::EmptyRequest | Self::Incomplete(_) => None,
        }
    }
}
