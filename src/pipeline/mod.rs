pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod stages;
pub mod state;

pub use error::{PipelineError, StageError};
pub use orchestrator::Orchestrator;
pub use stages::{
    default_stages, GenerateStage, PlanStage, PublishPrepStage, Stage, StageContext, VerifyStage,
};
pub use state::{ProjectOutput, ProjectState, StageName, StageUpdate};
