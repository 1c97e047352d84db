use crate::pipeline::stages::{default_stages, Stage, StageContext};
use crate::pipeline::{PipelineError, ProjectOutput, ProjectState};
use crate::provider::GenerativeBackend;
use crate::shared::logging::EventLog;
use serde_json::Value;
use std::time::Instant;

/// Runs the fixed stage sequence against one backend.
///
/// Holds no project state between calls; every `run` starts from a fresh
/// [`ProjectState`].
pub struct Orchestrator<B: GenerativeBackend> {
    backend: B,
    log: EventLog,
}

impl<B: GenerativeBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            log: EventLog::disabled(),
        }
    }

    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn run(&self, request_text: &str) -> Result<ProjectState, PipelineError> {
        if request_text.trim().is_empty() {
            return Err(PipelineError::EmptyRequest);
        }

        self.log.info(
            "pipeline.started",
            "pipeline started",
            &[("request_chars", Value::from(request_text.chars().count()))],
        );

        let mut state = ProjectState::new(request_text);
        let ctx = StageContext {
            backend: &self.backend,
            log: &self.log,
        };
        for stage in default_stages() {
            self.run_stage(stage.as_ref(), &mut state, &ctx)?;
        }

        self.log.info(
            "pipeline.completed",
            "pipeline completed",
            &[(
                "files",
                Value::from(state.file_set.as_ref().map_or(0, |files| files.len())),
            )],
        );
        Ok(state)
    }

    /// Runs the pipeline and returns the finished project.
    pub fn generate(&self, request_text: &str) -> Result<ProjectOutput, PipelineError> {
        self.run(request_text)?.into_output()
    }

    fn run_stage(
        &self,
        stage: &dyn Stage,
        state: &mut ProjectState,
        ctx: &StageContext<'_>,
    ) -> Result<(), PipelineError> {
        let name = stage.name();
        self.log.info(
            "stage.started",
            &format!("stage {name} started"),
            &[("stage", Value::from(name.as_str()))],
        );
        let started = Instant::now();

        match stage.run(state, ctx) {
            Ok(update) => {
                state.apply(update);
                self.log.info(
                    "stage.completed",
                    &format!("stage {name} completed"),
                    &[
                        ("stage", Value::from(name.as_str())),
                        ("duration_ms", Value::from(started.elapsed().as_millis() as u64)),
                    ],
                );
                Ok(())
            }
            Err(source) => {
                self.log.error(
                    "stage.failed",
                    &format!("stage {name} failed"),
                    &[
                        ("stage", Value::from(name.as_str())),
                        ("error", Value::from(source.to_string())),
                    ],
                );
                Err(PipelineError::Stage {
                    stage: name,
                    source,
                })
            }
        }
    }
}
