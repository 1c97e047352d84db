use crate::provider::{
    resolve_model, InvocationSpec, ProviderError, ProviderKind, ProviderRequest, RunnerBinaries,
};

/// Builds the CLI command for one generation call.
///
/// Every call starts a fresh session: no continuation flags are ever passed,
/// so nothing from an earlier call or run leaks into the next.
pub fn build_invocation(
    request: &ProviderRequest,
    binaries: &RunnerBinaries,
) -> Result<InvocationSpec, ProviderError> {
    let model = resolve_model(request.provider, &request.model)?;
    match request.provider {
        ProviderKind::Anthropic => Ok(InvocationSpec {
            binary: binaries.anthropic.clone(),
            args: vec![
                "--model".to_string(),
                model.clone(),
                "--output-format".to_string(),
                "text".to_string(),
                "-p".to_string(),
                request.prompt.clone(),
            ],
            resolved_model: model,
        }),
        ProviderKind::OpenAi => Ok(InvocationSpec {
            binary: binaries.openai.clone(),
            args: vec![
                "exec".to_string(),
                "--model".to_string(),
                model.clone(),
                "--skip-git-repo-check".to_string(),
                "--sandbox".to_string(),
                "read-only".to_string(),
                "--json".to_string(),
                request.prompt.clone(),
            ],
            resolved_model: model,
        }),
    }
}
