use crate::provider::invocation::build_invocation;
use crate::provider::output_parse::parse_anthropic_output;
use crate::provider::{
    io_error, parse_openai_jsonl, InvocationLog, ProviderError, ProviderKind, ProviderRequest,
    ProviderResult,
};
use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RunnerBinaries {
    pub anthropic: String,
    pub openai: String,
}

impl Default for RunnerBinaries {
    fn default() -> Self {
        Self {
            anthropic: "claude".to_string(),
            openai: "codex".to_string(),
        }
    }
}

impl RunnerBinaries {
    /// Replaces the binary used for `provider`, leaving the other default.
    pub fn with_override(provider: ProviderKind, binary: Option<&str>) -> Self {
        let mut binaries = Self::default();
        if let Some(binary) = binary.map(str::trim).filter(|v| !v.is_empty()) {
            match provider {
                ProviderKind::Anthropic => binaries.anthropic = binary.to_string(),
                ProviderKind::OpenAi => binaries.openai = binary.to_string(),
            }
        }
        binaries
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = BufReader::new(source).read_to_string(&mut buf);
        buf
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Runs one provider CLI call to completion, failure or timeout.
pub fn run_provider(
    request: &ProviderRequest,
    binaries: &RunnerBinaries,
) -> Result<ProviderResult, ProviderError> {
    let spec = build_invocation(request, binaries)?;

    let mut log = InvocationLog {
        call_id: request.call_id.clone(),
        provider: request.provider,
        model: spec.resolved_model.clone(),
        binary: spec.binary.clone(),
        working_directory: request.cwd.clone(),
        prompt_file: request.prompt_file.clone(),
        exit_code: None,
        timed_out: false,
        duration_ms: 0,
    };

    let mut command = Command::new(&spec.binary);
    command
        .current_dir(&request.cwd)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProviderError::MissingBinary {
                provider: request.provider,
                binary: spec.binary,
                log: Box::new(log),
            })
        }
        Err(err) => return Err(io_error(&request.cwd, err)),
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_error(&request.cwd, std::io::Error::other("missing stdout pipe")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_error(&request.cwd, std::io::Error::other("missing stderr pipe")))?;
    let stdout_reader = spawn_reader(stdout);
    let stderr_reader = spawn_reader(stderr);

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() > request.timeout => {
                let _ = child.kill();
                let status = child.wait().map_err(|e| io_error(&request.cwd, e))?;
                let _ = stdout_reader.join();
                let _ = stderr_reader.join();
                log.timed_out = true;
                log.exit_code = status.code();
                log.duration_ms = elapsed_ms(start);
                return Err(ProviderError::Timeout {
                    provider: request.provider,
                    timeout_ms: request.timeout.as_millis() as u64,
                    log: Box::new(log),
                });
            }
            Ok(None) => thread::sleep(Duration::from_millis(10)),
            Err(err) => return Err(io_error(&request.cwd, err)),
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();
    log.exit_code = exit_status.code();
    log.duration_ms = elapsed_ms(start);

    if !exit_status.success() {
        return Err(ProviderError::NonZeroExit {
            provider: request.provider,
            exit_code: exit_status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
            log: Box::new(log),
        });
    }

    let parsed = match request.provider {
        ProviderKind::Anthropic => parse_anthropic_output(&stdout),
        ProviderKind::OpenAi => parse_openai_jsonl(&stdout),
    };
    let message = parsed.map_err(|err| match err {
        ProviderError::ParseFailure {
            provider, reason, ..
        } => ProviderError::ParseFailure {
            provider,
            reason,
            log: Some(Box::new(log.clone())),
        },
        other => other,
    })?;

    Ok(ProviderResult { message, log })
}
