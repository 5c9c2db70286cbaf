//! LaTeX compilation.
//!
//! # Architecture
//! - `Compiler` is the narrow seam handlers depend on; tests swap in stubs.
//! - `LatexCompiler` runs the toolchain in a scratch `TempDir`, `passes` times,
//!   each pass in its own process group under a wall-clock timeout. The group
//!   is killed when the pass ends, so nothing a pass spawns outlives it.
//! - Output only reaches permanent storage through `ArtifactStorage::commit`.
//!
//! Every failure becomes a `CompilationResult` with `success = false`; nothing
//! here returns an error to the caller.

use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LatexConfig;
use crate::cv::artifacts::ArtifactStorage;
use crate::cv::diagnostics::{DiagnosticParser, Diagnostics, TexLogParser};
use crate::models::cv::CompilationResult;

const SOURCE_FILE: &str = "resume.tex";
const OUTPUT_FILE: &str = "resume.pdf";
const MISSING_OUTPUT: &str = "PDF file was not generated";
/// How long captured output may keep draining once the process group is gone.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, source_text: &str) -> CompilationResult;
}

#[derive(Debug, Error)]
enum InvocationError {
    #[error("Compilation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0} not found. Please install a TeX distribution such as TeX Live.")]
    NotInstalled(String),

    #[error("Compilation error: {0}")]
    Io(#[from] io::Error),
}

/// What the passes left behind in the scratch directory.
struct Build {
    artifact: Option<String>,
    diagnostics: Diagnostics,
}

pub struct LatexCompiler {
    settings: LatexConfig,
    artifacts: ArtifactStorage,
    parser: Box<dyn DiagnosticParser>,
}

impl LatexCompiler {
    pub fn new(settings: LatexConfig, artifacts: ArtifactStorage) -> Self {
        Self {
            settings,
            artifacts,
            parser: Box::new(TexLogParser),
        }
    }

    #[cfg(test)]
    pub fn with_parser(mut self, parser: impl DiagnosticParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    async fn build(&self, source_text: &str) -> Result<Build, InvocationError> {
        // Removed on drop, whichever way this function exits.
        let workdir = tempfile::Builder::new().prefix("cv-build-").tempdir()?;
        let tex_path = workdir.path().join(SOURCE_FILE);
        tokio::fs::write(&tex_path, source_text).await?;

        let mut diagnostics = Diagnostics::default();
        for pass in 1..=self.settings.passes {
            let output = self.run_pass(workdir.path(), &tex_path).await?;
            for stream in [&output.stdout, &output.stderr] {
                diagnostics.scan(self.parser.as_ref(), &String::from_utf8_lossy(stream));
            }
            debug!(
                "LaTeX pass {pass}/{} exited with {}",
                self.settings.passes, output.status
            );
        }

        let pdf_path = workdir.path().join(OUTPUT_FILE);
        let artifact = if tokio::fs::try_exists(&pdf_path).await? {
            Some(self.artifacts.commit(&pdf_path).await?)
        } else {
            None
        };

        Ok(Build {
            artifact,
            diagnostics,
        })
    }

    async fn run_pass(&self, workdir: &Path, tex_path: &Path) -> Result<Output, InvocationError> {
        let mut std_command = std::process::Command::new(&self.settings.program);
        std_command
            .args(&self.settings.extra_args)
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(workdir)
            .arg(tex_path)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_command.process_group(0);
        }
        let mut command = Command::from(std_command);
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => InvocationError::NotInstalled(self.settings.program.clone()),
            _ => InvocationError::Io(e),
        })?;
        let pid = child.id();
        let stdout = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr = tokio::spawn(read_pipe(child.stderr.take()));

        // The pass ends when the leader exits, not when the pipes close: a
        // background child may hold them open indefinitely.
        let waited = tokio::time::timeout(self.settings.timeout, child.wait()).await;
        kill_process_group(pid);

        let status = match waited {
            Ok(status) => status?,
            Err(_) => return Err(InvocationError::TimedOut(self.settings.timeout)),
        };
        Ok(Output {
            status,
            stdout: drain(stdout).await,
            stderr: drain(stderr).await,
        })
    }
}

#[async_trait]
impl Compiler for LatexCompiler {
    async fn compile(&self, source_text: &str) -> CompilationResult {
        let started = Instant::now();
        let outcome = self.build(source_text).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Build {
                artifact: Some(artifact),
                diagnostics,
            }) => {
                info!("Compiled CV to {artifact} in {elapsed_ms}ms");
                CompilationResult::succeeded(artifact, diagnostics.capped_warnings(), elapsed_ms)
            }
            Ok(Build {
                artifact: None,
                diagnostics,
            }) => {
                let mut errors = diagnostics.capped_errors();
                if errors.is_empty() {
                    errors.push(MISSING_OUTPUT.to_string());
                }
                info!(
                    "CV compilation produced no PDF ({} errors) in {elapsed_ms}ms",
                    errors.len()
                );
                CompilationResult::failed(errors, diagnostics.capped_warnings(), elapsed_ms)
            }
            Err(e) => {
                warn!("CV compilation failed: {e}");
                CompilationResult::failed(vec![e.to_string()], Vec::new(), elapsed_ms)
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("Stopped reading LaTeX output: {e}");
        }
    }
    buf
}

async fn drain(reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(PIPE_DRAIN_GRACE, reader).await {
        Ok(Ok(buf)) => buf,
        Ok(Err(e)) => {
            warn!("LaTeX output reader failed: {e}");
            Vec::new()
        }
        Err(_) => {
            warn!("LaTeX output still open {PIPE_DRAIN_GRACE:?} after the pass ended");
            Vec::new()
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else { return };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill LaTeX process group {pid}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
