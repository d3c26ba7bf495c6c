//! Runs one renderer process per job inside its own scratch directory.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use metrics::{counter, histogram};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::domain::{params::RenderParameters, precision::PrecisionTier, viewport::Viewport};

use super::{
    invocation::RenderInvocation,
    renderer::RendererTable,
    types::{CapturedOutput, RenderError},
};

const TARGET: &str = "application::render::orchestrator";
const JOB_DIR_PREFIX: &str = "job-";
const CAPTURE_PREFIX: &str = "capture-";
const DIAGNOSTIC_LIMIT: usize = 64 * 1024;

pub(crate) const METRIC_RENDER_TOTAL: &str = "fractscope_render_total";
pub(crate) const METRIC_RENDER_MS: &str = "fractscope_render_ms";

#[derive(Debug)]
pub struct RenderOrchestrator {
    renderers: RendererTable,
    work_root: PathBuf,
    output_file: String,
}

impl RenderOrchestrator {
    /// `work_root` holds per-job directories and staged captures; it is created if missing.
    pub fn new(
        renderers: RendererTable,
        work_root: PathBuf,
        output_file: impl Into<String>,
    ) -> Result<Self, RenderError> {
        fs::create_dir_all(&work_root).map_err(RenderError::io("failed to create work root"))?;
        Ok(Self {
            renderers,
            work_root,
            output_file: output_file.into(),
        })
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Render `viewport` with the binary for `tier` and capture the produced image.
    ///
    /// Blocks until the renderer exits. The job directory is removed before
    /// this returns, whatever the outcome.
    pub fn run_render(
        &self,
        viewport: &Viewport,
        params: &RenderParameters,
        tier: PrecisionTier,
    ) -> Result<CapturedOutput, RenderError> {
        let started_at = Instant::now();
        let result = self.render_in_job_dir(viewport, params, tier, started_at);

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.code(),
        };
        counter!(METRIC_RENDER_TOTAL, "tier" => tier.as_str(), "result" => outcome).increment(1);
        histogram!(METRIC_RENDER_MS, "tier" => tier.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        result
    }

    fn render_in_job_dir(
        &self,
        viewport: &Viewport,
        params: &RenderParameters,
        tier: PrecisionTier,
        started_at: Instant,
    ) -> Result<CapturedOutput, RenderError> {
        let job = JobDir::create(&self.work_root)?;

        let Some(program) = self.renderers.resolve(tier) else {
            return Err(RenderError::ExecutionFailed {
                program: format!("<{tier} renderer>"),
                exit_code: None,
                detail: "no renderer registered for this tier".to_string(),
                stdout: String::new(),
                stderr: String::new(),
                source: None,
            });
        };
        let invocation = RenderInvocation::new(program, viewport, params);
        let program_label = program.display().to_string();

        info!(
            target = TARGET,
            op = "render::run",
            tier = %tier,
            fractal = params.fractal.name(),
            program = %program_label,
            args = ?invocation.args(),
            job_dir = %job.path().display(),
            "Starting renderer"
        );

        let output = invocation.command(job.path()).output().map_err(|err| {
            warn!(
                target = TARGET,
                op = "render::run",
                result = "error",
                error_code = "spawn",
                tier = %tier,
                program = %program_label,
                elapsed_ms = elapsed_millis(started_at.elapsed()),
                error = %err,
                "Failed to spawn renderer"
            );
            RenderError::ExecutionFailed {
                program: program_label.clone(),
                exit_code: None,
                detail: spawn_detail(&err),
                stdout: String::new(),
                stderr: String::new(),
                source: Some(err),
            }
        })?;

        let stdout = diagnostic_tail(&output.stdout);
        let stderr = diagnostic_tail(&output.stderr);

        if !output.status.success() {
            let exit_code = output.status.code();
            warn!(
                target = TARGET,
                op = "render::run",
                result = "error",
                error_code = "renderer_exit",
                tier = %tier,
                program = %program_label,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                elapsed_ms = elapsed_millis(started_at.elapsed()),
                stderr = %stderr,
                "Renderer exited with failure"
            );
            let detail = exit_detail(&stdout, &stderr);
            return Err(RenderError::ExecutionFailed {
                program: program_label,
                exit_code,
                detail,
                stdout,
                stderr,
                source: None,
            });
        }

        let produced = job.path().join(&self.output_file);
        match fs::metadata(&produced) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(self.no_output(&program_label, tier, started_at, &stdout));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(self.no_output(&program_label, tier, started_at, &stdout));
            }
            Err(err) => {
                return Err(RenderError::Io {
                    context: "failed to inspect renderer output",
                    source: err,
                });
            }
        }

        let extension = Path::new(&self.output_file)
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_ascii_lowercase);
        let captured = self.stage(&produced, extension.as_deref())?;
        let elapsed = started_at.elapsed();

        info!(
            target = TARGET,
            op = "render::run",
            result = "success",
            tier = %tier,
            program = %program_label,
            elapsed_ms = elapsed_millis(elapsed),
            captured = %captured.display(),
            "Renderer output captured"
        );

        Ok(CapturedOutput {
            file: captured,
            extension,
            tier,
            elapsed,
        })
    }

    /// Move the renderer output next to the job directories so it outlives the job.
    fn stage(
        &self,
        produced: &Path,
        extension: Option<&str>,
    ) -> Result<tempfile::TempPath, RenderError> {
        let suffix = extension.map(|ext| format!(".{ext}")).unwrap_or_default();
        let staged = tempfile::Builder::new()
            .prefix(CAPTURE_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.work_root)
            .map_err(RenderError::io("failed to allocate capture file"))?
            .into_temp_path();

        fs::rename(produced, &staged).map_err(RenderError::io("failed to move renderer output"))?;
        Ok(staged)
    }

    fn no_output(
        &self,
        program: &str,
        tier: PrecisionTier,
        started_at: Instant,
        stdout: &str,
    ) -> RenderError {
        warn!(
            target = TARGET,
            op = "render::run",
            result = "error",
            error_code = "no_output",
            tier = %tier,
            program = %program,
            expected = %self.output_file,
            elapsed_ms = elapsed_millis(started_at.elapsed()),
            stdout = %stdout,
            "Renderer exited cleanly without producing output"
        );
        RenderError::NoOutputProduced {
            program: program.to_string(),
            expected: self.output_file.clone(),
        }
    }
}

/// Keep the last [`DIAGNOSTIC_LIMIT`] bytes of a renderer stream.
fn diagnostic_tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(DIAGNOSTIC_LIMIT);
    let tail = String::from_utf8_lossy(&bytes[start..]);
    if start == 0 {
        tail.into_owned()
    } else {
        format!("[{start} bytes truncated]\n{tail}")
    }
}

pub(crate) fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn spawn_detail(err: &std::io::Error) -> String {
    if err.kind() == ErrorKind::NotFound {
        format!("executable not found: {err}")
    } else {
        format!("failed to spawn: {err}")
    }
}

fn exit_detail(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    "no diagnostics".to_string()
}

/// Uniquely named scratch directory owned by a single render job.
///
/// Removal runs on drop, so it covers early returns and unwinding alike.
/// A failed removal is logged and never replaces the job's own result.
struct JobDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl JobDir {
    fn create(root: &Path) -> Result<Self, RenderError> {
        let dir = tempfile::Builder::new()
            .prefix(JOB_DIR_PREFIX)
            .tempdir_in(root)
            .map_err(RenderError::io("failed to allocate job directory"))?;
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JobDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take()
            && let Err(err) = dir.close()
        {
            warn!(
                target = TARGET,
                op = "render::cleanup",
                job_dir = %self.path.display(),
                error = %err,
                "Failed to remove job directory"
            );
        }
    }
}
