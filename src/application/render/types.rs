use std::{io, path::Path, time::Duration};

use tempfile::TempPath;
use thiserror::Error;

use crate::domain::{error::SelectionError, precision::PrecisionTier};

/// Failures surfaced by the render pipeline.
///
/// Retry policy belongs to the caller; nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),
    #[error("renderer `{program}` failed (exit {exit_code:?}): {detail}")]
    ExecutionFailed {
        program: String,
        exit_code: Option<i32>,
        detail: String,
        stdout: String,
        stderr: String,
        #[source]
        source: Option<io::Error>,
    },
    #[error("renderer `{program}` exited cleanly but did not write `{expected}`")]
    NoOutputProduced { program: String, expected: String },
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("render worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl RenderError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    /// Short label used for metrics and structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::InvalidSelection(_) => "invalid_selection",
            RenderError::ExecutionFailed { .. } => "execution_failed",
            RenderError::NoOutputProduced { .. } => "no_output",
            RenderError::Io { .. } => "io",
            RenderError::WorkerUnavailable(_) => "worker_unavailable",
        }
    }
}

/// Renderer output moved out of its job directory and awaiting publication.
///
/// The staged file is deleted if this value is dropped without being published.
#[derive(Debug)]
pub struct CapturedOutput {
    pub(crate) file: TempPath,
    pub(crate) extension: Option<String>,
    pub tier: PrecisionTier,
    pub elapsed: Duration,
}

impl CapturedOutput {
    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }
}
