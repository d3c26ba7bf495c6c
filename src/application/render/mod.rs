//! Render job orchestration around the external fractal renderer.
//!
//! Each job runs the renderer binary for its precision tier inside a freshly
//! allocated scratch directory, captures the single image it writes, and tears
//! the directory down before returning. Jobs share nothing in-process; the
//! [`RenderPool`] only bounds how many run at once.

mod invocation;
mod orchestrator;
mod pool;
mod renderer;
mod types;

pub use invocation::RenderInvocation;
pub use orchestrator::RenderOrchestrator;
pub use pool::RenderPool;
pub use renderer::{Platform, RendererTable, RendererTableError};
pub use types::{CapturedOutput, RenderError};

pub(crate) use orchestrator::{METRIC_RENDER_MS, METRIC_RENDER_TOTAL, elapsed_millis};
