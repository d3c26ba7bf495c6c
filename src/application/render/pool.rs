use std::{num::NonZeroU32, sync::Arc};

use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::{params::RenderParameters, precision::PrecisionTier, viewport::Viewport};

use super::{
    orchestrator::RenderOrchestrator,
    types::{CapturedOutput, RenderError},
};

/// Bounded set of blocking workers that run renderer processes off the async runtime.
#[derive(Debug, Clone)]
pub struct RenderPool {
    orchestrator: Arc<RenderOrchestrator>,
    permits: Arc<Semaphore>,
}

impl RenderPool {
    pub fn new(orchestrator: Arc<RenderOrchestrator>, concurrency: NonZeroU32) -> Self {
        let permits = usize::try_from(concurrency.get()).unwrap_or(usize::MAX);
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Wait for a free worker, then run the render on the blocking thread pool.
    ///
    /// The permit travels with the blocking task, so a caller that stops
    /// waiting does not free the slot before the renderer process exits.
    pub async fn render(
        &self,
        viewport: Viewport,
        params: RenderParameters,
        tier: PrecisionTier,
    ) -> Result<CapturedOutput, RenderError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|err| RenderError::WorkerUnavailable(err.to_string()))?;

        debug!(
            target = "application::render::pool",
            available = self.permits.available_permits(),
            tier = %tier,
            "Render worker acquired"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            orchestrator.run_render(&viewport, &params, tier)
        })
        .await
        .map_err(|err| RenderError::WorkerUnavailable(format!("render task aborted: {err}")))?
    }
}
