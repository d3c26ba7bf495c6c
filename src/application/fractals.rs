//! Render request pipeline: selection → viewport → tier → render → published image.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::{
    application::{
        error::AppError,
        render::{RenderError, RenderPool},
    },
    domain::{
        error::SelectionError,
        params::RenderParameters,
        precision::{PrecisionThresholds, PrecisionTier, select_tier},
        viewport::{MappingMode, SelectionRect, Viewport, map_selection_to_viewport},
    },
    infra::images::{ImageArtifact, ImageStore, RetireOutcome},
};

const TARGET: &str = "application::fractals";

/// Where the next viewport comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportSource {
    Explicit(Viewport),
    Selection {
        previous: Viewport,
        selection: SelectionRect,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalRequest {
    pub source: ViewportSource,
    pub params: RenderParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedFractal {
    pub viewport: Viewport,
    pub tier: PrecisionTier,
    pub params: RenderParameters,
    pub image: ImageArtifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<SupersededImage>,
}

/// Fate of the image a replacement render supersedes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SupersededImage {
    Retired { id: String },
    AlreadyAbsent { id: String },
    RetireFailed { id: String, error: String },
}

#[derive(Clone)]
pub struct FractalService {
    pool: RenderPool,
    images: Arc<ImageStore>,
    thresholds: PrecisionThresholds,
    mapping: MappingMode,
}

impl FractalService {
    pub fn new(
        pool: RenderPool,
        images: Arc<ImageStore>,
        thresholds: PrecisionThresholds,
        mapping: MappingMode,
    ) -> Self {
        Self {
            pool,
            images,
            thresholds,
            mapping,
        }
    }

    /// Derive the viewport to render, mapping a selection when one is given.
    pub fn resolve_viewport(&self, source: &ViewportSource) -> Result<Viewport, RenderError> {
        match source {
            ViewportSource::Explicit(viewport) => Ok(*viewport),
            ViewportSource::Selection {
                previous,
                selection,
            } => {
                let mapped = map_selection_to_viewport(previous, selection, self.mapping);
                // Re-validate: past f64 resolution the mapped bounds can coincide.
                Viewport::new(mapped.x_min(), mapped.x_max(), mapped.y_min(), mapped.y_max())
                    .map_err(|_| RenderError::InvalidSelection(SelectionError::Collapsed))
            }
        }
    }

    /// Render and publish a new image.
    pub async fn create(&self, request: FractalRequest) -> Result<RenderedFractal, AppError> {
        self.render_and_publish(request).await
    }

    /// Render and publish a new image, then retire the one it supersedes.
    ///
    /// The superseded image is left alone when rendering fails.
    pub async fn replace(
        &self,
        request: FractalRequest,
        superseded: &str,
    ) -> Result<RenderedFractal, AppError> {
        let previous = self.images.artifact(superseded)?;
        let mut rendered = self.render_and_publish(request).await?;

        let status = match self.images.retire(&previous.id).await {
            Ok(RetireOutcome::Removed) => SupersededImage::Retired { id: previous.id },
            Ok(RetireOutcome::AlreadyAbsent) => SupersededImage::AlreadyAbsent { id: previous.id },
            Err(err) => {
                error!(
                    target = TARGET,
                    op = "fractals::replace",
                    superseded = %previous.id,
                    image = %rendered.image.id,
                    error = %err,
                    "Failed to retire superseded image"
                );
                SupersededImage::RetireFailed {
                    id: previous.id,
                    error: err.to_string(),
                }
            }
        };
        rendered.superseded = Some(status);

        Ok(rendered)
    }

    /// Retire a published image; absent files are not an error.
    pub async fn remove(&self, reference: &str) -> Result<RetireOutcome, AppError> {
        Ok(self.images.retire(reference).await?)
    }

    async fn render_and_publish(
        &self,
        request: FractalRequest,
    ) -> Result<RenderedFractal, AppError> {
        let viewport = self.resolve_viewport(&request.source)?;
        let tier = select_tier(&viewport, &self.thresholds);

        info!(
            target = TARGET,
            op = "fractals::render",
            tier = %tier,
            fractal = request.params.fractal.name(),
            x_min = viewport.x_min(),
            x_max = viewport.x_max(),
            y_min = viewport.y_min(),
            y_max = viewport.y_max(),
            "Render requested"
        );

        let captured = self.pool.render(viewport, request.params, tier).await?;
        let image = self.images.publish(captured).await?;

        Ok(RenderedFractal {
            viewport,
            tier,
            params: request.params,
            image,
            superseded: None,
        })
    }
}
