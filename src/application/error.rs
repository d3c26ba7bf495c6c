use thiserror::Error;

use crate::{
    application::render::{RenderError, RendererTableError},
    domain::error::DomainError,
    infra::{error::InfraError, images::ImageStoreError},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Renderers(#[from] RendererTableError),
    #[error(transparent)]
    Images(#[from] ImageStoreError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(_)
            | AppError::Render(RenderError::InvalidSelection(_))
            | AppError::Images(ImageStoreError::InvalidReference(_)) => 2,
            AppError::Render(RenderError::ExecutionFailed { .. })
            | AppError::Render(RenderError::NoOutputProduced { .. }) => 3,
            AppError::Renderers(_) | AppError::Infra(InfraError::Configuration { .. }) => 4,
            _ => 1,
        }
    }
}
