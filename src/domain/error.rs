use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid viewport: {message}")]
    InvalidViewport { message: String },
    #[error("invalid render parameters: {message}")]
    InvalidParameters { message: String },
    #[error("invalid precision thresholds: {message}")]
    InvalidThresholds { message: String },
}

impl DomainError {
    pub fn invalid_viewport(message: impl Into<String>) -> Self {
        Self::InvalidViewport {
            message: message.into(),
        }
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    pub fn invalid_thresholds(message: impl Into<String>) -> Self {
        Self::InvalidThresholds {
            message: message.into(),
        }
    }
}

/// Reasons a pixel selection cannot be turned into a new viewport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("image canvas {width}x{height} has no area")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("selection coordinates must be finite")]
    NonFinite,
    #[error("selection has zero area")]
    ZeroArea,
    #[error("selection extends outside the {width}x{height} canvas")]
    OutOfCanvas { width: u32, height: u32 },
    #[error("selection collapses below floating-point resolution")]
    Collapsed,
}
