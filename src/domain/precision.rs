//! Numeric precision tiers chosen from the viewport span.
//!
//! The renderer ships one executable per tier. Below a span of roughly 1e-13
//! plain doubles start cancelling and the image bands; below roughly 1e-16 the
//! 80-bit extended type does the same. The default thresholds sit a couple of
//! orders of magnitude above those limits.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{error::DomainError, viewport::Viewport};

pub const DEFAULT_DEEP_ZOOM_THRESHOLD: f64 = 1.0e-11;
pub const DEFAULT_VERY_DEEP_ZOOM_THRESHOLD: f64 = 1.0e-15;

/// Floating-point width used by the renderer, ordered by capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionTier {
    /// 64-bit double.
    Standard,
    /// 80-bit x87 extended.
    Extended,
    /// 128-bit quad.
    Extended2,
}

impl PrecisionTier {
    pub const ALL: [PrecisionTier; 3] = [
        PrecisionTier::Standard,
        PrecisionTier::Extended,
        PrecisionTier::Extended2,
    ];

    /// Width in bits, as encoded in the renderer executable name.
    pub fn bits(self) -> u32 {
        match self {
            PrecisionTier::Standard => 64,
            PrecisionTier::Extended => 80,
            PrecisionTier::Extended2 => 128,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrecisionTier::Standard => "standard",
            PrecisionTier::Extended => "extended",
            PrecisionTier::Extended2 => "extended2",
        }
    }
}

impl fmt::Display for PrecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Span limits below which a wider tier is required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecisionThresholds {
    deep_zoom: f64,
    very_deep_zoom: f64,
}

impl PrecisionThresholds {
    pub fn new(deep_zoom: f64, very_deep_zoom: f64) -> Result<Self, DomainError> {
        if !(deep_zoom.is_finite() && deep_zoom > 0.0) {
            return Err(DomainError::invalid_thresholds(
                "deep zoom threshold must be finite and positive",
            ));
        }
        if !(very_deep_zoom.is_finite() && very_deep_zoom > 0.0) {
            return Err(DomainError::invalid_thresholds(
                "very deep zoom threshold must be finite and positive",
            ));
        }
        if very_deep_zoom >= deep_zoom {
            return Err(DomainError::invalid_thresholds(format!(
                "very deep zoom threshold ({very_deep_zoom:e}) must be below deep zoom threshold ({deep_zoom:e})"
            )));
        }

        Ok(Self {
            deep_zoom,
            very_deep_zoom,
        })
    }

    pub fn deep_zoom(&self) -> f64 {
        self.deep_zoom
    }

    pub fn very_deep_zoom(&self) -> f64 {
        self.very_deep_zoom
    }
}

impl Default for PrecisionThresholds {
    fn default() -> Self {
        Self {
            deep_zoom: DEFAULT_DEEP_ZOOM_THRESHOLD,
            very_deep_zoom: DEFAULT_VERY_DEEP_ZOOM_THRESHOLD,
        }
    }
}

/// Choose the narrowest tier that still resolves the smaller viewport span.
pub fn select_tier(viewport: &Viewport, thresholds: &PrecisionThresholds) -> PrecisionTier {
    tier_for_spans(viewport.span_x(), viewport.span_y(), thresholds)
}

fn tier_for_spans(span_x: f64, span_y: f64, thresholds: &PrecisionThresholds) -> PrecisionTier {
    if span_x < thresholds.very_deep_zoom || span_y < thresholds.very_deep_zoom {
        PrecisionTier::Extended2
    } else if span_x < thresholds.deep_zoom || span_y < thresholds.deep_zoom {
        PrecisionTier::Extended
    } else {
        PrecisionTier::Standard
    }
}
