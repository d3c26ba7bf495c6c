//! Render parameters forwarded verbatim to the external renderer.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

pub const DEFAULT_CONTOURS: u32 = 64;
pub const DEFAULT_THEME: u32 = 2;
pub const DEFAULT_ITERATIONS: u32 = 1024;
pub const DEFAULT_SIZE: u32 = 2048;

/// Fixed complex constant `c` of a Julia set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JuliaConstant {
    x: f64,
    y: f64,
}

impl JuliaConstant {
    pub fn new(x: f64, y: f64) -> Result<Self, DomainError> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(DomainError::invalid_parameters(
                "julia constant must be finite",
            ));
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Fractal {
    Mandelbrot,
    Julia { constant: JuliaConstant },
}

impl Fractal {
    /// Numeric code understood by the renderer's `-f` flag.
    pub fn code(&self) -> u32 {
        match self {
            Fractal::Mandelbrot => 1,
            Fractal::Julia { .. } => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Fractal::Mandelbrot => "mandelbrot",
            Fractal::Julia { .. } => "julia",
        }
    }
}

/// Everything the renderer needs besides the viewport.
///
/// Values are range-checked upstream; the render core only forwards them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderParameters {
    pub fractal: Fractal,
    pub contours: NonZeroU32,
    pub theme: NonZeroU32,
    pub iterations: NonZeroU32,
    /// Longest edge of the output image in pixels.
    pub size: NonZeroU32,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            fractal: Fractal::Mandelbrot,
            contours: NonZeroU32::new(DEFAULT_CONTOURS).unwrap_or(NonZeroU32::MIN),
            theme: NonZeroU32::new(DEFAULT_THEME).unwrap_or(NonZeroU32::MIN),
            iterations: NonZeroU32::new(DEFAULT_ITERATIONS).unwrap_or(NonZeroU32::MIN),
            size: NonZeroU32::new(DEFAULT_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}
