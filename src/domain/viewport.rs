//! Fractal-plane viewports and the mapping from pixel selections back onto the plane.

use serde::{Deserialize, Serialize};

use super::error::{DomainError, SelectionError};

/// Rectangle of the fractal (complex) plane being rendered.
///
/// Bounds are finite and strictly ordered on both axes. A viewport is never
/// mutated; zooming derives a new one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawViewport")]
pub struct Viewport {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

/// The classic full view of the Mandelbrot set.
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    x_min: -2.5,
    x_max: 1.0,
    y_min: -1.3,
    y_max: 1.3,
};

impl Viewport {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self, DomainError> {
        if ![x_min, x_max, y_min, y_max].iter().all(|value| value.is_finite()) {
            return Err(DomainError::invalid_viewport("bounds must be finite"));
        }
        if x_min >= x_max {
            return Err(DomainError::invalid_viewport(format!(
                "x_min ({x_min}) must be less than x_max ({x_max})"
            )));
        }
        if y_min >= y_max {
            return Err(DomainError::invalid_viewport(format!(
                "y_min ({y_min}) must be less than y_max ({y_max})"
            )));
        }

        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    #[must_use]
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    #[must_use]
    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    #[must_use]
    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    #[must_use]
    pub fn span_x(&self) -> f64 {
        (self.x_max - self.x_min).abs()
    }

    #[must_use]
    pub fn span_y(&self) -> f64 {
        (self.y_max - self.y_min).abs()
    }

    /// Width over height of the plane rectangle.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        (self.x_max - self.x_min) / (self.y_max - self.y_min)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        DEFAULT_VIEWPORT
    }
}

#[derive(Deserialize)]
struct RawViewport {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl TryFrom<RawViewport> for Viewport {
    type Error = DomainError;

    fn try_from(raw: RawViewport) -> Result<Self, Self::Error> {
        Viewport::new(raw.x_min, raw.x_max, raw.y_min, raw.y_max)
    }
}

/// A rectangle dragged over a rendered image, in image pixel coordinates.
///
/// Image Y grows downward. Corners are normalised on construction so that
/// `x0 < x1` and `y0 < y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    image_width: u32,
    image_height: u32,
}

impl SelectionRect {
    pub fn new(
        corner_a: (f64, f64),
        corner_b: (f64, f64),
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, SelectionError> {
        if image_width == 0 || image_height == 0 {
            return Err(SelectionError::EmptyCanvas {
                width: image_width,
                height: image_height,
            });
        }

        let coords = [corner_a.0, corner_a.1, corner_b.0, corner_b.1];
        if !coords.iter().all(|value| value.is_finite()) {
            return Err(SelectionError::NonFinite);
        }

        let (x0, x1) = ordered(corner_a.0, corner_b.0);
        let (y0, y1) = ordered(corner_a.1, corner_b.1);

        if x0 == x1 || y0 == y1 {
            return Err(SelectionError::ZeroArea);
        }

        let width = f64::from(image_width);
        let height = f64::from(image_height);
        if x0 < 0.0 || y0 < 0.0 || x1 > width || y1 > height {
            return Err(SelectionError::OutOfCanvas {
                width: image_width,
                height: image_height,
            });
        }

        Ok(Self {
            x0,
            y0,
            x1,
            y1,
            image_width,
            image_height,
        })
    }

    /// Selection covering the entire canvas.
    pub fn full_canvas(image_width: u32, image_height: u32) -> Result<Self, SelectionError> {
        Self::new(
            (0.0, 0.0),
            (f64::from(image_width), f64::from(image_height)),
            image_width,
            image_height,
        )
    }

    #[must_use]
    pub fn x0(&self) -> f64 {
        self.x0
    }

    #[must_use]
    pub fn y0(&self) -> f64 {
        self.y0
    }

    #[must_use]
    pub fn x1(&self) -> f64 {
        self.x1
    }

    #[must_use]
    pub fn y1(&self) -> f64 {
        self.y1
    }

    #[must_use]
    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    #[must_use]
    pub fn image_height(&self) -> u32 {
        self.image_height
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// How pixel selections are projected back onto the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    /// Each axis is interpolated independently against the full canvas.
    Unconstrained,
    /// The plane rectangle occupies a centred, ratio-preserving sub-rectangle
    /// of the canvas (letterboxed output).
    #[default]
    AspectPreserving,
}

/// Pixel sub-rectangle of the canvas that the plane rectangle actually covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedRegion {
    pub start_x: f64,
    pub start_y: f64,
    pub width: f64,
    pub height: f64,
}

impl RenderedRegion {
    fn full_canvas(image_width: u32, image_height: u32) -> Self {
        Self {
            start_x: 0.0,
            start_y: 0.0,
            width: f64::from(image_width),
            height: f64::from(image_height),
        }
    }

    /// Locate the ratio-preserving region for `viewport` inside the canvas.
    pub fn letterboxed(viewport: &Viewport, image_width: u32, image_height: u32) -> Self {
        let ratio = viewport.aspect_ratio();
        let canvas_width = f64::from(image_width);
        let canvas_height = f64::from(image_height);

        if ratio < canvas_width / canvas_height {
            let width = ratio * canvas_height;
            Self {
                start_x: 0.5 * (canvas_width - width),
                start_y: 0.0,
                width,
                height: canvas_height,
            }
        } else {
            let height = canvas_width / ratio;
            Self {
                start_x: 0.0,
                start_y: 0.5 * (canvas_height - height),
                width: canvas_width,
                height,
            }
        }
    }
}

/// Project a pixel selection on the image rendered for `previous` back onto the plane.
///
/// Pure numeric transform; it performs no validation beyond what
/// [`SelectionRect`] already guarantees.
pub fn map_selection_to_viewport(
    previous: &Viewport,
    rect: &SelectionRect,
    mode: MappingMode,
) -> Viewport {
    let region = match mode {
        MappingMode::Unconstrained => {
            RenderedRegion::full_canvas(rect.image_width, rect.image_height)
        }
        MappingMode::AspectPreserving => {
            RenderedRegion::letterboxed(previous, rect.image_width, rect.image_height)
        }
    };

    let delta_x = (previous.x_max - previous.x_min) / region.width;
    let delta_y = (previous.y_max - previous.y_min) / region.height;

    let x0 = rect.x0 - region.start_x;
    let x1 = rect.x1 - region.start_x;
    let y0 = rect.y0 - region.start_y;
    let y1 = rect.y1 - region.start_y;

    // Image Y grows downward while plane Y grows upward.
    Viewport {
        x_min: previous.x_min + x0 * delta_x,
        x_max: previous.x_min + x1 * delta_x,
        y_min: previous.y_max - y1 * delta_y,
        y_max: previous.y_max - y0 * delta_y,
    }
}
