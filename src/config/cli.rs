use std::{num::NonZeroU32, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::{
    error::{DomainError, SelectionError},
    params::{
        DEFAULT_CONTOURS, DEFAULT_ITERATIONS, DEFAULT_SIZE, DEFAULT_THEME, Fractal, JuliaConstant,
        RenderParameters,
    },
    viewport::{MappingMode, SelectionRect, Viewport},
};

/// Command-line arguments for the fractscope binary.
#[derive(Debug, Parser)]
#[command(name = "fractscope", version, about = "Fractal zoom renderer front end")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FRACTSCOPE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render an explicit viewport and publish the image.
    Render(Box<RenderArgs>),
    /// Map a selection on a previous render to a new viewport, render and publish it.
    Zoom(Box<ZoomArgs>),
    /// Retire a published image by id or URL.
    Retire(RetireArgs),
    /// Validate the renderer executables for this platform.
    Check(CheckArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(flatten)]
    pub viewport: ViewportArgs,

    #[command(flatten)]
    pub params: ParamsArgs,

    /// Image id or URL replaced by this render; retired after the new image is published.
    #[arg(long, value_name = "REF")]
    pub supersedes: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ZoomArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(flatten)]
    pub previous: ViewportArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub params: ParamsArgs,

    /// Image id or URL replaced by this render; retired after the new image is published.
    #[arg(long, value_name = "REF")]
    pub supersedes: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RetireArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Image id or public URL.
    #[arg(value_name = "REF")]
    pub reference: String,
}

#[derive(Debug, Args, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Debug, Args, Clone, Copy)]
pub struct ViewportArgs {
    #[arg(long = "x-min", allow_negative_numbers = true, value_name = "X")]
    pub x_min: f64,
    #[arg(long = "x-max", allow_negative_numbers = true, value_name = "X")]
    pub x_max: f64,
    #[arg(long = "y-min", allow_negative_numbers = true, value_name = "Y")]
    pub y_min: f64,
    #[arg(long = "y-max", allow_negative_numbers = true, value_name = "Y")]
    pub y_max: f64,
}

impl ViewportArgs {
    pub fn to_viewport(self) -> Result<Viewport, DomainError> {
        Viewport::new(self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

/// Selection rectangle in image pixels; corners may be given in any order.
#[derive(Debug, Args, Clone, Copy)]
pub struct SelectionArgs {
    #[arg(long, allow_negative_numbers = true, value_name = "PX")]
    pub x0: f64,
    #[arg(long, allow_negative_numbers = true, value_name = "PX")]
    pub y0: f64,
    #[arg(long, allow_negative_numbers = true, value_name = "PX")]
    pub x1: f64,
    #[arg(long, allow_negative_numbers = true, value_name = "PX")]
    pub y1: f64,
    #[arg(long = "image-width", value_name = "PX")]
    pub image_width: u32,
    #[arg(long = "image-height", value_name = "PX")]
    pub image_height: u32,
}

impl SelectionArgs {
    pub fn to_selection(self) -> Result<SelectionRect, SelectionError> {
        SelectionRect::new(
            (self.x0, self.y0),
            (self.x1, self.y1),
            self.image_width,
            self.image_height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FractalArg {
    Mandelbrot,
    Julia,
}

#[derive(Debug, Args, Clone, Copy)]
pub struct ParamsArgs {
    #[arg(long, value_enum, default_value_t = FractalArg::Mandelbrot)]
    pub fractal: FractalArg,

    /// Number of colour contour levels.
    #[arg(long, default_value_t = nz(DEFAULT_CONTOURS))]
    pub contours: NonZeroU32,

    /// Colour theme index.
    #[arg(long, default_value_t = nz(DEFAULT_THEME))]
    pub theme: NonZeroU32,

    /// Iteration cap per pixel.
    #[arg(long, default_value_t = nz(DEFAULT_ITERATIONS))]
    pub iterations: NonZeroU32,

    /// Longest image edge in pixels.
    #[arg(long, default_value_t = nz(DEFAULT_SIZE))]
    pub size: NonZeroU32,

    /// Real part of the Julia constant.
    #[arg(
        long = "julia-x",
        allow_negative_numbers = true,
        required_if_eq("fractal", "julia")
    )]
    pub julia_x: Option<f64>,

    /// Imaginary part of the Julia constant.
    #[arg(
        long = "julia-y",
        allow_negative_numbers = true,
        required_if_eq("fractal", "julia")
    )]
    pub julia_y: Option<f64>,
}

impl ParamsArgs {
    pub fn to_parameters(self) -> Result<RenderParameters, DomainError> {
        let fractal = match (self.fractal, self.julia_x, self.julia_y) {
            (FractalArg::Mandelbrot, _, _) => Fractal::Mandelbrot,
            (FractalArg::Julia, Some(x), Some(y)) => Fractal::Julia {
                constant: JuliaConstant::new(x, y)?,
            },
            (FractalArg::Julia, _, _) => {
                return Err(DomainError::invalid_parameters(
                    "julia renders require --julia-x and --julia-y",
                ));
            }
        };

        Ok(RenderParameters {
            fractal,
            contours: self.contours,
            theme: self.theme,
            iterations: self.iterations,
            size: self.size,
        })
    }
}

fn nz(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MappingArg {
    Unconstrained,
    AspectPreserving,
}

impl From<MappingArg> for MappingMode {
    fn from(value: MappingArg) -> Self {
        match value {
            MappingArg::Unconstrained => MappingMode::Unconstrained,
            MappingArg::AspectPreserving => MappingMode::AspectPreserving,
        }
    }
}

/// Settings overrides accepted by every subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the directory holding the renderer executables.
    #[arg(long = "renderer-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub renderer_dir: Option<PathBuf>,

    /// Override the directory for job scratch space and staged captures.
    #[arg(long = "work-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub work_dir: Option<PathBuf>,

    /// Override the number of concurrent render workers.
    #[arg(long = "render-concurrency", value_name = "COUNT")]
    pub render_concurrency: Option<u32>,

    /// Override the published images directory.
    #[arg(long = "images-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub images_directory: Option<PathBuf>,

    /// Override the URL prefix published images are served under.
    #[arg(long = "images-public-base", value_name = "URL")]
    pub images_public_base: Option<String>,

    /// Override how selections are mapped back to the plane.
    #[arg(long = "viewport-mapping", value_enum)]
    pub viewport_mapping: Option<MappingArg>,

    /// Override the span below which the 80-bit renderer is used.
    #[arg(long = "deep-zoom-threshold", value_name = "SPAN")]
    pub deep_zoom_threshold: Option<f64>,

    /// Override the span below which the 128-bit renderer is used.
    #[arg(long = "very-deep-zoom-threshold", value_name = "SPAN")]
    pub very_deep_zoom_threshold: Option<f64>,
}

impl Command {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Command::Render(args) => &args.overrides,
            Command::Zoom(args) => &args.overrides,
            Command::Retire(args) => &args.overrides,
            Command::Check(args) => &args.overrides,
        }
    }
}
