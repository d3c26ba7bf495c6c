//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::{
    precision::{
        DEFAULT_DEEP_ZOOM_THRESHOLD, DEFAULT_VERY_DEEP_ZOOM_THRESHOLD, PrecisionThresholds,
    },
    viewport::MappingMode,
};

pub use cli::{
    CheckArgs, CliArgs, Command, FractalArg, MappingArg, Overrides, ParamsArgs, RenderArgs,
    RetireArgs, SelectionArgs, ViewportArgs, ZoomArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fractscope";
const DEFAULT_RENDERER_DIR: &str = "renderer";
const DEFAULT_EXECUTABLE_STEM: &str = "mandelbrot";
const DEFAULT_OUTPUT_FILE: &str = "contours.png";
const DEFAULT_WORK_SUBDIR: &str = "fractscope";
const DEFAULT_RENDER_CONCURRENCY: u32 = 2;
const DEFAULT_IMAGES_DIR: &str = "images";
const DEFAULT_IMAGES_PUBLIC_BASE: &str = "/images";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub precision: PrecisionThresholds,
    pub viewport: ViewportSettings,
    pub images: ImageSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub renderer_dir: PathBuf,
    pub executable_stem: String,
    pub output_file: String,
    pub work_dir: PathBuf,
    pub concurrency: NonZeroU32,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewportSettings {
    pub mapping: MappingMode,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub directory: PathBuf,
    pub public_base: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FRACTSCOPE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    precision: RawPrecisionSettings,
    viewport: RawViewportSettings,
    images: RawImageSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(dir) = overrides.renderer_dir.as_ref() {
            self.render.renderer_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.work_dir.as_ref() {
            self.render.work_dir = Some(dir.clone());
        }
        if let Some(value) = overrides.render_concurrency {
            self.render.concurrency = Some(value);
        }
        if let Some(dir) = overrides.images_directory.as_ref() {
            self.images.directory = Some(dir.clone());
        }
        if let Some(base) = overrides.images_public_base.as_ref() {
            self.images.public_base = Some(base.clone());
        }
        if let Some(mapping) = overrides.viewport_mapping {
            self.viewport.mapping = Some(mapping.into());
        }
        if let Some(value) = overrides.deep_zoom_threshold {
            self.precision.deep_zoom_threshold = Some(value);
        }
        if let Some(value) = overrides.very_deep_zoom_threshold {
            self.precision.very_deep_zoom_threshold = Some(value);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            precision,
            viewport,
            images,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            precision: build_precision_thresholds(precision)?,
            viewport: ViewportSettings {
                mapping: viewport.mapping.unwrap_or_default(),
            },
            images: build_image_settings(images)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let renderer_dir = render
        .renderer_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDERER_DIR));
    if renderer_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "render.renderer_dir",
            "path must not be empty",
        ));
    }

    let executable_stem = render
        .executable_stem
        .unwrap_or_else(|| DEFAULT_EXECUTABLE_STEM.to_string());
    if executable_stem.trim().is_empty() || executable_stem.contains(['/', '\\']) {
        return Err(LoadError::invalid(
            "render.executable_stem",
            "must be a non-empty file name without separators",
        ));
    }

    let output_file = render
        .output_file
        .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string());
    if output_file.trim().is_empty() || output_file.contains(['/', '\\']) {
        return Err(LoadError::invalid(
            "render.output_file",
            "must be a non-empty file name without separators",
        ));
    }

    let work_dir = render
        .work_dir
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_WORK_SUBDIR));
    if work_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid("render.work_dir", "path must not be empty"));
    }

    let concurrency = render.concurrency.unwrap_or(DEFAULT_RENDER_CONCURRENCY);
    let concurrency = NonZeroU32::new(concurrency)
        .ok_or_else(|| LoadError::invalid("render.concurrency", "must be greater than zero"))?;

    Ok(RenderSettings {
        renderer_dir,
        executable_stem,
        output_file,
        work_dir,
        concurrency,
    })
}

fn build_precision_thresholds(
    precision: RawPrecisionSettings,
) -> Result<PrecisionThresholds, LoadError> {
    let deep = precision
        .deep_zoom_threshold
        .unwrap_or(DEFAULT_DEEP_ZOOM_THRESHOLD);
    let very_deep = precision
        .very_deep_zoom_threshold
        .unwrap_or(DEFAULT_VERY_DEEP_ZOOM_THRESHOLD);

    PrecisionThresholds::new(deep, very_deep)
        .map_err(|err| LoadError::invalid("precision", err.to_string()))
}

fn build_image_settings(images: RawImageSettings) -> Result<ImageSettings, LoadError> {
    let directory = images
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "images.directory",
            "path must not be empty",
        ));
    }

    let public_base = images
        .public_base
        .unwrap_or_else(|| DEFAULT_IMAGES_PUBLIC_BASE.to_string());
    let public_base = public_base.trim().trim_end_matches('/').to_string();

    Ok(ImageSettings {
        directory,
        public_base,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    renderer_dir: Option<PathBuf>,
    executable_stem: Option<String>,
    output_file: Option<String>,
    work_dir: Option<PathBuf>,
    concurrency: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPrecisionSettings {
    deep_zoom_threshold: Option<f64>,
    very_deep_zoom_threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewportSettings {
    mapping: Option<MappingMode>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawImageSettings {
    directory: Option<PathBuf>,
    public_base: Option<String>,
}
