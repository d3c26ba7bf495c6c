//! Published image store: write once under a fresh name, delete by name.

use std::path::{Path, PathBuf};

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::render::{CapturedOutput, elapsed_millis},
    util::fs::move_file,
};

const TARGET: &str = "infra::images";

pub(crate) const METRIC_IMAGE_PUBLISHED_TOTAL: &str = "fractscope_image_published_total";
pub(crate) const METRIC_IMAGE_RETIRED_TOTAL: &str = "fractscope_image_retired_total";
pub(crate) const METRIC_IMAGE_RETIRE_MISSING_TOTAL: &str = "fractscope_image_retire_missing_total";

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("invalid image reference `{0}`")]
    InvalidReference(String),
    #[error("failed to publish image: {0}")]
    Publish(#[source] std::io::Error),
    #[error("failed to retire image `{id}`: {source}")]
    Retire {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

/// A published image and the stable reference callers persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifact {
    pub id: String,
    pub path: PathBuf,
    pub url: String,
}

/// What `retire` found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetireOutcome {
    Removed,
    AlreadyAbsent,
}

/// Filesystem-backed store of served images.
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
    public_base: String,
}

impl ImageStore {
    /// Initialise the store rooted at `root`, creating it if necessary.
    ///
    /// `public_base` is the URL prefix the host serves `root` under.
    pub fn new(root: PathBuf, public_base: &str) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move a captured render into the store under a new, unique name.
    pub async fn publish(&self, captured: CapturedOutput) -> Result<ImageArtifact, ImageStoreError> {
        let id = build_image_id(captured.extension());
        let artifact = self.artifact_for(id);

        move_file(captured.path(), &artifact.path)
            .await
            .map_err(ImageStoreError::Publish)?;

        counter!(METRIC_IMAGE_PUBLISHED_TOTAL).increment(1);
        info!(
            target = TARGET,
            op = "images::publish",
            id = %artifact.id,
            tier = %captured.tier,
            render_ms = elapsed_millis(captured.elapsed),
            "Published rendered image"
        );

        Ok(artifact)
    }

    /// Delete a published image. A missing file is logged, not an error.
    pub async fn retire(&self, reference: &str) -> Result<RetireOutcome, ImageStoreError> {
        let artifact = self.artifact(reference)?;

        match fs::remove_file(&artifact.path).await {
            Ok(()) => {
                counter!(METRIC_IMAGE_RETIRED_TOTAL).increment(1);
                info!(
                    target = TARGET,
                    op = "images::retire",
                    id = %artifact.id,
                    "Retired image"
                );
                Ok(RetireOutcome::Removed)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                counter!(METRIC_IMAGE_RETIRE_MISSING_TOTAL).increment(1);
                warn!(
                    target = TARGET,
                    op = "images::retire",
                    id = %artifact.id,
                    "Image already absent during retirement"
                );
                Ok(RetireOutcome::AlreadyAbsent)
            }
            Err(source) => Err(ImageStoreError::Retire {
                id: artifact.id,
                source,
            }),
        }
    }

    /// Resolve a bare id or a URL under the public base to an artifact.
    pub fn artifact(&self, reference: &str) -> Result<ImageArtifact, ImageStoreError> {
        let id = self.parse_reference(reference)?;
        Ok(self.artifact_for(id.to_string()))
    }

    fn artifact_for(&self, id: String) -> ImageArtifact {
        ImageArtifact {
            path: self.root.join(&id),
            url: format!("{}/{id}", self.public_base),
            id,
        }
    }

    fn parse_reference<'a>(&self, reference: &'a str) -> Result<&'a str, ImageStoreError> {
        let trimmed = reference.trim();
        let id = trimmed
            .strip_prefix(self.public_base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(trimmed);

        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.starts_with('.');
        if valid {
            Ok(id)
        } else {
            Err(ImageStoreError::InvalidReference(reference.to_string()))
        }
    }
}

/// `<unix-millis>-<uuid>[.ext]`: sortable by creation time, unique across concurrent jobs.
fn build_image_id(extension: Option<&str>) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let identifier = Uuid::new_v4().simple();
    match extension {
        Some(ext) => format!("{millis}-{identifier}.{ext}"),
        None => format!("{millis}-{identifier}"),
    }
}
