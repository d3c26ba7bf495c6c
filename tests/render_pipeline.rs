#![cfg(unix)]

use std::{
    collections::HashSet,
    fs,
    num::NonZeroU32,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use fractscope::{
    application::{
        error::AppError,
        fractals::{FractalRequest, FractalService, SupersededImage, ViewportSource},
        render::{Platform, RenderError, RenderOrchestrator, RenderPool, RendererTable},
    },
    domain::{
        error::SelectionError,
        params::RenderParameters,
        precision::{PrecisionThresholds, PrecisionTier},
        viewport::{MappingMode, SelectionRect, Viewport},
    },
    infra::images::{ImageStore, RetireOutcome},
};
use futures::future::try_join_all;
use tempfile::TempDir;

/// Writes its own name and arguments into the output image, one per line.
const ECHO_RENDERER: &str = "#!/bin/sh\nset -eu\ncase \" $* \" in\n  *\" -i 13 \"*) echo 'iteration cap rejected' >&2; exit 7 ;;\nesac\n{ basename \"$0\"; printf '%s\\n' \"$@\"; } > contours.png\nprintf 'scratch' > contours.csv\n";

const SILENT_RENDERER: &str = "#!/bin/sh\nexit 0\n";

struct Harness {
    root: TempDir,
    service: FractalService,
}

impl Harness {
    fn new(script: &str, concurrency: u32) -> Self {
        let root = TempDir::new().expect("temp dir");
        let bin = root.path().join("renderer");
        fs::create_dir_all(&bin).expect("renderer dir");
        for bits in [64, 80, 128] {
            let path = bin.join(format!("mandelbrot-{bits}"));
            fs::write(&path, script).expect("write renderer");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        }

        let table = RendererTable::for_platform(&bin, "mandelbrot", Platform::Unix);
        table.validate().expect("renderers valid");
        let orchestrator =
            RenderOrchestrator::new(table, root.path().join("work"), "contours.png")
                .expect("orchestrator");
        let pool = RenderPool::new(
            Arc::new(orchestrator),
            NonZeroU32::new(concurrency).expect("non-zero"),
        );
        let images =
            ImageStore::new(root.path().join("images"), "/images").expect("image store");

        let service = FractalService::new(
            pool,
            Arc::new(images),
            PrecisionThresholds::default(),
            MappingMode::Unconstrained,
        );

        Self { root, service }
    }

    fn work_root(&self) -> PathBuf {
        self.root.path().join("work")
    }

    fn images_root(&self) -> PathBuf {
        self.root.path().join("images")
    }
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").path())
        .collect()
}

fn explicit(viewport: Viewport) -> FractalRequest {
    FractalRequest {
        source: ViewportSource::Explicit(viewport),
        params: RenderParameters::default(),
    }
}

fn output_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read image")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn create_publishes_output_and_cleans_work_root() {
    let harness = Harness::new(ECHO_RENDERER, 2);

    let rendered = harness
        .service
        .create(explicit(Viewport::default()))
        .await
        .expect("render succeeds");

    assert_eq!(rendered.tier, PrecisionTier::Standard);
    assert!(rendered.image.id.ends_with(".png"));
    assert_eq!(rendered.image.url, format!("/images/{}", rendered.image.id));
    assert!(rendered.superseded.is_none());

    let lines = output_lines(&rendered.image.path);
    assert_eq!(
        lines,
        [
            "mandelbrot-64",
            "-c",
            "64",
            "-f",
            "1",
            "-i",
            "1024",
            "-s",
            "2048",
            "-t",
            "2",
            "-2.5",
            "1.0",
            "-1.3",
            "1.3"
        ]
    );

    assert!(
        entries(&harness.work_root()).is_empty(),
        "job directories and staged captures must be gone"
    );
    assert_eq!(entries(&harness.images_root()).len(), 1);
}

#[tokio::test]
async fn zoom_selection_picks_deep_renderer() {
    let harness = Harness::new(ECHO_RENDERER, 1);
    let previous = Viewport::new(0.0, 1e-10, 0.0, 1e-10).expect("viewport");
    let selection = SelectionRect::new((10.0, 10.0), (0.0, 0.0), 1000, 1000).expect("selection");

    let rendered = harness
        .service
        .create(FractalRequest {
            source: ViewportSource::Selection {
                previous,
                selection,
            },
            params: RenderParameters::default(),
        })
        .await
        .expect("render succeeds");

    assert_eq!(rendered.tier, PrecisionTier::Extended);
    assert!(rendered.viewport.span_x() < 1e-11);
    assert!(rendered.viewport.y_max() <= 1e-10);
    assert_eq!(output_lines(&rendered.image.path)[0], "mandelbrot-80");
}

#[tokio::test]
async fn very_deep_viewport_uses_widest_renderer() {
    let harness = Harness::new(ECHO_RENDERER, 1);
    let viewport = Viewport::new(0.0, 1e-16, 0.0, 1e-16).expect("viewport");

    let rendered = harness
        .service
        .create(explicit(viewport))
        .await
        .expect("render succeeds");

    assert_eq!(rendered.tier, PrecisionTier::Extended2);
    let lines = output_lines(&rendered.image.path);
    assert_eq!(lines[0], "mandelbrot-128");
    assert_eq!(&lines[12..], ["1e-16", "0.0", "1e-16"]);
}

#[tokio::test]
async fn selection_below_float_resolution_is_rejected_before_rendering() {
    let harness = Harness::new(ECHO_RENDERER, 1);
    let previous = Viewport::new(1.0, 1.0 + 4.0 * f64::EPSILON, 0.0, 1.0).expect("viewport");
    let selection =
        SelectionRect::new((100.0, 100.0), (101.0, 101.0), 4000, 4000).expect("selection");

    let err = harness
        .service
        .create(FractalRequest {
            source: ViewportSource::Selection {
                previous,
                selection,
            },
            params: RenderParameters::default(),
        })
        .await
        .expect_err("collapsed viewport rejected");

    assert!(matches!(
        err,
        AppError::Render(RenderError::InvalidSelection(SelectionError::Collapsed))
    ));
    assert_eq!(err.exit_code(), 2);
    assert!(entries(&harness.work_root()).is_empty());
    assert!(entries(&harness.images_root()).is_empty());
}

#[tokio::test]
async fn clean_exit_without_image_is_no_output() {
    let harness = Harness::new(SILENT_RENDERER, 1);

    let err = harness
        .service
        .create(explicit(Viewport::default()))
        .await
        .expect_err("missing output must fail");

    assert!(matches!(
        err,
        AppError::Render(RenderError::NoOutputProduced { ref expected, .. })
            if expected == "contours.png"
    ));
    assert!(entries(&harness.work_root()).is_empty());
    assert!(entries(&harness.images_root()).is_empty());
}

#[tokio::test]
async fn failing_renderer_reports_exit_status_and_stderr() {
    let harness = Harness::new(ECHO_RENDERER, 1);
    let mut request = explicit(Viewport::default());
    request.params.iterations = NonZeroU32::new(13).expect("non-zero");

    let err = harness
        .service
        .create(request)
        .await
        .expect_err("renderer failure surfaces");
    assert_eq!(err.exit_code(), 3);

    match err {
        AppError::Render(RenderError::ExecutionFailed {
            exit_code, stderr, ..
        }) => {
            assert_eq!(exit_code, Some(7));
            assert!(stderr.contains("iteration cap rejected"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(entries(&harness.work_root()).is_empty());
}

#[tokio::test]
async fn concurrent_renders_publish_distinct_images() {
    let harness = Harness::new(ECHO_RENDERER, 2);

    let requests = (0..6).map(|step| {
        let offset = f64::from(step) * 0.1;
        let viewport = Viewport::new(-2.0 + offset, 1.0, -1.0, 1.0).expect("viewport");
        harness.service.create(explicit(viewport))
    });
    let rendered = try_join_all(requests).await.expect("all renders succeed");

    let ids: HashSet<_> = rendered.iter().map(|item| item.image.id.clone()).collect();
    assert_eq!(ids.len(), rendered.len());

    for item in &rendered {
        let lines = output_lines(&item.image.path);
        assert_eq!(lines[11], format!("{:?}", item.viewport.x_min()));
    }
    assert!(entries(&harness.work_root()).is_empty());
    assert_eq!(entries(&harness.images_root()).len(), 6);
}

#[tokio::test]
async fn replace_retires_superseded_image_after_publishing() {
    let harness = Harness::new(ECHO_RENDERER, 1);
    let first = harness
        .service
        .create(explicit(Viewport::default()))
        .await
        .expect("first render");

    let second = harness
        .service
        .replace(explicit(Viewport::default()), &first.image.url)
        .await
        .expect("replacement render");

    assert!(!first.image.path.exists());
    assert!(second.image.path.exists());
    assert!(matches!(
        second.superseded,
        Some(SupersededImage::Retired { ref id }) if *id == first.image.id
    ));
}

#[tokio::test]
async fn failed_replace_keeps_superseded_image() {
    let harness = Harness::new(ECHO_RENDERER, 1);
    let first = harness
        .service
        .create(explicit(Viewport::default()))
        .await
        .expect("first render");

    let mut request = explicit(Viewport::default());
    request.params.iterations = NonZeroU32::new(13).expect("non-zero");
    harness
        .service
        .replace(request, &first.image.id)
        .await
        .expect_err("replacement fails");

    assert!(first.image.path.exists());
    assert_eq!(entries(&harness.images_root()).len(), 1);
}

#[tokio::test]
async fn replace_of_missing_image_still_publishes() {
    let harness = Harness::new(ECHO_RENDERER, 1);

    let rendered = harness
        .service
        .replace(explicit(Viewport::default()), "/images/0-gone.png")
        .await
        .expect("render succeeds");

    assert!(rendered.image.path.exists());
    assert!(matches!(
        rendered.superseded,
        Some(SupersededImage::AlreadyAbsent { .. })
    ));
}

#[tokio::test]
async fn remove_treats_missing_image_as_done() {
    let harness = Harness::new(ECHO_RENDERER, 1);

    let outcome = harness
        .service
        .remove("1-never-published.png")
        .await
        .expect("remove succeeds");
    assert_eq!(outcome, RetireOutcome::AlreadyAbsent);

    let err = harness
        .service
        .remove("../escape.png")
        .await
        .expect_err("traversal rejected");
    assert_eq!(err.exit_code(), 2);
}
