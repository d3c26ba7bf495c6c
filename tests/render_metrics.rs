#![cfg(unix)]

use std::{collections::HashSet, fs, num::NonZeroU32, os::unix::fs::PermissionsExt, sync::Arc};

use fractscope::{
    application::{
        fractals::{FractalRequest, FractalService, ViewportSource},
        render::{Platform, RenderOrchestrator, RenderPool, RendererTable},
    },
    domain::{
        params::RenderParameters,
        precision::PrecisionThresholds,
        viewport::{MappingMode, Viewport},
    },
    infra::{images::ImageStore, telemetry},
};
use metrics_util::debugging::DebuggingRecorder;
use tempfile::TempDir;

#[tokio::test]
async fn render_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let root = TempDir::new().expect("temp dir");
    let bin = root.path().join("renderer");
    fs::create_dir_all(&bin).expect("renderer dir");
    for bits in [64, 80, 128] {
        let path = bin.join(format!("mandelbrot-{bits}"));
        fs::write(&path, "#!/bin/sh\nprintf 'png' > contours.png\n").expect("write renderer");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    let table = RendererTable::for_platform(&bin, "mandelbrot", Platform::Unix);
    let orchestrator = RenderOrchestrator::new(table, root.path().join("work"), "contours.png")
        .expect("orchestrator");
    let pool = RenderPool::new(Arc::new(orchestrator), NonZeroU32::MIN);
    let images = ImageStore::new(root.path().join("images"), "/images").expect("image store");
    let service = FractalService::new(
        pool,
        Arc::new(images),
        PrecisionThresholds::default(),
        MappingMode::AspectPreserving,
    );

    let rendered = service
        .create(FractalRequest {
            source: ViewportSource::Explicit(Viewport::default()),
            params: RenderParameters::default(),
        })
        .await
        .expect("render succeeds");
    service.remove(&rendered.image.url).await.expect("retire");
    service.remove(&rendered.image.id).await.expect("retire again");

    let keys: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, _)| key.key().name().to_string())
        .collect();

    for expected in [
        "fractscope_render_total",
        "fractscope_render_ms",
        "fractscope_image_published_total",
        "fractscope_image_retired_total",
        "fractscope_image_retire_missing_total",
    ] {
        assert!(keys.contains(expected), "missing metric key {expected}");
    }
}
