use std::{process, sync::Arc};

use fractscope::{
    application::{
        error::AppError,
        fractals::{FractalRequest, FractalService, ViewportSource},
        render::{RenderError, RenderOrchestrator, RenderPool, RendererTable},
    },
    config::{self, Command, Settings},
    infra::{error::InfraError, images::ImageStore, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        Command::Check(_) => run_check(&settings),
        Command::Render(args) => {
            let viewport = args.viewport.to_viewport()?;
            let request = FractalRequest {
                source: ViewportSource::Explicit(viewport),
                params: args.params.to_parameters()?,
            };
            run_fractal(&settings, request, args.supersedes.as_deref()).await
        }
        Command::Zoom(args) => {
            let previous = args.previous.to_viewport()?;
            let selection = args.selection.to_selection().map_err(RenderError::from)?;
            let request = FractalRequest {
                source: ViewportSource::Selection {
                    previous,
                    selection,
                },
                params: args.params.to_parameters()?,
            };
            run_fractal(&settings, request, args.supersedes.as_deref()).await
        }
        Command::Retire(args) => {
            let store = build_image_store(&settings)?;
            let outcome = store.retire(&args.reference).await?;
            print_json(&outcome)
        }
    }
}

fn run_check(settings: &Settings) -> Result<(), AppError> {
    let table = build_renderer_table(settings);
    table.validate()?;

    #[derive(Serialize)]
    struct ResolvedRenderer {
        tier: String,
        bits: u32,
        program: String,
    }

    let resolved: Vec<ResolvedRenderer> = table
        .active()
        .into_iter()
        .map(|(tier, path)| ResolvedRenderer {
            tier: tier.to_string(),
            bits: tier.bits(),
            program: path.display().to_string(),
        })
        .collect();

    info!(
        target = "fractscope::check",
        renderers = resolved.len(),
        "Renderer executables validated"
    );
    print_json(&resolved)
}

async fn run_fractal(
    settings: &Settings,
    request: FractalRequest,
    supersedes: Option<&str>,
) -> Result<(), AppError> {
    let service = build_fractal_service(settings)?;

    let rendered = match supersedes {
        Some(reference) => service.replace(request, reference).await?,
        None => service.create(request).await?,
    };

    print_json(&rendered)
}

fn build_renderer_table(settings: &Settings) -> RendererTable {
    RendererTable::new(
        &settings.render.renderer_dir,
        &settings.render.executable_stem,
    )
}

fn build_image_store(settings: &Settings) -> Result<Arc<ImageStore>, AppError> {
    let store = ImageStore::new(
        settings.images.directory.clone(),
        &settings.images.public_base,
    )
    .map_err(InfraError::from)?;
    Ok(Arc::new(store))
}

fn build_fractal_service(settings: &Settings) -> Result<FractalService, AppError> {
    let table = build_renderer_table(settings);
    table.validate()?;

    let orchestrator = RenderOrchestrator::new(
        table,
        settings.render.work_dir.clone(),
        settings.render.output_file.clone(),
    )?;
    let pool = RenderPool::new(Arc::new(orchestrator), settings.render.concurrency);

    Ok(FractalService::new(
        pool,
        build_image_store(settings)?,
        settings.precision,
        settings.viewport.mapping,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode result: {err}")))?;
    println!("{rendered}");
    Ok(())
}
