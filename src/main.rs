use std::{process, sync::Arc};

use exhibition::{
    application::{
        Contributor, Exhibition, ExhibitionOptions, Publisher, PublisherConfig, RenderSurface,
        error::AppError,
    },
    config::{self, Command, Settings},
    infra::{
        error::InfraError,
        http::{self, PreviewState},
        sources::SourceContributor,
        surface::{DirectorySurface, MemorySurface},
        telemetry,
        transpiler::{CommandTranspiler, Transpiler},
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command.unwrap_or_default() {
        Command::Render(_) => run_render(settings).await,
        Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_render(settings: Settings) -> Result<(), AppError> {
    let surface =
        DirectorySurface::new(&settings.output.directory).map_err(InfraError::from)?;
    let surface = Arc::new(surface);
    let exhibition = build_exhibition(&settings, Arc::clone(&surface) as Arc<dyn RenderSurface>)?;

    let report = exhibition.request_update().await?;
    info!(
        op = "main::render",
        result = "ok",
        handle = %report.handle,
        index = %surface.index_path().display(),
        contributions = report.contributions,
        "Preview rendered"
    );
    Ok(())
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let surface = Arc::new(MemorySurface::default());
    let exhibition = Arc::new(build_exhibition(
        &settings,
        Arc::clone(&surface) as Arc<dyn RenderSurface>,
    )?);

    match exhibition.start().await {
        Ok(Some(report)) => info!(
            op = "main::serve",
            result = "ok",
            handle = %report.handle,
            contributions = report.contributions,
            "Initial preview rendered"
        ),
        Ok(None) => info!(
            op = "main::serve",
            result = "skipped",
            "Initial render disabled"
        ),
        // `POST /update` retries once the sources are fixed
        Err(err) => warn!(
            op = "main::serve",
            result = "error",
            error = %err,
            "Initial render failed; serving without a preview"
        ),
    }

    http::serve(settings.server.addr, PreviewState { exhibition, surface }).await?;
    Ok(())
}

fn build_exhibition(
    settings: &Settings,
    surface: Arc<dyn RenderSurface>,
) -> Result<Exhibition, AppError> {
    let transpiler = settings.transpiler.as_ref().map(|transpiler| {
        Arc::new(CommandTranspiler::new(
            transpiler.command.clone(),
            transpiler.args.clone(),
        )) as Arc<dyn Transpiler>
    });

    let contributors = settings
        .sources
        .iter()
        .map(|source| {
            SourceContributor::new(
                source.name.clone(),
                source.text.clone(),
                source.options.clone(),
                transpiler.clone(),
            )
            .map(|contributor| Arc::new(contributor) as Arc<dyn Contributor>)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let publisher = Arc::new(Publisher::new(
        surface,
        PublisherConfig {
            settle_timeout: settings.publisher.settle_timeout,
        },
    ));
    let options = ExhibitionOptions {
        refresh_on_init: settings.publisher.refresh_on_init,
        refresh_on_add: settings.publisher.refresh_on_add,
    };
    Ok(Exhibition::with_contributors(publisher, options, contributors))
}
