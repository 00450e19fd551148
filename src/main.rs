use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use axum::http::Uri;
use storefront::{
    application::error::AppError,
    cache::{CacheConfig, CacheKey, CacheState},
    config::{self, ClassifyArgs, Command, ServeArgs, Settings},
    infra::{
        assets::StaticAssets,
        error::InfraError,
        http::{AppState, build_router},
        telemetry,
        upstream::UpstreamRenderer,
    },
};
use tokio::{net::TcpListener, sync::watch};
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

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));

    match command {
        Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        Command::Classify(args) => run_classify(&settings, &args),
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let renderer = Arc::new(UpstreamRenderer::new(&settings.render)?);
    let upstream = renderer.base().clone();

    let cache = CacheState::new(CacheConfig::from(&settings.cache), renderer);
    let assets = Arc::new(StaticAssets::from(&settings.assets));

    info!(
        target = "storefront::serve",
        addr = %settings.server.addr,
        upstream = %upstream,
        assets = %assets.root().display(),
        cache_enabled = cache.config.enabled,
        ttl_secs = cache.config.ttl.as_secs(),
        private_prefixes = ?cache.config.private_routes.prefixes(),
        "SSR cache ready, private routes skip cache"
    );

    let router = build_router(AppState { cache, assets });
    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    serve_until_shutdown(listener, router, settings.server.graceful_shutdown).await
}

/// Serve until a shutdown signal arrives, then drain for at most `grace`.
async fn serve_until_shutdown(
    listener: TcpListener,
    router: axum::Router,
    grace: Duration,
) -> Result<(), AppError> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .into_future();

    let drain_deadline = async move {
        let _ = shutdown_rx.wait_for(|fired| *fired).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        () = drain_deadline => {
            warn!(
                target = "storefront::serve",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!(target = "storefront::serve", "shutdown signal received");
}

fn run_classify(settings: &Settings, args: &ClassifyArgs) -> Result<(), AppError> {
    let uri: Uri = args
        .url
        .parse()
        .map_err(|err| AppError::unexpected(format!("invalid URL `{}`: {err}", args.url)))?;

    let config = CacheConfig::from(&settings.cache);
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    let label = if config.private_routes.is_private(target) {
        "private"
    } else {
        "cacheable"
    };

    println!("{label}\t{}", CacheKey::from_uri(&uri));
    Ok(())
}
