use std::{path::Path, process, time::Duration};

use mdtoggle::{
    application::{
        convert::{ComrakMarkdown, HtmlToMarkdown, Html5everMarkdown, MarkdownRenderer, autop},
        error::AppError,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HostState},
        seed::{self, SeedContent},
        telemetry,
    },
};
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const BUNDLED_SEED: &str = include_str!("../content/posts.toml");

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Convert(args) => run_convert(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    if settings.security.nonce_secret_generated {
        warn!(
            target = "mdtoggle::bootstrap",
            "no nonce secret configured; tokens will not survive a restart"
        );
    }

    let content = load_content(&settings).await?;
    info!(
        target = "mdtoggle::bootstrap",
        posts = content.posts.len(),
        "content loaded"
    );

    let state = HostState::build(&settings, content);
    let public_router = http::build_router(state.clone());
    let admin_router = http::build_admin_router(state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "mdtoggle::bootstrap",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    let servers = async { try_join!(public_server, admin_server) };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!(
                target = "mdtoggle::bootstrap",
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "shutdown requested"
            );
            let _ = shutdown_tx.send(true);
            drain(servers, settings.server.graceful_shutdown).await?;
        }
    }

    Ok(())
}

async fn drain<F>(servers: F, grace: Duration) -> Result<(), AppError>
where
    F: Future<Output = Result<((), ()), std::io::Error>>,
{
    match tokio::time::timeout(grace, servers).await {
        Ok(result) => result
            .map(|_| ())
            .map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "mdtoggle::bootstrap",
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn load_content(settings: &config::Settings) -> Result<SeedContent, AppError> {
    match settings.content.seed_file.as_deref() {
        Some(path) => Ok(seed::load_seed_file(path).await?),
        None => Ok(seed::parse_seed(BUNDLED_SEED)?),
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let markdown = read_input(&args.file).await?;
    let renderer = if settings.markdown.sanitize {
        ComrakMarkdown::sanitized()
    } else {
        ComrakMarkdown::new()
    };

    let html = renderer
        .to_html(&markdown)
        .map_err(|err| AppError::validation(err.to_string()))?;
    print!("{html}");
    Ok(())
}

async fn run_convert(settings: config::Settings, args: config::ConvertArgs) -> Result<(), AppError> {
    let html = read_input(&args.file).await?;
    let converter = Html5everMarkdown::new(settings.markdown.heading_style);

    let markdown = converter
        .to_markdown(&autop(&html))
        .map_err(|err| AppError::validation(err.to_string()))?;
    print!("{markdown}");
    Ok(())
}

async fn read_input(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))
}
