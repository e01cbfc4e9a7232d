use std::{future::IntoFuture, pin::pin, process, sync::Arc};

use solar_leveling::{
    application::{
        access::AccessGate,
        admin::AdminPostService,
        contact::ContactService,
        error::AppError,
        posts::PostRepository,
        repos::{DocumentStore, ImageStorage, Mailer},
    },
    config::{self, StorageBackend, StoreBackend},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        mail::HttpMailer,
        storage::{LocalImageStorage, RestImageStorage},
        store::{MemoryDocumentStore, RestDocumentStore},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const TARGET: &str = "solar_leveling::server";

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
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    telemetry::init(&settings.logging)?;

    match cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()))
    {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_http_state(&settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(target: TARGET, addr = %settings.server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let signal = {
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.notify_one();
        }
    };

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .into_future();
    let grace = settings.server.graceful_shutdown;
    let deadline = async {
        shutdown.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = pin!(server) => {
            result.map_err(InfraError::from)?;
            info!(target: TARGET, "server stopped");
        }
        () = pin!(deadline) => {
            warn!(
                target: TARGET,
                timeout_secs = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
        }
    }

    Ok(())
}

fn build_http_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let store: Arc<dyn DocumentStore> = match &settings.store.backend {
        StoreBackend::Memory => {
            warn!(target: TARGET, "using the in-memory document store; posts are not persisted");
            Arc::new(MemoryDocumentStore::new())
        }
        StoreBackend::Rest { base_url, auth } => Arc::new(RestDocumentStore::new(
            base_url.clone(),
            auth.clone(),
            settings.store.timeout,
        )?),
    };
    let posts = PostRepository::new(store);

    let (images, uploads) = match &settings.storage.backend {
        StorageBackend::Local { directory } => {
            let local =
                Arc::new(LocalImageStorage::new(directory.clone()).map_err(InfraError::from)?);
            let images: Arc<dyn ImageStorage> = local.clone();
            (images, Some(local))
        }
        StorageBackend::Rest { bucket_url, token } => {
            let images: Arc<dyn ImageStorage> = Arc::new(RestImageStorage::new(
                bucket_url.clone(),
                token.clone(),
                settings.store.timeout,
            )?);
            (images, None)
        }
    };

    let mail = &settings.mail;
    let mailer = HttpMailer::new(
        mail.relay_url.clone(),
        mail.api_key.clone(),
        mail.from.clone(),
        mail.to.clone(),
        mail.timeout,
    )?;
    if !mailer.is_configured() {
        warn!(target: TARGET, "mail relay is not configured; contact submissions will fail");
    }
    let mailer: Arc<dyn Mailer> = Arc::new(mailer);

    let admin = &settings.admin;
    let gate = AccessGate::new(
        time::Duration::hours(i64::from(admin.session_ttl_hours.get())),
        admin.session_secret.clone(),
        admin.password.clone(),
    );
    if !gate.login_enabled() {
        info!(target: TARGET, "admin password not configured; /login is disabled");
    }

    Ok(HttpState {
        admin: Arc::new(AdminPostService::new(posts.clone(), images)),
        posts,
        contact: Arc::new(ContactService::new(mailer, settings.site.name.clone())),
        gate: Arc::new(gate),
        uploads,
        site: Arc::new(settings.site.clone()),
        upload_body_limit: usize::try_from(settings.storage.max_request_bytes.get())
            .unwrap_or(usize::MAX),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: TARGET, error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target: TARGET, error = %err, "failed to listen for SIGTERM");
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

    info!(target: TARGET, "shutdown signal received");
}
