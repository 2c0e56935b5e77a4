//! # civic-board server
//!
//! Assembles the application from configuration: store, media host and
//! credential adapters are chosen at startup, then served over axum.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState, Ports, RouterOptions};
use auth_adapters::{Argon2PasswordHasher, JwtCredentialService};
use configs::{DatabaseBackend, LogSettings, MediaBackend, Settings};
use domains::ports::{CommentRepo, MediaStorage, ProblemRepo, SolutionRepo, UserRepo};
use secrecy::ExposeSecret;
use storage_adapters::InMemoryStore;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// The four repository ports, usually backed by one store.
struct Repos {
    users: Arc<dyn UserRepo>,
    problems: Arc<dyn ProblemRepo>,
    solutions: Arc<dyn SolutionRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl Repos {
    fn from_store<T>(store: Arc<T>) -> Self
    where
        T: UserRepo + ProblemRepo + SolutionRepo + CommentRepo + 'static,
    {
        Self {
            users: store.clone(),
            problems: store.clone(),
            solutions: store.clone(),
            comments: store,
        }
    }
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "db-postgres")]
async fn postgres_repos(settings: &Settings) -> anyhow::Result<Repos> {
    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url is not set")?;
    let store =
        storage_adapters::PgContentStore::connect(url.expose_secret(), settings.database.max_connections)
            .await?;
    store.migrate().await?;
    info!("connected to postgres");
    Ok(Repos::from_store(Arc::new(store)))
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres_repos(_: &Settings) -> anyhow::Result<Repos> {
    anyhow::bail!("this build does not include the db-postgres feature")
}

async fn build_repos(settings: &Settings) -> anyhow::Result<Repos> {
    match settings.database.backend {
        DatabaseBackend::Memory => {
            warn!("using the in-memory store; data is lost on restart");
            Ok(Repos::from_store(Arc::new(InMemoryStore::new())))
        }
        DatabaseBackend::Postgres => postgres_repos(settings).await,
    }
}

#[cfg(feature = "media-local")]
async fn local_media(settings: &Settings) -> anyhow::Result<Arc<dyn MediaStorage>> {
    let media = &settings.media;
    tokio::fs::create_dir_all(&media.local_root)
        .await
        .with_context(|| format!("creating {}", media.local_root.display()))?;
    Ok(Arc::new(storage_adapters::media::LocalMediaStorage::new(
        media.local_root.clone(),
        media.public_url_prefix.clone(),
    )))
}

#[cfg(not(feature = "media-local"))]
async fn local_media(_: &Settings) -> anyhow::Result<Arc<dyn MediaStorage>> {
    anyhow::bail!("this build does not include the media-local feature")
}

#[cfg(feature = "media-cloudinary")]
fn cloudinary_media(settings: &Settings) -> anyhow::Result<Arc<dyn MediaStorage>> {
    let c = settings
        .media
        .cloudinary
        .as_ref()
        .context("media.cloudinary is not set")?;
    Ok(Arc::new(storage_adapters::media::CloudinaryMediaStorage::new(
        c.cloud_name.clone(),
        c.api_key.clone(),
        c.api_secret.clone(),
    )))
}

#[cfg(not(feature = "media-cloudinary"))]
fn cloudinary_media(_: &Settings) -> anyhow::Result<Arc<dyn MediaStorage>> {
    anyhow::bail!("this build does not include the media-cloudinary feature")
}

async fn build_media(settings: &Settings) -> anyhow::Result<Arc<dyn MediaStorage>> {
    match settings.media.backend {
        MediaBackend::Local => local_media(settings).await,
        MediaBackend::Cloudinary => cloudinary_media(settings),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    let repos = build_repos(&settings).await?;
    let media = build_media(&settings).await?;

    let ttl = chrono::Duration::seconds(settings.auth.token_ttl_secs);
    let credentials =
        JwtCredentialService::new(settings.auth.jwt_secret.expose_secret().as_bytes(), ttl);

    let state = AppState::new(Ports {
        users: repos.users,
        problems: repos.problems,
        solutions: repos.solutions,
        comments: repos.comments,
        media,
        hasher: Arc::new(Argon2PasswordHasher::new()),
        credentials: Arc::new(credentials),
    });

    let static_media = (settings.media.backend == MediaBackend::Local).then(|| {
        (
            settings.media.public_url_prefix.clone(),
            settings.media.local_root.clone(),
        )
    });
    let app = router(
        state,
        RouterOptions {
            max_body_bytes: settings.server.max_body_bytes,
            static_media,
        },
    );

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "civic-board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
