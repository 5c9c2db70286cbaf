mod config;
mod cv;
mod errors;
mod models;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::cv::artifacts::ArtifactStorage;
use crate::cv::compiler::LatexCompiler;
use crate::cv::store::DocumentStore;
use crate::cv::templates::TemplateCatalog;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::prepare_storage;

const STATIC_CV_NAME: &str = "Curriculum Vitae";
/// Fixed artifact name for `CV_STATIC_PDF`, so restarts replace one copy.
const STATIC_CV_ARTIFACT: &str = "static_cv.pdf";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparseable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Storage directories
    let layout = prepare_storage(&config.storage_root).await?;
    let artifacts = ArtifactStorage::new(&layout.pdf_dir);

    // Templates and document store
    let templates = TemplateCatalog::builtin();
    let store = DocumentStore::new(
        &layout.source_dir,
        templates.default_template().source_text.clone(),
    );
    info!(
        "Template catalog loaded ({} templates)",
        templates.list().len()
    );

    if let Some(static_pdf) = &config.static_cv_pdf {
        seed_static_cv(&store, &artifacts, static_pdf).await?;
    }

    // LaTeX compiler
    let compiler = LatexCompiler::new(config.latex.clone(), artifacts.clone());
    info!(
        "LaTeX compiler: {} ({} passes, {}s timeout)",
        config.latex.program,
        config.latex.passes,
        config.latex.timeout.as_secs()
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        store: Arc::new(store),
        compiler: Arc::new(compiler),
        templates: Arc::new(templates),
        artifacts,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Folio API stopped");
    Ok(())
}

/// Publishes a pre-built PDF as the active CV so the site has something to
/// serve before the first compile.
async fn seed_static_cv(
    store: &DocumentStore,
    artifacts: &ArtifactStorage,
    static_pdf: &std::path::Path,
) -> Result<()> {
    if !tokio::fs::try_exists(static_pdf).await.unwrap_or(false) {
        warn!(
            "CV_STATIC_PDF {} does not exist; skipping seed",
            static_pdf.display()
        );
        return Ok(());
    }

    let artifact = artifacts
        .commit_as(static_pdf, STATIC_CV_ARTIFACT)
        .await
        .with_context(|| format!("Failed to import {}", static_pdf.display()))?;
    if let Some(doc) = store.seed_published(STATIC_CV_NAME, artifact).await? {
        info!(
            "Initialized default CV {} from {}",
            doc.id,
            static_pdf.display()
        );
    }
    Ok(())
}

/// Restricts CORS to `FRONTEND_URL` when set; permissive otherwise.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    match &config.frontend_url {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("FRONTEND_URL '{origin}' is not a valid origin"))?;
            Ok(CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None => Ok(CorsLayer::permissive()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
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
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_restarts_reuse_the_static_cv_copy() {
        let root = tempfile::tempdir().unwrap();
        let layout = prepare_storage(root.path()).await.unwrap();
        let static_pdf = root.path().join("cv.pdf");
        std::fs::write(&static_pdf, b"%PDF-static").unwrap();
        let artifacts = ArtifactStorage::new(&layout.pdf_dir);

        for _ in 0..3 {
            let store = DocumentStore::new(&layout.source_dir, "");
            seed_static_cv(&store, &artifacts, &static_pdf).await.unwrap();
            let active = store.active().await.unwrap();
            assert_eq!(active.artifact.as_deref(), Some(STATIC_CV_ARTIFACT));
        }

        let copies = std::fs::read_dir(&layout.pdf_dir).unwrap().count();
        assert_eq!(copies, 1);
    }
}
