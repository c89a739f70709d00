mod cli;

use std::sync::Arc;

use anyhow::Context;
use burrow_core::{Repository, Shortener};
use burrow_gateway::{App, AppState, TokenSigner};
use burrow_generator::RandomGenerator;
use burrow_shortener::ShortenerService;
use burrow_storage::{FileRepository, InMemoryRepository, PostgresRepository};
use clap::Parser;
use rand::RngCore;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cli::{StorageBackend, CLI};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    burrow_gateway::telemetry::init(config.log_format)?;

    let backend = config.storage_backend();
    info!(
        server_address = %config.server_address,
        base_url = %config.base_url,
        storage_backend = ?backend,
        "starting burrow HTTP server"
    );

    let shortener: Arc<dyn Shortener> = match backend {
        StorageBackend::Postgres { dsn } => {
            let repository = PostgresRepository::connect(&dsn, &config.postgres_options())
                .await
                .context("failed to connect to postgres")?;
            build_shortener(repository, &config)
        }
        StorageBackend::File { path } => {
            let repository = FileRepository::open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            build_shortener(repository, &config)
        }
        StorageBackend::Memory => build_shortener(InMemoryRepository::new(), &config),
    };

    let state = AppState::new(shortener.clone(), &config.base_url, signer(&config));
    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = shortener.close().await {
        error!(error = %err, "failed to close storage");
    }
    info!("server stopped");

    Ok(())
}

fn build_shortener<R: Repository>(repository: R, config: &CLI) -> Arc<dyn Shortener> {
    let generator = RandomGenerator::with_length(config.code_length);
    Arc::new(ShortenerService::new(repository, generator).with_max_attempts(config.max_attempts))
}

fn signer(config: &CLI) -> TokenSigner {
    match config.auth_secret.as_deref().filter(|secret| !secret.is_empty()) {
        Some(secret) => TokenSigner::new(secret.as_bytes()),
        None => {
            warn!("AUTH_SECRET is not set; identities will not survive a restart");
            let mut secret = [0u8; 32];
            rand::rng().fill_bytes(&mut secret);
            TokenSigner::new(&secret)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
