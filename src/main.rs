mod config;
mod db;
mod error;
mod ingest;
mod models;
mod routes;
mod sources;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config};
use crate::ingest::postgres::PgStore;
use crate::ingest::runner::SourceRunner;
use crate::ingest::store::SourceRegistry;
use crate::routes::api::AppState;
use crate::sources::FetcherSet;

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: PgPool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobboard_ingest=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    let store = Arc::new(PgStore::new(pool.clone()));
    let runner = Arc::new(SourceRunner::new(
        store.clone(),
        store.clone(),
        FetcherSet::http()?,
        config.runner_settings(),
    ));

    match config.resolved_command() {
        Command::RunAll => {
            let records = runner.run_all().await?;
            tracing::info!("Ran {} sources", records.len());
        }
        Command::Run { source } => {
            let source = store
                .get_source(source)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Job source {source} not found"))?;
            if !source.is_enabled {
                anyhow::bail!("Job source {} is disabled", source.id);
            }
            let record = runner.run_source(&source).await;
            tracing::info!("Source {} finished with {}", source.id, record.status);
        }
        Command::Serve { listen_addr } => {
            let state = AppState {
                runner,
                registry: store.clone(),
                store,
                health: config.health_evaluator(),
            };

            let readyz_pool = pool.clone();
            let app = Router::new()
                .route("/healthz", get(healthz))
                .route("/readyz", get(move || readyz(readyz_pool.clone())))
                .merge(routes::api::router(state))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
            tracing::info!("Listening on {listen_addr}");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
