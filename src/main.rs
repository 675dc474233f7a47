mod config;
mod db;
mod entities;
mod error;
mod ingest;
mod models;
mod routes;
mod store;

use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{config::Config, store::ResourceStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ResourceStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,mediashelf=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = ResourceStore::new(db);

    let state = Arc::new(AppState { config: config.clone(), store });

    let app = Router::new()
        .route("/api/resources", get(routes::list_resources).post(routes::create_resources))
        .route("/api/resources/{id}", delete(routes::delete_resource))
        .route("/api/upload-xlsx", post(routes::upload_spreadsheet))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_request_bytes))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // The configured port is a soft preference; fall back once if it is taken.
    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::AddrInUse => {
            tracing::warn!(
                addr = %config.addr,
                fallback = %config.fallback_addr,
                "port in use, binding fallback"
            );
            TcpListener::bind(config.fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
