use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use wikiroster_server::routes;
use wikiroster_server::state::AppState;
use wikiroster_store::JsonRecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wikiroster=info".parse()?))
        .with_target(false)
        .init();

    let data_dir = std::env::var("WIKIROSTER_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let port = std::env::var("WIKIROSTER_PORT").unwrap_or_else(|_| "5001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let state = Arc::new(AppState {
        store: JsonRecordStore::new(&data_dir),
    });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    tracing::info!("Serving records from {data_dir} on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}
