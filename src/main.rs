use std::{net::SocketAddr, sync::Arc};

use texmark::server::{load_content, router, start_content_watcher, AppState, RouterState};
use texmark::Config;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    let is_development = config.server.development;
    info!("RUST_ENV is set to development: {}", is_development);

    let content = load_content(&config.server.content_dir, &config.transform_options())
        .await
        .expect("Failed to load initial content files");
    let state = Arc::new(AppState::new(content, &config).expect("Failed to build application state"));

    // Hot-reload setup
    let (tx, _rx) = broadcast::channel(1);
    if is_development {
        info!("Hot reload enabled. Check logs for file change events.");
        start_content_watcher(tx.clone(), state.clone());
    }

    let app = router(RouterState {
        app_state: state,
        broadcaster: tx,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await.expect("Failed to bind address");
    axum::serve(listener, app).await.expect("Server error");
}
