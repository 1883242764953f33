use session_lab::{app, AppState, InsecureSessionRepository, LabConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_lab=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LabConfig::from_env();
    info!(
        bind_addr = %config.bind_addr,
        session_store = %config.session_store_path.display(),
        "Starting session lab server"
    );

    // Sessions live only in this process; the audit file is never read back
    let session_repository = Arc::new(InsecureSessionRepository::new(
        config.session_store_path.clone(),
    ));
    let app_state = AppState::new(session_repository);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app(app_state)).await
}
