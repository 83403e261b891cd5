use tracing::info;
use tracing_subscriber::EnvFilter;

use clubcourt_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clubcourt_server=debug")),
        )
        .init();

    let config = ServerConfig::from_env();
    let (app, _state) = clubcourt_server::build_app(&config)
        .await
        .expect("Failed to initialize database");

    let addr = config.bind_addr();
    info!(%addr, database = %config.database_url, "listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
