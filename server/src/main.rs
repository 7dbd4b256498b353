use axum::routing::get;
use axum::Router;
use soccer_server::config::ServerConfig;
use soccer_server::ws::{ws_handler, AppState};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("SOCCER_LISTEN_ADDR") {
        config.listen_addr = addr;
    }
    if let Some(seed) = std::env::var("SOCCER_SEED").ok().and_then(|s| s.parse().ok()) {
        config.rng_seed = seed;
    }

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    tracing::info!(
        "Tick {} Hz, frames {} Hz, up to {} matches",
        config.tick_rate_hz,
        config.frame_rate_hz,
        config.max_sessions
    );

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(config));

    tracing::info!("Starting soccer server on {}", listen_addr);
    println!("Soccer server listening on {}", listen_addr);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
