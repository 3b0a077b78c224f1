// demos/catalog_server.rs

// A stand-in for the catalog API: one books route behind the rate limiter.
//
//   LIMITER_RPS=1 LIMITER_BURST=3 cargo run --example catalog_server
//   for i in $(seq 5); do curl -si localhost:4000/v1/books | head -1; done

use axum::{Json, Router, routing::get};
use serde_json::json;
use shelf_limiter::{LimiterConfig, RateLimitLayer, RateLimiter, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = LimiterConfig::from_env()?;
    info!(
        enabled = config.is_enabled(),
        rps = config.requests_per_second(),
        burst = config.burst_capacity(),
        "rate limiter configured"
    );

    let limiter = Arc::new(RateLimiter::<String, _>::with_config(config, SystemClock)?);
    let janitor = limiter.spawn_janitor();

    let app = Router::new()
        .route("/v1/books", get(|| async { Json(json!({ "books": [] })) }))
        .layer(RateLimitLayer::new(Arc::clone(&limiter)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:4000").await?;
    info!(addr = %listener.local_addr()?, "catalog server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    janitor.shutdown().await;
    info!("catalog server stopped");
    Ok(())
}
