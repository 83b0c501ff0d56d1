// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Single-page app server
//!
//! Serves a built single-page application from the configured directory next
//! to a small JSON API, and shuts down gracefully on interrupt signals.

use std::path::Path;

use anyhow::Result;
use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use httputils::{
    HttpServer, JsonBody, JsonError, ServerConfig, ShutdownRunner, redirect,
    respond_with_logged_error, scan_path_parameter, static_asset_handler, write_json,
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        environment = %config.environment,
        static_dir = %config.static_dir.display(),
        "Starting single-page app server",
    );

    let server = HttpServer::from_config(&config, app(&config.static_dir)).await?;
    info!(address = %server.local_addr(), "listening");

    let runner = ShutdownRunner::new(config.shutdown_config());
    if !runner.run(&server).await {
        error!("server did not stop cleanly");
        std::process::exit(1);
    }

    Ok(())
}

fn app(static_dir: &Path) -> Router {
    Router::new()
        .route("/api/echo", post(echo))
        .route("/api/items/{id}", get(item))
        .route("/index.html", get(index_redirect))
        .fallback_service(static_asset_handler(static_dir))
        .layer(TraceLayer::new_for_http())
}

async fn echo(payload: Result<JsonBody<Value>, JsonError>) -> Response {
    let result = payload.and_then(|JsonBody(value)| write_json(StatusCode::OK, &value));
    result.unwrap_or_else(|err| respond_with_logged_error(&err, err.status_code()))
}

async fn item(request: Request) -> Response {
    let (mut parts, _) = request.into_parts();
    match scan_path_parameter::<u64>(&mut parts, "id").await {
        Ok(id) => write_json(StatusCode::OK, &json!({ "id": id }))
            .unwrap_or_else(|err| respond_with_logged_error(&err, err.status_code())),
        Err(err) => respond_with_logged_error(&err, err.status_code()),
    }
}

async fn index_redirect(request: Request) -> impl IntoResponse {
    redirect(&request, "./", StatusCode::MOVED_PERMANENTLY)
}
