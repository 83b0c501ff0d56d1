// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Static asset serving for single-page applications

use std::path::Path;

use axum::{Router, middleware};
use tower_http::services::ServeDir;

use crate::{catching::catching_middleware, spa::spa_fallback_middleware};

/// File server for a single-page application bundle
///
/// Serves the files under `root` and answers browser navigations with the
/// root document (`index.html`). Requests run through the catching
/// middleware first, then the SPA fallback, then the file server, so body
/// failures of the served files are logged. Caching and range headers come
/// from [`ServeDir`] unmodified.
pub fn static_asset_handler(root: impl AsRef<Path>) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn(spa_fallback_middleware))
        .layer(middleware::from_fn(catching_middleware))
}
