// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Single-page application fallback
//!
//! A single-page application routes on the client, so every deep link the
//! browser navigates to has to be answered with the same entry document. The
//! backend still has to serve concrete assets and API calls as they are.
//!
//! The two are told apart by a heuristic borrowed from the development proxy
//! of Create React App: a `GET` request whose `Accept` header lists
//! `text/html` is a browser navigation, and its path is rewritten to `/`.
//! Everything else passes through untouched.

use axum::{
    extract::Request,
    http::{HeaderMap, Method, Uri, header, uri::PathAndQuery},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

const HTML_MEDIA_TYPE: &str = "text/html";

/// One media range of an `Accept` header, in the order the client sent it
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptPreference {
    /// Lower-cased media range, e.g. `text/html` or `*/*`
    pub media_range: String,
    /// Relative quality factor, `1.0` when absent or malformed
    pub quality: f32,
}

impl AcceptPreference {
    /// Parse every `Accept` header value into an ordered preference list
    pub fn parse_all(headers: &HeaderMap) -> Vec<Self> {
        headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(Self::parse)
            .collect()
    }

    fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.split(';');
        let media_range = parts.next()?.trim().to_ascii_lowercase();
        if media_range.is_empty() {
            return None;
        }

        let quality = parts
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .unwrap_or(1.0);

        Some(Self {
            media_range,
            quality,
        })
    }
}

/// Whether the request is a browser navigation that should get the entry document
pub fn is_navigation_request<B>(request: &axum::http::Request<B>) -> bool {
    if request.method() != Method::GET {
        return false;
    }

    AcceptPreference::parse_all(request.headers())
        .iter()
        .any(|preference| preference.media_range == HTML_MEDIA_TYPE)
}

/// Middleware that points browser navigations at the application root
pub async fn spa_fallback_middleware(mut request: Request, next: Next) -> Response {
    if is_navigation_request(&request) {
        rewrite_path_to_root(&mut request);
    }
    next.run(request).await
}

/// Replace the request path with `/`, keeping the query string
fn rewrite_path_to_root<B>(request: &mut axum::http::Request<B>) {
    let original = request.uri().clone();
    let path_and_query = match original.query() {
        Some(query) => format!("/?{query}"),
        None => "/".to_string(),
    };

    let mut parts = original.clone().into_parts();
    parts.path_and_query = match PathAndQuery::try_from(path_and_query) {
        Ok(path_and_query) => Some(path_and_query),
        Err(err) => {
            warn!(uri = %original, error = %err, "unable to rewrite the request path");
            return;
        }
    };

    match Uri::from_parts(parts) {
        Ok(uri) => {
            debug!(from = %original.path(), "serving the application entry point");
            *request.uri_mut() = uri;
        }
        Err(err) => warn!(uri = %original, error = %err, "unable to rewrite the request path"),
    }
}
