// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Redirect responses
//!
//! Builds a redirect the way browsers expect it from a classic file server:
//! relative targets are resolved against the directory of the request path,
//! the `Location` header is ASCII-only, and `GET` requests get a short HTML
//! body linking to the new location.
//!
//! The response is built eagerly and carries no write tracking of its own.
//! Mount the route behind [`catching_middleware`](crate::catching::catching_middleware)
//! to have failures while the body is sent logged.

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, header},
    response::Response,
};
use percent_encoding::{CONTROLS, utf8_percent_encode};
use url::{ParseError, Url};

use crate::error::respond_with_logged_error;

/// Build a redirect to `location` for the given request
///
/// `location` may be absolute (`https://example.com/two`), rooted (`/two`)
/// or relative to the current directory (`../two`, `two?x=1`).
pub fn redirect<B>(request: &Request<B>, location: &str, status: StatusCode) -> Response {
    let target = if is_scheme_or_host_relative(location) {
        location.to_string()
    } else {
        resolve_local(request.uri().path(), location)
    };

    let escaped = escape_non_ascii(&target);
    let location_value = match HeaderValue::from_str(&escaped) {
        Ok(value) => value,
        Err(err) => return respond_with_logged_error(&err, StatusCode::INTERNAL_SERVER_ERROR),
    };

    let method = request.method();
    let body = if method == Method::GET {
        Body::from(format!(
            "<a href=\"{}\">{}</a>.\n\n",
            escape_html(&target),
            status.canonical_reason().unwrap_or_default()
        ))
    } else {
        Body::empty()
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(header::LOCATION, location_value);
    if method == Method::GET || method == Method::HEAD {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }
    response
}

/// Whether the target carries a scheme (`https:`) or an authority (`//host`)
///
/// Targets the URL parser rejects for any other reason are passed through
/// untouched rather than resolved as paths.
fn is_scheme_or_host_relative(location: &str) -> bool {
    location.starts_with("//")
        || !matches!(Url::parse(location), Err(ParseError::RelativeUrlWithoutBase))
}

/// Resolve a local target against the request path and normalize it
fn resolve_local(request_path: &str, location: &str) -> String {
    let mut target = if location.starts_with('/') {
        location.to_string()
    } else {
        let current = if request_path.is_empty() { "/" } else { request_path };
        let dir_end = current.rfind('/').map_or(0, |idx| idx + 1);
        format!("{}{location}", &current[..dir_end])
    };

    let query = target.find('?').map(|idx| target.split_off(idx));

    let trailing_slash = target.ends_with('/');
    let mut cleaned = clean_path(&target);
    if trailing_slash && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    if let Some(query) = query {
        cleaned.push_str(&query);
    }
    cleaned
}

/// Lexically normalize a rooted path: collapse `//`, drop `.`, apply `..`
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Percent-encode control characters and everything outside ASCII
fn escape_non_ascii(value: &str) -> String {
    utf8_percent_encode(value, CONTROLS).to_string()
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
