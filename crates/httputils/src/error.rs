// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides the error types returned by the codec and scanner
//! helpers, the server lifecycle errors, and the logging error responder used
//! to surface any of them to a client.

use std::{fmt::Display, net::SocketAddr};

use axum::{
    Json,
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Boxed error type used for request and response body failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while reading or writing JSON payloads
#[derive(Error, Debug)]
pub enum JsonError {
    /// The input stream failed before it was fully read
    #[error("unable to read the data: {source}")]
    Read {
        /// Underlying body error
        #[source]
        source: BoxError,
    },

    /// The input was read but is not valid JSON for the target type
    #[error("unable to unmarshal the data: {source}")]
    Decode {
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be serialized
    #[error("unable to marshal the data: {source}")]
    Encode {
        /// Underlying serializer error
        #[source]
        source: serde_json::Error,
    },
}

impl JsonError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Read { .. } | Self::Decode { .. } => StatusCode::BAD_REQUEST,
            Self::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        json_error_response(self.status_code(), &self)
    }
}

/// Errors produced while scanning a routed path parameter
#[derive(Error, Debug)]
pub enum PathParamError {
    /// No routed variable with the requested name exists on the request
    #[error("the parameter is missing: {name}")]
    Missing {
        /// Requested parameter name
        name: String,
    },

    /// The routed value exists but cannot be converted to the target type
    #[error("unable to scan the parameter {name} from {value:?}: {message}")]
    Parse {
        /// Requested parameter name
        name: String,
        /// Raw routed value
        value: String,
        /// Conversion failure reported by the target type
        message: String,
    },

    /// The router refused to expose the routed variables
    #[error("unable to extract the path parameters: {message}")]
    Rejected {
        /// Rejection reported by the router
        message: String,
    },
}

impl PathParamError {
    /// Get the appropriate HTTP status code for this error
    ///
    /// A missing parameter means the route and the handler disagree, which is
    /// a server-side defect rather than a bad request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Missing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Parse { .. } | Self::Rejected { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for PathParamError {
    fn into_response(self) -> Response {
        json_error_response(self.status_code(), &self)
    }
}

/// Errors raised by the HTTP server lifecycle
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// The accept loop terminated with an error
    #[error("Server failed while serving: {source}")]
    Serve {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// `start` was called on a server whose listener was already consumed
    #[error("Server has already been started")]
    AlreadyStarted,
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

fn json_error_response(status: StatusCode, error: &impl Display) -> Response {
    let body = serde_json::json!({
        "error": error.to_string(),
        "status": status.as_u16()
    });
    (status, Json(body)).into_response()
}

/// Log an error and answer the request with its message as plain text
///
/// The message is forwarded to the tracing subscriber, then written as the
/// body (followed by a newline) with the given status code. The response
/// disables content sniffing so that browsers never interpret the message as
/// markup.
pub fn respond_with_logged_error<E>(err: &E, status: StatusCode) -> Response
where
    E: Display + ?Sized,
{
    let message = err.to_string();
    error!(status = status.as_u16(), "{message}");

    let mut response = Response::new(Body::from(format!("{message}\n")));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
