// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP server helpers
//!
//! Building blocks for small axum services that host a single-page
//! application next to a JSON API, and a supervisor that stops such a
//! service gracefully on interrupt signals.
//!
//! # Module Structure
//!
//! - [`catching`]: Response body wrapper and middleware that log failures after the handler returned
//! - [`spa`]: Middleware rewriting browser navigations to the application's entry document
//! - [`static_assets`]: File server for a single-page application bundle
//! - [`json`]: JSON request decoding and response encoding
//! - [`path`]: Typed scanning of routed path parameters
//! - [`redirect`]: Redirect responses with relative target resolution
//! - [`error`]: Error types and the logging error responder
//! - [`runner`]: Signal-driven shutdown supervision of a [`Server`]
//! - [`server`]: Axum implementation of the [`Server`] contract
//! - [`config`]: Server configuration with hierarchical loading
//! - [`client`]: Substitutable outbound HTTP client
//!
//! # Key Features
//!
//! - **Graceful Shutdown**: `SIGINT`, `SIGTERM`, `SIGHUP` and `SIGQUIT` (or a
//!   `CancellationToken`) stop the server within a bounded deadline
//! - **Post-handler Error Logging**: body failures that no handler can see are still reported

pub mod catching;
pub mod client;
pub mod config;
pub mod error;
pub mod json;
pub mod path;
pub mod redirect;
pub mod runner;
pub mod server;
pub mod spa;
pub mod static_assets;

#[cfg(test)]
mod test_support;

pub use catching::{CatchingBody, catching_middleware};
pub use client::HttpClient;
pub use config::{Environment, ServerConfig};
pub use error::{JsonError, PathParamError, ServerError, ServerResult, respond_with_logged_error};
pub use json::{JsonBody, read_json, write_json};
pub use path::scan_path_parameter;
pub use redirect::redirect;
pub use runner::{InterruptSignal, Server, ShutdownConfig, ShutdownRunner, run_and_supervise};
pub use server::HttpServer;
pub use spa::spa_fallback_middleware;
pub use static_assets::static_asset_handler;
