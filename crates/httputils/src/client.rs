// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client seam
//!
//! Code that issues outbound requests depends on [`HttpClient`] rather than
//! on a concrete client, so tests can answer requests without a network.

use std::future::Future;

use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Anything that can execute an HTTP request
pub trait HttpClient: Sync {
    /// Send the request and wait for the response head
    fn execute(&self, request: Request) -> impl Future<Output = reqwest::Result<Response>> + Send;
}

impl HttpClient for Client {
    fn execute(&self, request: Request) -> impl Future<Output = reqwest::Result<Response>> + Send {
        Client::execute(self, request)
    }
}

/// Execute `request` and decode a successful response body as JSON
///
/// Non-success status codes are returned as errors before the body is read.
pub async fn fetch_json<C, T>(client: &C, request: Request) -> reqwest::Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    debug!(method = %request.method(), url = %request.url(), "sending request");
    client.execute(request).await?.error_for_status()?.json().await
}
