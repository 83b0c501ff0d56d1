// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Response body error capture
//!
//! Once a handler returns, the bytes of its response are still to be produced
//! and pushed to the client. Failures at that stage never reach the handler:
//! a file that stops being readable fails a frame, a client that goes away
//! makes the server drop the body before its end. The [`CatchingBody`]
//! wrapper records both, and [`catching_middleware`] reports the failure once
//! the body is released.

use std::{
    fmt::Display,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body::{Frame, SizeHint};
use tracing::error;

/// Response body wrapper that remembers the outcome of the latest frame
///
/// Frames are forwarded verbatim. A successful frame clears the recorded
/// error, a failed frame replaces it with the rendered message of the error
/// that was passed through. Reaching the end of the stream leaves the record
/// as it is.
///
/// A body released before its end did not make it to the client in full;
/// [`CatchingBody::is_complete`] tells the two cases apart.
#[derive(Debug)]
pub struct CatchingBody<B> {
    inner: B,
    last_error: Option<String>,
    complete: bool,
    report_on_drop: bool,
}

const ABORTED_MESSAGE: &str = "the response was aborted before completion";

impl<B: http_body::Body> CatchingBody<B> {
    /// Wrap a body without reporting anything on drop
    pub fn new(inner: B) -> Self {
        Self {
            complete: inner.is_end_stream(),
            inner,
            last_error: None,
            report_on_drop: false,
        }
    }

    /// Wrap a body and log its failure, if any, when it is dropped
    pub fn reporting(inner: B) -> Self {
        let mut body = Self::new(inner);
        body.report_on_drop = true;
        body
    }

    /// Whether the end of the body has been reached
    pub fn is_complete(&self) -> bool {
        self.complete || self.inner.is_end_stream()
    }
}

impl<B> CatchingBody<B> {
    /// Message of the error returned by the most recent frame, if it failed
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl<B> http_body::Body for CatchingBody<B>
where
    B: http_body::Body + Unpin,
    B::Error: Display,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(_))) => {
                this.last_error = None;
                this.complete = this.inner.is_end_stream();
            }
            Poll::Ready(Some(Err(err))) => this.last_error = Some(err.to_string()),
            Poll::Ready(None) => this.complete = true,
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

// `Drop` cannot carry the `Body` bound: end of stream is sampled on
// construction and after every frame instead.
impl<B> Drop for CatchingBody<B> {
    fn drop(&mut self) {
        if !self.report_on_drop {
            return;
        }
        if let Some(err) = &self.last_error {
            error!(error = %err, "unable to write the HTTP response");
        } else if !self.complete {
            error!(error = ABORTED_MESSAGE, "unable to write the HTTP response");
        }
    }
}

/// Middleware that logs response bodies which fail while being written
///
/// A body that fails a frame, or that the server releases before its end
/// because the client went away, is logged when it is dropped. The status,
/// headers and bytes of the response are left untouched. Responses that
/// carry no body on the wire (`HEAD`, `204`, `304`, `1xx`) are not reported.
pub async fn catching_middleware(request: Request, next: Next) -> Response {
    let head_only = request.method() == Method::HEAD;
    let response = next.run(request).await;

    let status = response.status();
    let bodyless = head_only
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED;

    response.map(|body| {
        if bodyless {
            Body::new(CatchingBody::new(body))
        } else {
            Body::new(CatchingBody::reporting(body))
        }
    })
}
