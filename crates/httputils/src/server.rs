// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! [`HttpServer`] serves an axum [`Router`] and implements the runner's
//! [`Server`] contract, so it can be supervised by a
//! [`ShutdownRunner`](crate::runner::ShutdownRunner).
//!
//! The accept loop runs in its own task. `start` returns as soon as a
//! shutdown has been requested, `stop` waits for in-flight connections to
//! drain. Dropping the `stop` future before the drain completes, as the
//! runner does when its deadline passes, aborts the accept loop; connections
//! still open at that point are abandoned.

use std::{fmt, io, mem, net::SocketAddr};

use axum::Router;
use tokio::{net::TcpListener, sync::Mutex};
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};
use tracing::info;

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    runner::Server,
};

enum ServeState {
    Bound(TcpListener),
    Serving(AbortOnDropHandle<io::Result<()>>),
    Stopped,
}

/// Axum server bound to a listening socket
pub struct HttpServer {
    state: Mutex<ServeState>,
    local_addr: SocketAddr,
    router: Router,
    /// Cancelled by `stop` to begin the graceful shutdown
    shutdown: CancellationToken,
    /// Cancelled once the accept loop task has returned
    exited: CancellationToken,
}

impl fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpServer")
            .field("local_addr", &self.local_addr)
            .field("shutdown_requested", &self.shutdown.is_cancelled())
            .field("exited", &self.exited.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl HttpServer {
    /// Bind the configured address
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn from_config(config: &ServerConfig, router: Router) -> ServerResult<Self> {
        Self::bind(config.socket_addr(), router).await
    }

    /// Bind `addr`; port 0 lets the OS pick a free port
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the address, or
    /// `ServerError::Startup` if the bound address cannot be read back.
    pub async fn bind(addr: SocketAddr, router: Router) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        Ok(Self {
            state: Mutex::new(ServeState::Bound(listener)),
            local_addr,
            router,
            shutdown: CancellationToken::new(),
            exited: CancellationToken::new(),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop task, or release the listener if it never ran
    async fn finish(&self) -> ServerResult<()> {
        let task = match mem::replace(&mut *self.state.lock().await, ServeState::Stopped) {
            ServeState::Serving(task) => task,
            ServeState::Bound(_) | ServeState::Stopped => return Ok(()),
        };

        match task.await {
            Ok(result) => result.map_err(|source| ServerError::Serve { source }),
            Err(err) => Err(ServerError::Serve {
                source: io::Error::other(err),
            }),
        }
    }
}

impl Server for HttpServer {
    type Error = ServerError;

    async fn start(&self) -> ServerResult<()> {
        {
            let mut state = self.state.lock().await;
            let listener = match mem::replace(&mut *state, ServeState::Stopped) {
                ServeState::Bound(listener) => listener,
                other => {
                    *state = other;
                    return Err(ServerError::AlreadyStarted);
                }
            };

            let router = self.router.clone();
            let shutdown = self.shutdown.clone();
            let exited = self.exited.clone();
            let task = tokio::spawn(async move {
                let result = axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await;
                exited.cancel();
                result
            });
            *state = ServeState::Serving(AbortOnDropHandle::new(task));
        }

        info!(address = %self.local_addr, "HTTP server starting");

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Ok(()),
            () = self.exited.cancelled() => self.finish().await,
        }
    }

    async fn stop(&self) -> ServerResult<()> {
        info!(address = %self.local_addr, "HTTP server stopping");
        self.shutdown.cancel();

        self.finish().await?;
        info!("HTTP server drained");
        Ok(())
    }
}
