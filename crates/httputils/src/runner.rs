// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Signal-driven server supervision
//!
//! [`ShutdownRunner`] starts a [`Server`] and stops it when the process
//! receives an interrupt signal or when the caller cancels the runner's
//! token. The outcome is reduced to a single flag: `true` when the server was
//! stopped on request and its stop completed without error.
//!
//! Both halves of the sequence, the blocking `start` and the
//! wait-for-signal-then-`stop` watcher, run as futures joined inside the
//! caller's task, so neither can outlive the call.

use std::{
    fmt,
    future::{Future, poll_fn},
    io,
    task::{Context, Poll},
    time::Duration,
};

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

/// A long-running service that can be asked to stop
pub trait Server: Sync {
    /// Error reported by [`Server::start`] and [`Server::stop`]
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run until the server stops
    ///
    /// `Ok(())` means the server closed because a stop was requested; any
    /// other outcome is an error. Implementations should return once a stop
    /// has been requested rather than once draining has finished, otherwise
    /// the stop deadline cannot bound [`ShutdownRunner::run`].
    fn start(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Ask the server to stop and wait until it has drained
    ///
    /// The future is dropped when the deadline passes, so dropping it should
    /// release whatever the drain was waiting on.
    fn stop(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time [`Server::stop`] may take before the stop counts as failed
    pub graceful_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Operating system signals that can trigger a shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptSignal {
    /// `SIGINT`, or Ctrl+C on Windows
    Interrupt,
    /// `SIGTERM`
    Terminate,
    /// `SIGHUP`
    Hangup,
    /// `SIGQUIT`
    Quit,
    /// `SIGUSR1`
    User1,
    /// `SIGUSR2`
    User2,
}

impl InterruptSignal {
    /// Signals listened for when none are configured explicitly
    pub fn platform_defaults() -> Vec<Self> {
        if cfg!(unix) {
            vec![Self::Interrupt, Self::Terminate, Self::Hangup, Self::Quit]
        } else {
            vec![Self::Interrupt]
        }
    }

    /// Conventional name of the signal
    pub fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
            Self::Quit => "SIGQUIT",
            Self::User1 => "SIGUSR1",
            Self::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn listen(self) -> io::Result<tokio::signal::unix::Signal> {
        use tokio::signal::unix::{SignalKind, signal};

        let kind = match self {
            Self::Interrupt => SignalKind::interrupt(),
            Self::Terminate => SignalKind::terminate(),
            Self::Hangup => SignalKind::hangup(),
            Self::Quit => SignalKind::quit(),
            Self::User1 => SignalKind::user_defined1(),
            Self::User2 => SignalKind::user_defined2(),
        };
        signal(kind)
    }

    #[cfg(windows)]
    fn listen(self) -> io::Result<tokio::signal::windows::CtrlC> {
        match self {
            Self::Interrupt => tokio::signal::windows::ctrl_c(),
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} is not available on this platform", other.name()),
            )),
        }
    }
}

impl fmt::Display for InterruptSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signal streams registered for the duration of one [`ShutdownRunner::run`]
///
/// Dropping the subscription unregisters its streams.
struct SignalSubscription {
    #[cfg(unix)]
    streams: Vec<(InterruptSignal, tokio::signal::unix::Signal)>,
    #[cfg(windows)]
    streams: Vec<(InterruptSignal, tokio::signal::windows::CtrlC)>,
}

impl SignalSubscription {
    /// Register a stream for each signal; failures are logged and skipped
    fn subscribe(signals: &[InterruptSignal]) -> Self {
        let mut streams = Vec::with_capacity(signals.len());
        for &signal in signals {
            match signal.listen() {
                Ok(stream) => streams.push((signal, stream)),
                Err(err) => error!(
                    signal = %signal,
                    error = %err,
                    "unable to listen for the interrupt signal"
                ),
            }
        }
        Self { streams }
    }

    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<InterruptSignal> {
        for (signal, stream) in &mut self.streams {
            if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                return Poll::Ready(*signal);
            }
        }
        Poll::Pending
    }

    /// Wait for any of the subscribed signals; never resolves without streams
    async fn recv(&mut self) -> InterruptSignal {
        poll_fn(|cx| self.poll_recv(cx)).await
    }
}

/// What made the watcher ask the server to stop
enum StopTrigger {
    Signal(InterruptSignal),
    Cancelled,
}

/// Supervises a [`Server`] until an interrupt signal or cancellation stops it
#[derive(Debug)]
pub struct ShutdownRunner {
    config: ShutdownConfig,
    signals: Vec<InterruptSignal>,
    cancellation_token: CancellationToken,
}

impl ShutdownRunner {
    /// Create a runner listening for the platform's default interrupt signals
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            config,
            signals: InterruptSignal::platform_defaults(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Listen for the given signals instead of the platform defaults
    ///
    /// An empty list keeps the platform defaults.
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = InterruptSignal>) -> Self {
        let signals: Vec<_> = signals.into_iter().collect();
        if !signals.is_empty() {
            self.signals = signals;
        }
        self
    }

    /// Token that stops the supervised server when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Signals the runner listens for
    pub fn signals(&self) -> &[InterruptSignal] {
        &self.signals
    }

    /// Run the server until it is stopped and report whether the stop was clean
    ///
    /// `start` is called exactly once. `stop` is called at most once, after an
    /// interrupt signal or a cancellation of [`Self::cancellation_token`],
    /// with [`ShutdownConfig::graceful_timeout`] as its deadline. When
    /// `start` fails, the watcher is released without calling `stop` and the
    /// result is `false`. Errors of both calls are logged, never returned.
    ///
    /// The call returns once both `start` and the watcher have finished.
    pub async fn run<S: Server>(&self, server: &S) -> bool {
        let mut subscription = SignalSubscription::subscribe(&self.signals);

        // released when start fails so the watcher does not wait for a signal
        // that will never matter
        let start_failed = CancellationToken::new();

        let watcher = async {
            let trigger = tokio::select! {
                biased;
                () = start_failed.cancelled() => return None,
                () = self.cancellation_token.cancelled() => StopTrigger::Cancelled,
                signal = subscription.recv() => StopTrigger::Signal(signal),
            };

            match trigger {
                StopTrigger::Signal(signal) => {
                    warn!(signal = %signal, "shutdown signal received, stopping the server");
                }
                StopTrigger::Cancelled => warn!("shutdown requested, stopping the server"),
            }

            Some(self.stop(server).await)
        };

        let serve = async {
            match server.start().await {
                Ok(()) => {
                    info!("server closed");
                    true
                }
                Err(err) => {
                    error!(error = %err, "unable to run the server");
                    start_failed.cancel();
                    false
                }
            }
        };

        let (closed, stopped) = tokio::join!(serve, watcher);
        closed && stopped.unwrap_or(false)
    }

    async fn stop<S: Server>(&self, server: &S) -> bool {
        match timeout(self.config.graceful_timeout, server.stop()).await {
            Ok(Ok(())) => {
                info!("server shut down gracefully");
                true
            }
            Ok(Err(err)) => {
                error!(error = %err, "unable to shutdown the server");
                false
            }
            Err(_) => {
                error!(
                    timeout_seconds = self.config.graceful_timeout.as_secs_f64(),
                    "unable to shutdown the server: graceful shutdown timed out"
                );
                false
            }
        }
    }
}

/// Run `server` under a [`ShutdownRunner`] listening for `signals`
///
/// An empty `signals` slice listens for the platform's default interrupt
/// signals.
pub async fn run_and_supervise<S: Server>(
    server: &S,
    config: ShutdownConfig,
    signals: &[InterruptSignal],
) -> bool {
    ShutdownRunner::new(config)
        .with_signals(signals.iter().copied())
        .run(server)
        .await
}
