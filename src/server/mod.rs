//! Server module
//!
//! Owns the listening socket and the accept loop. A `Server` is bound first,
//! so callers can read the actual address, then consumed by `serve`.

pub mod connection;
pub mod listener;
pub mod signal;
pub mod timeout;

pub use listener::create_listener;
pub use signal::shutdown_signal;

use crate::config::AppState;
use crate::error::ServerError;
use crate::logger;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// A bound, not yet serving, HTTP server
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
}

impl Server {
    /// Bind the configured `server.host:server.port`
    pub fn bind(state: Arc<AppState>) -> Result<Self, ServerError> {
        let addr = state.config.get_socket_addr()?;
        let listener =
            create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            local_addr,
            state,
        })
    }

    /// Address actually bound, with the real port when 0 was requested
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown_signal` resolves, then drain.
    ///
    /// Returns `ServerError::ShutdownTimeout` if in-flight connections
    /// outlive `timeouts.shutdown_grace`.
    pub async fn serve<F>(self, shutdown_signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener, state, ..
        } = self;
        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown_signal);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            connection::accept_connection(stream, peer_addr, &state, &graceful);
                        }
                        Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                    }
                }

                () = &mut shutdown_signal => break,
            }
        }

        // Stop accepting before waiting on in-flight connections
        drop(listener);
        logger::log_shutdown_started();
        shutdown(graceful, state.config.timeouts.shutdown_grace()).await
    }
}

/// Wait up to `grace` for every watched connection to finish
pub async fn shutdown(graceful: GracefulShutdown, grace: Duration) -> Result<(), ServerError> {
    tokio::select! {
        () = graceful.shutdown() => Ok(()),
        () = tokio::time::sleep(grace) => Err(ServerError::ShutdownTimeout(grace)),
    }
}
