// Connection handling module
// Serves one accepted TCP connection with HTTP/1.1 under the configured timeouts

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

use super::timeout::TimeoutStream;
use crate::config::AppState;
use crate::error::ServerError;
use crate::handler;
use crate::logger;

/// Serve a connection in a spawned task.
///
/// - headers must arrive within `timeouts.header_read`
/// - each request, body included, must be handled within `timeouts.read`;
///   on expiry the service errors and hyper drops the connection
/// - the socket may sit idle for at most `timeouts.read` and a response
///   write may stall for at most `timeouts.write`; both reset on progress
///
/// The connection is registered with `graceful` so shutdown can wait for it.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    graceful: &GracefulShutdown,
) {
    logger::log_connection_accepted(&peer_addr);

    let timeouts = state.config.timeouts;
    let state = Arc::clone(state);
    let service = service_fn(move |req: Request<Incoming>| {
        let state = Arc::clone(&state);
        let read_timeout = timeouts.read();
        async move {
            tokio::time::timeout(read_timeout, handler::handle_request(req, state, peer_addr))
                .await
                .map_err(|_| ServerError::RequestTimeout(read_timeout))
        }
    });

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.header_read());
    let io = TokioIo::new(TimeoutStream::new(stream, timeouts.read(), timeouts.write()));
    let conn = graceful.watch(builder.serve_connection(io, service));

    tokio::spawn(async move {
        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }
    });
}
