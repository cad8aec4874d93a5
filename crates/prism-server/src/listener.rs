//! Listener socket construction.
//!
//! Worker fan-out relies on every worker process binding the same
//! address, so the listener is built through `socket2` with
//! `SO_REUSEADDR`/`SO_REUSEPORT` set before bind. The kernel then
//! load-balances accepted connections across the worker pool.

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tracing::debug;

use crate::error::StartupError;

const LISTEN_BACKLOG: i32 = 1024;

/// Bind a non-blocking TCP listener with port sharing enabled.
///
/// # Errors
///
/// Returns [`StartupError::Bind`] when the socket cannot be created,
/// configured, or bound. The caller logs the cause and aborts startup.
pub fn bind(addr: SocketAddr) -> Result<TcpListener, StartupError> {
    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| StartupError::Bind { addr, source })?;

    socket
        .set_reuse_address(true)
        .map_err(|source| StartupError::Bind { addr, source })?;
    #[cfg(unix)]
    socket
        .set_reuse_port(true)
        .map_err(|source| StartupError::Bind { addr, source })?;
    socket
        .set_nonblocking(true)
        .map_err(|source| StartupError::Bind { addr, source })?;

    socket
        .bind(&addr.into())
        .map_err(|source| StartupError::Bind { addr, source })?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|source| StartupError::Bind { addr, source })?;

    let listener = TcpListener::from_std(socket.into())
        .map_err(|source| StartupError::Bind { addr, source })?;

    debug!(%addr, "listener bound with port sharing");
    Ok(listener)
}
