//! Error types for the server's ambient (non-protocol) failure paths.
//!
//! In-session protocol errors are never `Result::Err` values — they are
//! numeric replies enqueued on a connection's output buffer, or silent
//! connection teardown. The only errors that can abort the whole process
//! are collected here.

use thiserror::Error;

/// Convenience alias for results produced during server startup.
pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Fatal errors that can occur while bringing the server up.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Binding the listening socket failed.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    /// `listen(2)` on the bound socket failed.
    #[error("failed to listen on socket: {0}")]
    Listen(#[source] std::io::Error),

    /// Registering the listener with the readiness multiplexer failed.
    #[error("failed to register listener with poller: {0}")]
    Poll(#[source] std::io::Error),

    /// Installing the `SIGINT` handler failed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}
