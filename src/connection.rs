//! Collaborator contracts for the pooled resource
//!
//! The pool treats connections as opaque: it never interprets the session
//! key, the connection string, or any protocol bytes. Everything it needs
//! from a driver is expressed by the two traits below.

use crate::errors::ConnectError;

/// A pooled connection resource.
///
/// Implementations are stateful handles to something expensive to create
/// (a database link, typically). The pool only ever asks whether the handle
/// is still live and, at end of life, tells it to close.
pub trait Connection: Send + 'static {
    /// Opaque prepared-statement handle stored in this connection's
    /// [`StatementCache`](crate::StatementCache).
    type Statement: Send + Sync + 'static;

    /// Whether the underlying resource is still usable. A `false` here is
    /// how the pool detects dead sessions during purges and release.
    fn is_connected(&self) -> bool;

    /// Tear down the underlying resource. Called at most once per
    /// connection, when its holder is destroyed. Must not panic on an
    /// already-dead link.
    fn close(&mut self);
}

/// Creates connections for a pool.
///
/// The pool passes through the `session_key` and `connection_string` it was
/// configured with, verbatim. Connect timeouts, retries, and TLS are the
/// factory's business; the pool treats the call as one atomic blocking step.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Conn: Connection;

    fn connect(
        &self,
        session_key: &str,
        connection_string: &str,
    ) -> Result<Self::Conn, ConnectError>;
}

/// A shared factory is a factory. Lets one factory instance serve several
/// pools, or stay observable from outside the pool that owns it.
impl<F: ConnectionFactory + ?Sized> ConnectionFactory for std::sync::Arc<F> {
    type Conn = F::Conn;

    fn connect(
        &self,
        session_key: &str,
        connection_string: &str,
    ) -> Result<Self::Conn, ConnectError> {
        (**self).connect(session_key, connection_string)
    }
}
