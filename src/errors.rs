//! Error types for the session pool

use thiserror::Error;

/// Error a [`ConnectionFactory`](crate::ConnectionFactory) reports when it
/// cannot establish a connection.
pub type ConnectError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("session pool exhausted - all {max_sessions} sessions are in use")]
    Exhausted { max_sessions: usize },

    #[error("failed to establish a new connection")]
    ConnectionFailed(#[source] ConnectError),

    #[error("checkout timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type PoolResult<T> = Result<T, PoolError>;
