//! # sessionpool
//!
//! Thread-safe pooling for expensive-to-create connection resources, with
//! idle-timeout eviction, dead-connection purging, and a per-connection
//! statement cache.
//!
//! A [`SessionPool`] manages sessions for one (session key, connection
//! string) target behind a [`ConnectionFactory`] you supply. Checkout
//! reuses an idle session when one is live, creates a new one while under
//! the cap, and fails once the cap is reached. Released sessions go back to
//! the idle set; a background [`Janitor`] purges dead ones and evicts those
//! idle past the configured timeout, never dropping live sessions below the
//! configured floor.
//!
//! ## Features
//!
//! - RAII return: sessions go back to the pool when the last facade clone
//!   drops
//! - Dead-connection detection on checkout, release, and janitor ticks
//! - Idle-timeout eviction with a floor, on a background thread
//! - Per-connection statement cache surviving checkout cycles
//! - Once-per-connection customization hook
//! - Async checkout helper with timeout
//! - Diagnostic counters and Prometheus-format export
//!
//! ## Quick start
//!
//! ```rust
//! use sessionpool::{ConnectError, Connection, ConnectionFactory, PoolConfig, SessionPool};
//!
//! struct MyConn {
//!     open: bool,
//! }
//!
//! impl Connection for MyConn {
//!     type Statement = String;
//!
//!     fn is_connected(&self) -> bool {
//!         self.open
//!     }
//!
//!     fn close(&mut self) {
//!         self.open = false;
//!     }
//! }
//!
//! struct MyFactory;
//!
//! impl ConnectionFactory for MyFactory {
//!     type Conn = MyConn;
//!
//!     fn connect(&self, _key: &str, _target: &str) -> Result<MyConn, ConnectError> {
//!         Ok(MyConn { open: true })
//!     }
//! }
//!
//! let pool = SessionPool::new(MyFactory, PoolConfig::new("ODBC", "Db=orders"));
//! {
//!     let session = pool.checkout()?;
//!     assert!(session.is_connected());
//! } // session returns to the pool here
//! assert_eq!(pool.idle(), 1);
//! # Ok::<(), sessionpool::PoolError>(())
//! ```

mod cache;
mod config;
mod connection;
mod errors;
mod holder;
mod janitor;
mod metrics;
mod pool;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{StatementCache, StatementCacheHandle};
pub use config::PoolConfig;
pub use connection::{Connection, ConnectionFactory};
pub use errors::{ConnectError, PoolError, PoolResult};
pub use janitor::Janitor;
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{Session, SessionPool};
