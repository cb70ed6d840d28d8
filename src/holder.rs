//! Pooled session holder
//!
//! The holder is the unit the pool actually stores and moves between its
//! idle and active collections: one connection, its statement cache, and
//! nothing else. The idle-since timestamp lives on the idle-list entry, not
//! the holder, because it only means anything while the session is idle.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard};

use crate::cache::StatementCache;
use crate::connection::Connection;

pub(crate) struct SessionHolder<C: Connection> {
    conn: Mutex<C>,
    cache: Arc<StatementCache<C::Statement>>,
}

impl<C: Connection> SessionHolder<C> {
    pub(crate) fn new(conn: C) -> Self {
        Self {
            conn: Mutex::new(conn),
            cache: Arc::new(StatementCache::new()),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.conn.lock().is_connected()
    }

    /// Liveness check that never blocks. A connection whose mutex is
    /// contended is checked out and in use, hence live. Lets the pool scan
    /// for dead sessions under its own lock while a caller holds a
    /// connection guard.
    pub(crate) fn is_connected_nonblocking(&self) -> bool {
        match self.conn.try_lock() {
            Some(conn) => conn.is_connected(),
            None => true,
        }
    }

    /// Exclusive access to the connection for the facade.
    pub(crate) fn connection(&self) -> MutexGuard<'_, C> {
        self.conn.lock()
    }

    pub(crate) fn cache(&self) -> &Arc<StatementCache<C::Statement>> {
        &self.cache
    }
}

impl<C: Connection> Drop for SessionHolder<C> {
    fn drop(&mut self) {
        // Sole close site: every destruction path (dead purge, idle
        // eviction, pool teardown, last facade of a dead session) funnels
        // through dropping the last Arc to the holder.
        self.conn.get_mut().close();
    }
}

/// An idle holder plus the moment it went idle.
pub(crate) struct IdleEntry<C: Connection> {
    pub(crate) holder: Arc<SessionHolder<C>>,
    pub(crate) since: Instant,
}
