//! Core session pool
//!
//! Creating a connection to a database is expensive, so sessions are pooled:
//! checkout hands out an already-connected session when one is idle, creates
//! one when there is headroom, and fails once the cap is reached. Sessions
//! found not to be connected are purged whenever one of three events occurs:
//! a checkout, a release, or a janitor tick. Not-connected idle sessions
//! cannot persist.
//!
//! All pool state lives behind one mutex. Checkout, release, and the janitor
//! sweep each hold it start to finish, so they never interleave; none of
//! them may be re-entered while the lock is held.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use crate::cache::StatementCacheHandle;
use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionFactory};
use crate::errors::{PoolError, PoolResult};
use crate::holder::{IdleEntry, SessionHolder};
use crate::janitor::Janitor;
use crate::metrics::PoolMetrics;

/// A pool of database sessions sharing one (session key, connection string)
/// target.
///
/// Cloning the pool is cheap and yields another handle to the same pool.
///
/// Policy, fixed deliberately: checkout reuses the most recently idled
/// session (warmest statement cache, least reconnect risk); the janitor
/// evicts the longest-idle session first, and never evicts a live session
/// below the configured floor. Dead sessions are destroyed regardless of
/// the floor.
pub struct SessionPool<F: ConnectionFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ConnectionFactory> Clone for SessionPool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<F: ConnectionFactory> {
    config: PoolConfig<F::Conn>,
    factory: F,
    state: Mutex<PoolState<F::Conn>>,
}

/// Everything the pool mutates, under the one lock.
///
/// Invariants: a holder sits in exactly one of `idle` / `active`, and
/// `n_sessions == idle.len() + active.len() <= config.max_sessions`.
struct PoolState<C: Connection> {
    idle: Vec<IdleEntry<C>>,
    active: Vec<Arc<SessionHolder<C>>>,
    n_sessions: usize,
}

impl<F: ConnectionFactory> SessionPool<F> {
    /// Create a pool. No sessions are created up front; the floor only
    /// restrains eviction.
    pub fn new(factory: F, config: PoolConfig<F::Conn>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                factory,
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    active: Vec::new(),
                    n_sessions: 0,
                }),
            }),
        }
    }

    /// Check out a session.
    ///
    /// Reuses an idle session when one is live, creates a new one when
    /// under the cap, and fails with [`PoolError::Exhausted`] otherwise.
    /// The factory call for a new session runs with the pool lock held, so
    /// a slow handshake briefly serializes other pool operations.
    pub fn checkout(&self) -> PoolResult<Session<F>> {
        let holder = self.inner.checkout_holder()?;
        Ok(Session::new(holder, &self.inner))
    }

    /// Check out a session together with a handle to its statement cache.
    ///
    /// The cache belongs to the physical connection backing the session: it
    /// keeps its contents across idle/active round trips of that session
    /// and is invalidated when the pool destroys it. Statement handles read
    /// from the cache must not be used after that point.
    pub fn checkout_with_cache(
        &self,
    ) -> PoolResult<(Session<F>, StatementCacheHandle<<F::Conn as Connection>::Statement>)> {
        let holder = self.inner.checkout_holder()?;
        let handle = StatementCacheHandle::new(holder.cache());
        Ok((Session::new(holder, &self.inner), handle))
    }

    /// Check out a session, waiting up to `timeout` for one to free up if
    /// the pool is momentarily exhausted. Errors other than exhaustion
    /// surface immediately.
    pub async fn checkout_async(&self, timeout: Duration) -> PoolResult<Session<F>> {
        tokio::time::timeout(timeout, async {
            loop {
                match self.checkout() {
                    Err(PoolError::Exhausted { .. }) => {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                    other => return other,
                }
            }
        })
        .await
        .map_err(|_| PoolError::Timeout(timeout))?
    }

    /// Run one maintenance pass: purge dead idle sessions, then evict
    /// sessions idle longer than the configured timeout, stopping at the
    /// floor. The janitor calls this on its schedule; tests and embedders
    /// may call it directly.
    pub fn sweep(&self) {
        self.inner.sweep();
    }

    /// Spawn a background janitor invoking [`sweep`](Self::sweep) every
    /// `period`. A period of a fraction of the idle timeout is typical.
    /// Dropping the returned [`Janitor`] stops the thread.
    pub fn start_janitor(&self, period: Duration) -> Janitor {
        Janitor::spawn(self.clone(), period)
    }

    /// Maximum number of sessions this pool will manage.
    pub fn capacity(&self) -> usize {
        self.inner.config.max_sessions
    }

    /// Sessions currently checked out.
    pub fn used(&self) -> usize {
        self.inner.state.lock().active.len()
    }

    /// Idle sessions available for reuse.
    pub fn idle(&self) -> usize {
        self.inner.state.lock().idle.len()
    }

    /// Total sessions currently allocated (idle + active).
    pub fn allocated(&self) -> usize {
        self.inner.state.lock().n_sessions
    }

    /// Sessions obtainable without exhausting the pool: idle plus
    /// remaining capacity.
    pub fn available(&self) -> usize {
        let state = self.inner.state.lock();
        state.idle.len() + self.inner.config.max_sessions.saturating_sub(state.n_sessions)
    }

    /// Sessions in either collection whose connection reports
    /// not-connected. Diagnostic scan only: nothing is purged, and a
    /// connection whose guard a caller currently holds counts as live.
    pub fn dead(&self) -> usize {
        let state = self.inner.state.lock();
        PoolInner::<F>::dead_in(&state)
    }

    /// Consistent snapshot of all diagnostic counters.
    pub fn metrics(&self) -> PoolMetrics {
        let state = self.inner.state.lock();
        PoolMetrics::new(
            self.inner.config.max_sessions,
            state.active.len(),
            state.idle.len(),
            PoolInner::<F>::dead_in(&state),
        )
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig<F::Conn> {
        &self.inner.config
    }
}

impl<F: ConnectionFactory> PoolInner<F> {
    fn checkout_holder(&self) -> PoolResult<Arc<SessionHolder<F::Conn>>> {
        let mut state = self.state.lock();

        let purged = Self::purge_dead(&mut state);
        if purged > 0 {
            tracing::debug!(purged, "dropped dead idle sessions during checkout");
        }

        // Most recently idled first.
        if let Some(entry) = state.idle.pop() {
            state.active.push(Arc::clone(&entry.holder));
            return Ok(entry.holder);
        }

        if state.n_sessions < self.config.max_sessions {
            // Lock stays held across the handshake; see the module notes.
            let mut conn = self
                .factory
                .connect(&self.config.session_key, &self.config.connection_string)
                .map_err(PoolError::ConnectionFailed)?;

            if let Some(hook) = self.config.customize_session {
                hook(&mut conn);
            }

            let holder = Arc::new(SessionHolder::new(conn));
            state.active.push(Arc::clone(&holder));
            state.n_sessions += 1;
            tracing::debug!(allocated = state.n_sessions, "created new session");
            return Ok(holder);
        }

        Err(PoolError::Exhausted {
            max_sessions: self.config.max_sessions,
        })
    }

    /// Return a holder the last facade just let go of. An untracked holder
    /// is a caller-discipline defect: logged, never fatal.
    fn release(&self, holder: &Arc<SessionHolder<F::Conn>>) {
        let mut state = self.state.lock();

        let Some(pos) = state.active.iter().position(|h| Arc::ptr_eq(h, holder)) else {
            tracing::warn!("release of a session the pool does not track as active; ignoring");
            return;
        };

        let holder = state.active.swap_remove(pos);
        if holder.is_connected() {
            state.idle.push(IdleEntry {
                holder,
                since: Instant::now(),
            });
        } else {
            state.n_sessions -= 1;
            tracing::debug!(allocated = state.n_sessions, "dropped dead session on release");
        }
    }

    fn sweep(&self) {
        let mut state = self.state.lock();

        let purged = Self::purge_dead(&mut state);

        let mut evicted = 0;
        if !self.config.idle_time.is_zero() {
            let now = Instant::now();
            while state.n_sessions > self.config.min_sessions {
                // Longest-idle first.
                let oldest = state
                    .idle
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, entry)| now.duration_since(entry.since))
                    .map(|(pos, entry)| (pos, now.duration_since(entry.since)));

                match oldest {
                    Some((pos, idle_for)) if idle_for > self.config.idle_time => {
                        state.idle.remove(pos);
                        state.n_sessions -= 1;
                        evicted += 1;
                    }
                    _ => break,
                }
            }
        }

        if purged > 0 || evicted > 0 {
            tracing::debug!(
                purged,
                evicted,
                allocated = state.n_sessions,
                "janitor sweep reclaimed sessions"
            );
        }
    }

    /// Drop idle holders whose connection has died. Dropping the last Arc
    /// closes the connection. Dead sessions ignore the floor.
    fn purge_dead(state: &mut PoolState<F::Conn>) -> usize {
        let before = state.idle.len();
        let PoolState { idle, n_sessions, .. } = state;
        idle.retain(|entry| {
            if entry.holder.is_connected() {
                true
            } else {
                *n_sessions -= 1;
                false
            }
        });
        before - state.idle.len()
    }

    // Runs under the pool lock, so it must never block on a holder's
    // connection mutex: a caller holding a connection guard may be waiting
    // on the pool lock at the same time.
    fn dead_in(state: &PoolState<F::Conn>) -> usize {
        state
            .idle
            .iter()
            .filter(|entry| !entry.holder.is_connected_nonblocking())
            .count()
            + state
                .active
                .iter()
                .filter(|holder| !holder.is_connected_nonblocking())
                .count()
    }
}

/// A checked-out session.
///
/// Clones share one hold on the underlying session; it goes back to the
/// pool when the last clone drops. If the connection has died in the
/// meantime the pool destroys it instead. A session may outlive its pool;
/// the connection is then closed when the last clone drops.
pub struct Session<F: ConnectionFactory> {
    core: Arc<SessionCore<F>>,
}

struct SessionCore<F: ConnectionFactory> {
    holder: Arc<SessionHolder<F::Conn>>,
    pool: Weak<PoolInner<F>>,
}

impl<F: ConnectionFactory> Session<F> {
    fn new(holder: Arc<SessionHolder<F::Conn>>, pool: &Arc<PoolInner<F>>) -> Self {
        Self {
            core: Arc::new(SessionCore {
                holder,
                pool: Arc::downgrade(pool),
            }),
        }
    }

    /// Exclusive access to the underlying connection.
    pub fn connection(&self) -> MutexGuard<'_, F::Conn> {
        self.core.holder.connection()
    }

    pub fn is_connected(&self) -> bool {
        self.core.holder.is_connected()
    }
}

impl<F: ConnectionFactory> Clone for Session<F> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<F: ConnectionFactory> Drop for SessionCore<F> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            pool.release(&self.holder);
        }
    }
}
