//! Background maintenance
//!
//! The janitor drives the pool's sweep on its own schedule, independent of
//! client call patterns: a dedicated thread blocks on a ticker and a
//! shutdown channel, calling into the pool on every tick. It contends for
//! the same lock as checkout and release, so foreground calls may observe a
//! brief wait while a sweep runs.

use std::thread;
use std::time::Duration;

use crossbeam::channel::{Sender, bounded, tick};

use crate::connection::ConnectionFactory;
use crate::pool::SessionPool;

/// Handle to a running janitor thread.
///
/// Obtained from [`SessionPool::start_janitor`]. Dropping it signals the
/// thread to stop and joins it; in-progress sweeps finish first.
pub struct Janitor {
    stop: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Janitor {
    pub(crate) fn spawn<F: ConnectionFactory>(pool: SessionPool<F>, period: Duration) -> Self {
        let (stop, stopped) = bounded::<()>(1);
        let ticker = tick(period);

        let handle = thread::spawn(move || {
            loop {
                crossbeam::select! {
                    recv(ticker) -> _ => pool.sweep(),
                    recv(stopped) -> _ => break,
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::testutil::FakeFactory;

    use std::sync::Arc;

    #[test]
    fn janitor_evicts_expired_sessions_on_its_own() {
        let factory = Arc::new(FakeFactory::default());
        let pool = SessionPool::new(
            Arc::clone(&factory),
            PoolConfig::new("ODBC", "Db=test")
                .with_min_sessions(0)
                .with_max_sessions(4)
                .with_idle_time(Duration::from_millis(30)),
        );

        let janitor = pool.start_janitor(Duration::from_millis(10));

        let session = pool.checkout().unwrap();
        drop(session);
        assert_eq!(pool.idle(), 1);

        // No client activity from here on; the janitor alone reclaims it.
        thread::sleep(Duration::from_millis(150));
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.allocated(), 0);

        drop(janitor);
    }

    #[test]
    fn janitor_purges_dead_sessions_even_with_eviction_disabled() {
        let factory = Arc::new(FakeFactory::default());
        let pool = SessionPool::new(
            Arc::clone(&factory),
            PoolConfig::new("ODBC", "Db=test")
                .with_min_sessions(0)
                .with_max_sessions(4)
                .with_idle_time(Duration::ZERO),
        );

        let _janitor = pool.start_janitor(Duration::from_millis(10));

        let session = pool.checkout().unwrap();
        let id = session.connection().id;
        drop(session);

        factory.kill(id);
        thread::sleep(Duration::from_millis(100));

        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    fn dropping_the_janitor_stops_the_thread() {
        let factory = Arc::new(FakeFactory::default());
        let pool = SessionPool::new(
            Arc::clone(&factory),
            PoolConfig::new("ODBC", "Db=test").with_idle_time(Duration::from_millis(10)),
        );

        let janitor = pool.start_janitor(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        drop(janitor); // joins; must not hang or panic

        let session = pool.checkout().unwrap();
        assert!(session.is_connected());
    }
}
