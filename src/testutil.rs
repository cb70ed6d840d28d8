//! In-memory connection fakes shared by the pool and janitor tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::connection::{Connection, ConnectionFactory};
use crate::errors::ConnectError;

/// Fake connection whose liveness is an external switch, so tests can kill
/// a specific physical connection while the pool holds it.
pub(crate) struct FakeConn {
    pub(crate) id: usize,
    pub(crate) setup_runs: usize,
    alive: Arc<AtomicBool>,
}

impl Connection for FakeConn {
    type Statement = String;

    fn is_connected(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Factory that numbers the connections it creates and keeps a kill switch
/// for each one.
#[derive(Default)]
pub(crate) struct FakeFactory {
    created: AtomicUsize,
    refuse: AtomicBool,
    lines: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeFactory {
    /// How many connections this factory has handed out so far.
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Make subsequent `connect` calls fail.
    pub(crate) fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Simulate the backend dropping connection `id`.
    pub(crate) fn kill(&self, id: usize) {
        self.lines.lock()[id].store(false, Ordering::SeqCst);
    }

    /// Whether connection `id` is still up.
    pub(crate) fn is_alive(&self, id: usize) -> bool {
        self.lines.lock()[id].load(Ordering::SeqCst)
    }
}

impl ConnectionFactory for FakeFactory {
    type Conn = FakeConn;

    fn connect(&self, _key: &str, _conn_str: &str) -> Result<FakeConn, ConnectError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err("connection refused".into());
        }

        let id = self.created.fetch_add(1, Ordering::SeqCst);
        let alive = Arc::new(AtomicBool::new(true));
        self.lines.lock().push(Arc::clone(&alive));

        Ok(FakeConn {
            id,
            setup_runs: 0,
            alive,
        })
    }
}
