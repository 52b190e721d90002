//! The connection pool: an `Arc`-shared, `Mutex`+`Condvar`-guarded bounded
//! queue per address, handing out sessions with live-count accounting tied
//! to queue-slot reservation. Acquiring can block with a timeout, which is
//! why this uses `Mutex`+`Condvar` rather than a lock-free queue.

pub mod pooled_connection;

pub use pooled_connection::PooledConnection;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use smart_default::SmartDefault;
use tracing::trace;

use crate::error::{Error, Result};
use crate::session::SocketConnection;

/// Pool tuning knobs. Defaults are this crate's own policy choice, since
/// the wire protocol doesn't prescribe any.
#[derive(Debug, Clone, SmartDefault)]
pub struct PoolSettings {
    #[default(100)]
    pub max_sessions: u32,
    #[default(Duration::from_secs(60))]
    pub idle_time_before_connection_test: Duration,
    #[default(Duration::from_secs(60))]
    pub acquire_timeout: Duration,
    #[default(Duration::from_secs(5))]
    pub connection_timeout: Duration,
}

/// Performs connect + `INIT` for one address. A production caller supplies
/// the auth token; this crate only specifies the seam.
pub trait Connector: Send + Sync {
    fn connect(&self, address: &(String, u16)) -> Result<SocketConnection>;
}

#[derive(Default)]
struct AddressState {
    idle: VecDeque<PooledConnection>,
    live_count: u32,
}

pub struct Pool<C> {
    connector: C,
    settings: PoolSettings,
    state: Mutex<HashMap<(String, u16), AddressState>>,
    condvar: Condvar,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl<C: Connector> Pool<C> {
    pub fn new(connector: C, settings: PoolSettings) -> Arc<Self> {
        Arc::new(Self {
            connector,
            settings,
            state: Mutex::new(HashMap::new()),
            condvar: Condvar::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Hands out an idle connection for `address` if one exists, creates a
    /// new one under the `max_sessions` cap, or blocks up to
    /// `acquire_timeout` before failing with `PoolFull`.
    pub fn acquire(self: &Arc<Self>, address: (String, u16)) -> Result<Lease<C>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }
        let deadline = Instant::now() + self.settings.acquire_timeout;
        let mut guard = lock(&self.state);
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::PoolClosed);
            }
            let entry = guard.entry(address.clone()).or_default();
            if let Some(connection) = entry.idle.pop_front() {
                drop(guard);
                trace!(?address, "acquired idle connection");
                return Ok(Lease::new(Arc::clone(self), address, connection));
            }
            if entry.live_count < self.settings.max_sessions {
                entry.live_count += 1;
                drop(guard);
                return self.create(address);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::PoolFull(self.settings.acquire_timeout));
            }
            let (woken, _timeout) = self
                .condvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard = woken;
        }
    }

    fn create(self: &Arc<Self>, address: (String, u16)) -> Result<Lease<C>> {
        match self.connector.connect(&address) {
            Ok(session) => Ok(Lease::new(
                Arc::clone(self),
                address,
                PooledConnection::new(session),
            )),
            Err(err) => {
                let mut guard = lock(&self.state);
                if let Some(entry) = guard.get_mut(&address) {
                    entry.live_count = entry.live_count.saturating_sub(1);
                }
                drop(guard);
                self.condvar.notify_one();
                Err(err)
            }
        }
    }

    /// Unrecoverable connections are disposed outright; everything else is
    /// RESET before being requeued, and disposed instead if the RESET
    /// fails.
    fn release(&self, address: (String, u16), mut connection: PooledConnection) {
        if self.closed.load(Ordering::SeqCst) || connection.is_unrecoverable() {
            self.dispose(&address, connection);
            return;
        }

        let idle_triggered = connection.idle_time() > self.settings.idle_time_before_connection_test;
        trace!(?address, idle_triggered, "validating connection with RESET before reuse");
        let validated = connection
            .run_guarded(|session| {
                session.reset_async()?;
                session.sync()
            })
            .is_ok();

        if !validated || connection.is_unrecoverable() {
            self.dispose(&address, connection);
            return;
        }

        let mut guard = lock(&self.state);
        let Some(entry) = guard.get_mut(&address) else {
            drop(guard);
            self.dispose(&address, connection);
            return;
        };
        if entry.idle.len() < self.settings.max_sessions as usize {
            entry.idle.push_back(connection);
            drop(guard);
            self.condvar.notify_one();
        } else {
            entry.live_count = entry.live_count.saturating_sub(1);
            drop(guard);
            self.condvar.notify_one();
        }
    }

    fn dispose(&self, address: &(String, u16), connection: PooledConnection) {
        let mut guard = lock(&self.state);
        if let Some(entry) = guard.get_mut(address) {
            entry.live_count = entry.live_count.saturating_sub(1);
        }
        drop(guard);
        trace!(?address, "disposing connection");
        drop(connection);
        self.condvar.notify_one();
    }

    /// Marks the pool terminated, disposes every idle connection, and
    /// wakes any blocked acquirers so they observe `PoolClosed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut guard = lock(&self.state);
        for entry in guard.values_mut() {
            entry.idle.clear();
            entry.live_count = 0;
        }
        drop(guard);
        self.condvar.notify_all();
    }
}

/// The RAII handle returned by `Pool::acquire`. Releasing (by `Drop`) runs
/// validation before the connection is requeued or disposed — callers
/// never call `release` themselves.
pub struct Lease<C: Connector> {
    pool: Arc<Pool<C>>,
    address: (String, u16),
    connection: Option<PooledConnection>,
}

impl<C: Connector> Lease<C> {
    fn new(pool: Arc<Pool<C>>, address: (String, u16), connection: PooledConnection) -> Self {
        Self {
            pool,
            address,
            connection: Some(connection),
        }
    }
}

impl<C: Connector> std::ops::Deref for Lease<C> {
    type Target = PooledConnection;

    fn deref(&self) -> &PooledConnection {
        self.connection
            .as_ref()
            .expect("lease connection is only absent after drop")
    }
}

impl<C: Connector> std::ops::DerefMut for Lease<C> {
    fn deref_mut(&mut self) -> &mut PooledConnection {
        self.connection
            .as_mut()
            .expect("lease connection is only absent after drop")
    }
}

impl<C: Connector> Drop for Lease<C> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.release(self.address.clone(), connection);
        }
    }
}
