//! The RAII wrapper handed out by `Pool::acquire`: a session plus a
//! back-reference to the pool it came from, returned on `Drop` instead of
//! closed. The connection itself decides whether it's worth keeping via
//! its unrecoverable-error flag.

use std::time::Instant;

use crate::error::{Error, Result};
use crate::session::SocketConnection;

/// A session on loan from a [`super::Pool`]. On drop, the pool either
/// reclaims it (after validating/resetting it) or discards it.
pub struct PooledConnection {
    pub(super) connection: Option<SocketConnection>,
    pub(super) last_used: Instant,
    /// Set once an error on this connection is classified unrecoverable;
    /// the pool never re-validates or reuses it after that, it disposes.
    pub(super) unrecoverable: bool,
}

impl PooledConnection {
    pub(super) fn new(connection: SocketConnection) -> Self {
        Self {
            connection: Some(connection),
            last_used: Instant::now(),
            unrecoverable: false,
        }
    }

    pub fn idle_time(&self) -> std::time::Duration {
        self.last_used.elapsed()
    }

    pub fn is_unrecoverable(&self) -> bool {
        self.unrecoverable
    }

    /// Runs `f` against the underlying session, intercepting any error to
    /// latch `unrecoverable` and, for server failures that are not already
    /// unrecoverable, emit `ACK_FAILURE` so the connection can keep being
    /// used without the caller having to remember to do it.
    pub fn run_guarded<T>(
        &mut self,
        f: impl FnOnce(&mut SocketConnection) -> Result<T>,
    ) -> Result<T> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(Error::PoolClosed)?;
        let result = f(connection);
        self.last_used = Instant::now();
        if let Err(err) = &result {
            if err.is_unrecoverable() {
                self.unrecoverable = true;
            } else if let Error::ServerFailure { .. } = err {
                let connection = self.connection.as_mut().ok_or(Error::PoolClosed)?;
                let collector = Box::new(crate::collector::AckFailureCollector::default());
                if let Err(ack_err) = connection.ack_failure(collector).and_then(|()| connection.sync())
                {
                    tracing::warn!(error = %ack_err, "failed to auto-acknowledge server failure");
                    self.unrecoverable = true;
                }
            }
        }
        result
    }

    pub(super) fn take(mut self) -> Option<SocketConnection> {
        self.connection.take()
    }
}
