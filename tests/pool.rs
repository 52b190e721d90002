//! Pool invariants: the live-count bound, the idle-time-triggered RESET
//! validation, unrecoverable connections never being requeued, and
//! `PoolFull` once an address is saturated.

mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bolt_core::error::{Error, Result};
use bolt_core::packstream::OrderedMap;
use bolt_core::pool::{Connector, Pool, PoolSettings};
use bolt_core::session::SocketConnection;

/// Hands out a freshly handshaken and initialized session built from a
/// canned wire script; counts how many times it was asked to connect so
/// tests can tell a reused idle connection from a freshly dialed one.
struct StubConnector {
    reset_acks: u32,
    calls: Arc<Mutex<u32>>,
}

impl Connector for StubConnector {
    fn connect(&self, _address: &(String, u16)) -> Result<SocketConnection> {
        *self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
        let mut wire = support::handshake_reply_v1();
        wire.extend(support::success_message(OrderedMap::new())); // INIT
        for _ in 0..self.reset_acks {
            wire.extend(support::success_message(OrderedMap::new())); // RESET ack
        }
        let (channel, _written) = support::scripted_channel(wire);
        let mut session = SocketConnection::connect(channel)?;
        session.init("driver/1.0", OrderedMap::new())?;
        Ok(session)
    }
}

fn address() -> (String, u16) {
    ("localhost".to_string(), 7687)
}

#[test]
fn acquire_blocks_then_fails_once_max_sessions_is_saturated() {
    let calls = Arc::new(Mutex::new(0));
    let connector = StubConnector {
        reset_acks: 0,
        calls: Arc::clone(&calls),
    };
    let settings = PoolSettings {
        max_sessions: 2,
        acquire_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let pool = Pool::new(connector, settings);

    let _lease1 = pool.acquire(address()).expect("first acquire");
    let _lease2 = pool.acquire(address()).expect("second acquire");

    let err = pool.acquire(address()).expect_err("pool is saturated");
    assert!(matches!(err, Error::PoolFull(_)));
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[test]
fn unrecoverable_connection_is_disposed_not_requeued() {
    let calls = Arc::new(Mutex::new(0));
    let connector = StubConnector {
        reset_acks: 0,
        calls: Arc::clone(&calls),
    };
    let pool = Pool::new(connector, PoolSettings::default());

    let mut lease = pool.acquire(address()).expect("acquire");
    let result: Result<()> = lease.run_guarded(|_session| Err(Error::EndOfStream));
    assert!(result.is_err());
    assert!(lease.is_unrecoverable());
    drop(lease);

    // The disposed connection must not have been handed back out; a fresh
    // one is dialed instead.
    let _lease2 = pool.acquire(address()).expect("acquire after dispose");
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[test]
fn idle_connection_past_the_threshold_is_reset_before_reuse() {
    let calls = Arc::new(Mutex::new(0));
    let connector = StubConnector {
        reset_acks: 1,
        calls: Arc::clone(&calls),
    };
    let settings = PoolSettings {
        idle_time_before_connection_test: Duration::from_nanos(1),
        ..Default::default()
    };
    let pool = Pool::new(connector, settings);

    let lease = pool.acquire(address()).expect("acquire");
    std::thread::sleep(Duration::from_millis(5));
    drop(lease);

    // The RESET round-trip validated cleanly, so the same connection is
    // handed back out rather than dialing a new one.
    let _lease2 = pool.acquire(address()).expect("acquire reused connection");
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn a_failed_validation_round_trip_disposes_the_connection() {
    let calls = Arc::new(Mutex::new(0));
    let connector = StubConnector {
        reset_acks: 0, // no RESET ack scripted: the validation round-trip fails
        calls: Arc::clone(&calls),
    };
    let settings = PoolSettings {
        idle_time_before_connection_test: Duration::from_nanos(1),
        ..Default::default()
    };
    let pool = Pool::new(connector, settings);

    let lease = pool.acquire(address()).expect("acquire");
    std::thread::sleep(Duration::from_millis(5));
    drop(lease);

    let _lease2 = pool.acquire(address()).expect("acquire after failed validation");
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[test]
fn closed_pool_rejects_further_acquires() {
    let calls = Arc::new(Mutex::new(0));
    let connector = StubConnector {
        reset_acks: 0,
        calls: Arc::clone(&calls),
    };
    let pool = Pool::new(connector, PoolSettings::default());

    let lease = pool.acquire(address()).expect("acquire");
    drop(lease);
    pool.close();

    let err = pool.acquire(address()).expect_err("pool is closed");
    assert!(matches!(err, Error::PoolClosed));
}
