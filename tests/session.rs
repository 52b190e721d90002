//! Protocol session state machine: INIT capturing the server agent, a
//! RUN+PULL_ALL happy path, a recoverable failure cleared by ACK_FAILURE,
//! and a RESET clearing an interrupted session.

mod support;

use pretty_assertions::assert_eq;

use bolt_core::collector::{AckFailureCollector, RunCollector, StreamCollector};
use bolt_core::packstream::{OrderedMap, Value};
use bolt_core::session::SocketConnection;

fn auth_token() -> OrderedMap {
    let mut map = OrderedMap::new();
    map.insert("scheme", Value::String("basic".to_string()));
    map.insert("principal", Value::String("u".to_string()));
    map.insert("credentials", Value::String("p".to_string()));
    map
}

/// Scenario 1: INIT's SUCCESS metadata exposes the server agent string.
#[test]
fn init_captures_the_server_agent() {
    let mut server_meta = OrderedMap::new();
    server_meta.insert("server", Value::String("Neo4j/3.0.0".to_string()));

    let mut wire = support::handshake_reply_v1();
    wire.extend(support::success_message(server_meta));

    let (channel, _written) = support::scripted_channel(wire);
    let mut session = SocketConnection::connect(channel).expect("connect");
    session.init("driver/1.0", auth_token()).expect("init");

    assert_eq!(session.server_agent(), Some("Neo4j/3.0.0"));
}

/// Scenario 2: RUN + PULL_ALL happy path, one RECORD, sync() succeeds.
#[test]
fn run_and_pull_all_happy_path() {
    let mut wire = support::handshake_reply_v1();
    wire.extend(support::success_message(OrderedMap::new())); // INIT
    wire.extend(support::success_message(OrderedMap::new())); // RUN
    wire.extend(support::record_message(vec![Value::Int(1)])); // RECORD
    wire.extend(support::success_message(OrderedMap::new())); // PULL_ALL

    let (channel, _written) = support::scripted_channel(wire);
    let mut session = SocketConnection::connect(channel).expect("connect");
    session.init("driver/1.0", auth_token()).expect("init");

    let (run_collector, run_handle) = support::Shared::new(RunCollector::default());
    session
        .run("RETURN 1", OrderedMap::new(), Box::new(run_collector))
        .expect("queue RUN");

    let (pull_collector, pull_handle) = support::Shared::new(StreamCollector::default());
    session.pull_all(Box::new(pull_collector)).expect("queue PULL_ALL");

    session.sync().expect("sync");

    assert!(run_handle.lock().unwrap().metadata.is_some());
    let pulled = pull_handle.lock().unwrap();
    assert_eq!(pulled.records, vec![vec![Value::Int(1)]]);
    assert!(pulled.summary.is_some());
    assert!(!session.is_failed());
}

/// Scenario 3: RUN fails, PULL_ALL is IGNORED, ACK_FAILURE recovers.
#[test]
fn recoverable_failure_then_ack_failure_recovers() {
    let mut wire = support::handshake_reply_v1();
    wire.extend(support::success_message(OrderedMap::new())); // INIT
    wire.extend(support::failure_message(
        "Neo.ClientError.Statement.SyntaxError",
        "bad statement",
    ));
    wire.extend(support::ignored_message()); // PULL_ALL ignored
    wire.extend(support::success_message(OrderedMap::new())); // ACK_FAILURE

    let (channel, _written) = support::scripted_channel(wire);
    let mut session = SocketConnection::connect(channel).expect("connect");
    session.init("driver/1.0", auth_token()).expect("init");

    let (run_collector, run_handle) = support::Shared::new(RunCollector::default());
    session.run("BAD", OrderedMap::new(), Box::new(run_collector)).expect("queue RUN");
    session
        .pull_all(Box::new(StreamCollector::default()))
        .expect("queue PULL_ALL");
    session.sync().expect("sync");

    assert!(session.is_failed());
    assert!(run_handle.lock().unwrap().failure.is_some());

    let (ack_collector, ack_handle) = support::Shared::new(AckFailureCollector::default());
    session
        .ack_failure(Box::new(ack_collector))
        .expect("queue ACK_FAILURE");
    session.sync().expect("sync");

    assert!(ack_handle.lock().unwrap().acknowledged);
    assert!(!session.is_failed());
}

/// Scenario 4, simplified: a RESET sent before the in-flight RUN/PULL_ALL
/// are drained interrupts the session; once RESET's own SUCCESS is
/// consumed the session is usable again. The real driver issues the RESET
/// from a second thread; the socket here is exercised from one thread in
/// strict script order since `Channel` is not `Sync`.
#[test]
fn reset_interrupts_and_then_recovers() {
    let mut wire = support::handshake_reply_v1();
    wire.extend(support::success_message(OrderedMap::new())); // INIT
    wire.extend(support::success_message(OrderedMap::new())); // RESET

    let (channel, _written) = support::scripted_channel(wire);
    let mut session = SocketConnection::connect(channel).expect("connect");
    session.init("driver/1.0", auth_token()).expect("init");

    session
        .run("RETURN 1", OrderedMap::new(), Box::new(RunCollector::default()))
        .expect("queue RUN");
    session
        .pull_all(Box::new(StreamCollector::default()))
        .expect("queue PULL_ALL");

    session.reset_async().expect("reset_async");
    assert!(session.is_interrupted());

    session.receive_one().expect("drain RESET ack");
    assert!(!session.is_interrupted());
}
