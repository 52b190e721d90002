//! Per-request response collectors: one small callback object per request,
//! handed to the session up front rather than returned after the round
//! trip, since a pipelined response can arrive well after the request that
//! produced it was written.

use std::fmt;

use crate::packstream::{OrderedMap, Value};

/// Only `on_success` is required; most collectors only care about one of
/// the five callbacks, so the rest default to a no-op rather than forcing
/// boilerplate overrides on every caller.
pub trait Collector: fmt::Debug + Send {
    fn on_success(&mut self, metadata: &OrderedMap);
    fn on_record(&mut self, _fields: &[Value]) {}
    fn on_failure(&mut self, _code: &str, _message: &str) {}
    fn on_ignored(&mut self) {}
    fn on_complete(&mut self) {}

    /// True only for the collector queued by `reset_async`; lets the
    /// session notice when the RESET it sent out-of-band has finally been
    /// acknowledged, without downcasting through `Any`.
    fn is_reset_ack(&self) -> bool {
        false
    }
}

/// Captures the server identification string from `INIT`'s `SUCCESS`
/// metadata (`"server"` key).
#[derive(Debug, Default)]
pub struct InitCollector {
    pub server_agent: Option<String>,
}

impl Collector for InitCollector {
    fn on_success(&mut self, metadata: &OrderedMap) {
        self.server_agent = metadata.get("server").and_then(Value::as_str).map(str::to_owned);
    }
}

/// `RUN`'s result: field names and any other metadata the server returns.
#[derive(Debug, Default)]
pub struct RunCollector {
    pub metadata: Option<OrderedMap>,
    pub failure: Option<(String, String)>,
}

impl Collector for RunCollector {
    fn on_success(&mut self, metadata: &OrderedMap) {
        self.metadata = Some(metadata.clone());
    }

    fn on_failure(&mut self, code: &str, message: &str) {
        self.failure = Some((code.to_string(), message.to_string()));
    }
}

/// `PULL_ALL`/`DISCARD_ALL`'s result: every `RECORD` received before the
/// terminating `SUCCESS`, plus that success's summary metadata.
#[derive(Debug, Default)]
pub struct StreamCollector {
    pub records: Vec<Vec<Value>>,
    pub summary: Option<OrderedMap>,
    pub failure: Option<(String, String)>,
}

impl Collector for StreamCollector {
    fn on_record(&mut self, fields: &[Value]) {
        self.records.push(fields.to_vec());
    }

    fn on_success(&mut self, metadata: &OrderedMap) {
        self.summary = Some(metadata.clone());
    }

    fn on_failure(&mut self, code: &str, message: &str) {
        self.failure = Some((code.to_string(), message.to_string()));
    }
}

/// `ACK_FAILURE`'s result: nothing beyond "did it succeed".
#[derive(Debug, Default)]
pub struct AckFailureCollector {
    pub acknowledged: bool,
}

impl Collector for AckFailureCollector {
    fn on_success(&mut self, _metadata: &OrderedMap) {
        self.acknowledged = true;
    }
}

/// `RESET`'s result. Once this collector's `SUCCESS` is consumed, the
/// session drops out of the interrupted state and any latched server
/// failure is cleared.
#[derive(Debug, Default)]
pub struct ResetCollector {
    pub acknowledged: bool,
}

impl Collector for ResetCollector {
    fn on_success(&mut self, _metadata: &OrderedMap) {
        self.acknowledged = true;
    }

    fn is_reset_ack(&self) -> bool {
        true
    }
}
