//! Shared test scaffolding: an in-memory duplex `ByteChannel` and helpers
//! for encoding the canned server replies used by the session/pool tests.
//! Placed as `tests/support/mod.rs` (rather than `tests/support.rs`) so it
//! isn't compiled as its own test binary.

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use bolt_core::collector::Collector;
use bolt_core::io::{ByteChannel, Channel};
use bolt_core::packstream::{OrderedMap, PackOutput, Packer, Value};

/// Wraps a collector in a shared handle so a test can keep inspecting it
/// after handing the `Box<dyn Collector>` half off to the session — the
/// session consumes and eventually drops the collector it was given, so
/// tests need their own reference to what it captured.
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    pub fn new(inner: T) -> (Self, Arc<Mutex<T>>) {
        let arc = Arc::new(Mutex::new(inner));
        (Self(Arc::clone(&arc)), arc)
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:?})", self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }
}

impl<T: Collector> Collector for Shared<T> {
    fn on_success(&mut self, metadata: &OrderedMap) {
        self.lock().on_success(metadata);
    }

    fn on_record(&mut self, fields: &[Value]) {
        self.lock().on_record(fields);
    }

    fn on_failure(&mut self, code: &str, message: &str) {
        self.lock().on_failure(code, message);
    }

    fn on_ignored(&mut self) {
        self.lock().on_ignored();
    }

    fn on_complete(&mut self) {
        self.lock().on_complete();
    }

    fn is_reset_ack(&self) -> bool {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).is_reset_ack()
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

pub struct Loopback {
    inbox: Cursor<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inbox.read(buf)
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds a channel that replays `server_bytes` on read and captures
/// whatever the caller writes in the returned handle.
pub fn scripted_channel(server_bytes: Vec<u8>) -> (Channel, Arc<Mutex<Vec<u8>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let loopback = Loopback {
        inbox: Cursor::new(server_bytes),
        written: Arc::clone(&written),
    };
    (Channel::new(Box::new(loopback) as Box<dyn ByteChannel>), written)
}

pub fn written(handle: &Arc<Mutex<Vec<u8>>>) -> Vec<u8> {
    handle
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone()
}

struct VecOutput(Vec<u8>);

impl PackOutput for VecOutput {
    fn write_u8(&mut self, byte: u8) -> bolt_core::Result<()> {
        self.0.push(byte);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> bolt_core::Result<()> {
        self.0.extend_from_slice(bytes);
        Ok(())
    }
}

fn chunk(payload: &[u8]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(payload.len() + 4);
    wire.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    wire.extend_from_slice(payload);
    wire.extend_from_slice(&[0, 0]);
    wire
}

/// Wire bytes for a `SUCCESS` message with the given metadata map.
pub fn success_message(metadata: OrderedMap) -> Vec<u8> {
    let mut out = VecOutput(Vec::new());
    let mut packer = Packer::new(&mut out);
    packer.pack_struct_header(1, 0x70).expect("pack SUCCESS");
    packer.pack_value(&Value::Map(metadata)).expect("pack metadata");
    chunk(&out.0)
}

/// Wire bytes for a `RECORD` message with the given field values.
pub fn record_message(fields: Vec<Value>) -> Vec<u8> {
    let mut out = VecOutput(Vec::new());
    let mut packer = Packer::new(&mut out);
    packer.pack_struct_header(1, 0x71).expect("pack RECORD");
    packer.pack_value(&Value::List(fields)).expect("pack fields");
    chunk(&out.0)
}

/// Wire bytes for a `FAILURE` message.
pub fn failure_message(code: &str, message: &str) -> Vec<u8> {
    let mut metadata = OrderedMap::new();
    metadata.insert("code", Value::String(code.to_string()));
    metadata.insert("message", Value::String(message.to_string()));
    let mut out = VecOutput(Vec::new());
    let mut packer = Packer::new(&mut out);
    packer.pack_struct_header(1, 0x7F).expect("pack FAILURE");
    packer.pack_value(&Value::Map(metadata)).expect("pack metadata");
    chunk(&out.0)
}

/// Wire bytes for an `IGNORED` message (no fields).
pub fn ignored_message() -> Vec<u8> {
    let mut out = VecOutput(Vec::new());
    Packer::new(&mut out).pack_struct_header(0, 0x7E).expect("pack IGNORED");
    chunk(&out.0)
}

/// A handshake reply agreeing to Bolt/1.
pub fn handshake_reply_v1() -> Vec<u8> {
    1u32.to_be_bytes().to_vec()
}
