//! Bolt/1 core: PackStream codec, chunked message framing, a protocol
//! session, and a connection pool. Grounded throughout on `elbaro-zero-mysql`
//! (see `DESIGN.md`); the user-facing query API, TLS handshake internals,
//! URI parsing, and auth-token shape are left to external callers.

pub mod collector;
pub mod constant;
pub mod error;
pub mod handler;
pub mod handshake;
pub mod io;
pub mod message;
pub mod packstream;
pub mod pool;
pub mod session;

pub use collector::{AckFailureCollector, Collector, InitCollector, ResetCollector, RunCollector, StreamCollector};
pub use error::{public_exception, Error, PublicError, Result};
pub use handler::{Outcome, ResponseHandler};
pub use message::{Request, Response};
pub use packstream::{OrderedMap, PackInput, PackOutput, Packer, Unpacker, Value};
pub use pool::{Connector, Lease, Pool, PoolSettings, PooledConnection};
pub use session::{ConnectionSettings, SocketConnection};
