//! The protocol session: a single Bolt/1 connection driving requests
//! through to a `ResponseHandler` and tracking the Idle / Pending / Failed
//! / Interrupted state machine. Owns one `Channel`, pipelines writes ahead
//! of reads, and exposes a handful of "do I still work" predicates the
//! pool consults before handing a connection back out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{trace, warn};

use crate::collector::{Collector, ResetCollector};
use crate::error::{Error, Result};
use crate::handler::{Outcome, ResponseHandler};
use crate::handshake;
use crate::io::{Channel, ChunkedInput, ChunkedOutput};
use crate::message::{Request, Response};
use crate::packstream::OrderedMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending,
    Failed,
    Interrupted,
}

/// Released by `Drop`; guards against the session being driven from two
/// threads at once. Owns an `Arc` clone rather than borrowing, so it
/// doesn't tie up any field of `SocketConnection` for its lifetime.
struct ReentrantGuard(Arc<AtomicBool>);

impl ReentrantGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ConcurrentSessionUse);
        }
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for ReentrantGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A live Bolt/1 connection. One `SocketConnection` per session.
pub struct SocketConnection {
    channel: Channel,
    handler: ResponseHandler,
    /// Requests that have been accepted by `run`/`pull_all`/… but not yet
    /// written to the wire; `flush`/`sync` drain this in order.
    pending: VecDeque<(Request, Box<dyn Collector>)>,
    state: State,
    in_use: Arc<AtomicBool>,
    server_agent: Option<String>,
    protocol_version: u32,
}

impl SocketConnection {
    /// Performs the version handshake and returns a freshly connected,
    /// un-initialized session. `init` must be called before any other
    /// request.
    pub fn connect(mut channel: Channel) -> Result<Self> {
        let protocol_version = handshake::perform(&mut channel)?;
        Ok(Self {
            channel,
            handler: ResponseHandler::new(),
            pending: VecDeque::new(),
            state: State::Idle,
            in_use: Arc::new(AtomicBool::new(false)),
            server_agent: None,
            protocol_version,
        })
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// The server identification string captured from `INIT`'s `SUCCESS`
    /// metadata.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.state, State::Interrupted)
    }

    /// `INIT` is sent and its reply consumed synchronously, ahead of any
    /// pipelining — every other request assumes the session is already
    /// identified.
    pub fn init(&mut self, client_name: &str, auth_token: OrderedMap) -> Result<()> {
        let _guard = ReentrantGuard::acquire(&self.in_use)?;
        let request = Request::Init {
            client_name: client_name.to_string(),
            auth_token,
        };
        self.write_now(&request)?;
        match self.read_response()? {
            Response::Success(metadata) => {
                self.server_agent = metadata
                    .get("server")
                    .and_then(crate::packstream::Value::as_str)
                    .map(str::to_owned);
                Ok(())
            }
            Response::Failure { code, message } => {
                self.state = State::Failed;
                Err(Error::ServerFailure { code, message })
            }
            _ => Err(Error::from_debug("unexpected response to INIT")),
        }
    }

    pub fn run(&mut self, statement: &str, parameters: OrderedMap, collector: Box<dyn Collector>) -> Result<()> {
        self.enqueue(
            Request::Run {
                statement: statement.to_string(),
                parameters,
            },
            collector,
        )
    }

    pub fn discard_all(&mut self, collector: Box<dyn Collector>) -> Result<()> {
        self.enqueue(Request::DiscardAll, collector)
    }

    pub fn pull_all(&mut self, collector: Box<dyn Collector>) -> Result<()> {
        self.enqueue(Request::PullAll, collector)
    }

    /// Valid only while `is_failed()`; clears the server-side failure so
    /// the session can resume sending requests once its `SUCCESS` is
    /// consumed.
    pub fn ack_failure(&mut self, collector: Box<dyn Collector>) -> Result<()> {
        if self.state != State::Failed {
            return Err(Error::from_debug("ACK_FAILURE sent while not in a failed state"));
        }
        self.enqueue(Request::AckFailure, collector)
    }

    /// Sends `RESET` immediately, out-of-band of any pending pipeline. Any
    /// requests that were queued but not yet written are dropped and
    /// reported as ignored, since the server will never see them once
    /// RESET interrupts the stream.
    pub fn reset_async(&mut self) -> Result<()> {
        let _guard = ReentrantGuard::acquire(&self.in_use)?;
        for (_, mut collector) in self.pending.drain(..) {
            collector.on_ignored();
            collector.on_complete();
        }
        self.write_now(&Request::Reset)?;
        self.handler.queue(Box::new(ResetCollector::default()));
        self.state = State::Interrupted;
        Ok(())
    }

    /// Writes every pending request to the wire without reading any
    /// responses back.
    pub fn flush(&mut self) -> Result<()> {
        let _guard = ReentrantGuard::acquire(&self.in_use)?;
        self.flush_locked()
    }

    /// Flushes pending requests, then reads responses until every
    /// outstanding collector (the ones just flushed, plus any sent
    /// earlier) has completed.
    pub fn sync(&mut self) -> Result<()> {
        let _guard = ReentrantGuard::acquire(&self.in_use)?;
        self.flush_locked()?;
        while !self.handler.is_idle() {
            self.receive_one_locked()?;
        }
        Ok(())
    }

    /// Reads and dispatches exactly one response, so callers can pull
    /// records one at a time instead of buffering the whole result in
    /// `sync`.
    pub fn receive_one(&mut self) -> Result<()> {
        let _guard = ReentrantGuard::acquire(&self.in_use)?;
        self.receive_one_locked()
    }

    fn enqueue(&mut self, request: Request, collector: Box<dyn Collector>) -> Result<()> {
        let _guard = ReentrantGuard::acquire(&self.in_use)?;
        if self.state == State::Interrupted {
            return Err(Error::from_debug("session is interrupted, awaiting RESET acknowledgement"));
        }
        self.pending.push_back((request, collector));
        if self.state == State::Idle {
            self.state = State::Pending;
        }
        Ok(())
    }

    fn flush_locked(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut out = ChunkedOutput::new(&mut self.channel);
        let drained: Vec<_> = self.pending.drain(..).collect();
        for (request, _) in &drained {
            request.write(&mut out)?;
            out.message_boundary()?;
        }
        for (_, collector) in drained {
            self.handler.queue(collector);
        }
        Ok(())
    }

    fn receive_one_locked(&mut self) -> Result<()> {
        let response = self.read_response()?;
        let was_success = matches!(&response, Response::Success(_));
        match self.handler.handle(response)? {
            Outcome::RecordRouted => {}
            Outcome::Terminal { collector, failure } => {
                if let Some(err) = failure {
                    warn!(error = %err, "server reported a failure");
                    self.state = State::Failed;
                } else if was_success && self.handler.is_idle() {
                    // A SUCCESS with nothing left in flight means the
                    // session is usable again, whether that SUCCESS closed
                    // out an ordinary drain, an ACK_FAILURE clearing
                    // `Failed`, or a RESET clearing `Interrupted`.
                    if collector.is_reset_ack() {
                        trace!("RESET acknowledged, session resuming");
                    }
                    self.state = State::Idle;
                }
            }
        }
        Ok(())
    }

    /// Writes one request and flushes the socket immediately, bypassing
    /// the pending queue — used only for `INIT` and `RESET`, the two
    /// requests treated as synchronous/out-of-band.
    fn write_now(&mut self, request: &Request) -> Result<()> {
        let mut out = ChunkedOutput::new(&mut self.channel);
        request.write(&mut out)?;
        out.message_boundary()
    }

    fn read_response(&mut self) -> Result<Response> {
        let mut input = ChunkedInput::new(&mut self.channel);
        Response::read(&mut input)
    }
}

/// Connection bring-up parameters. URI parsing and auth-token shape stay
/// outside this crate.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub address: (String, u16),
    pub connection_timeout: Duration,
}

impl SocketConnection {
    pub fn open(settings: &ConnectionSettings) -> Result<Self> {
        let channel =
            Channel::connect_tcp(&settings.address.0, settings.address.1, settings.connection_timeout)?;
        Self::connect(channel)
    }
}
