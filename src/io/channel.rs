//! Byte I/O: a duplex byte channel abstraction over plain TCP or an
//! already-established TLS stream. TLS handshake internals are out of
//! scope: callers hand us an already-upgraded duplex stream and we treat
//! it exactly like a plain TCP socket from then on.

use std::io::{BufReader, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Error, Result};

/// Anything that can serve as the other end of a Bolt session: a blocking,
/// full-duplex byte stream. A TLS-wrapped socket satisfies this exactly as
/// well as a plain `TcpStream` — the session never distinguishes them.
pub trait ByteChannel: Read + Write + Send {}
impl<T: Read + Write + Send> ByteChannel for T {}

/// A connected, buffered duplex channel. Reads are served from a fixed-size
/// buffer that refills from the underlying channel on exhaustion; writes
/// go straight through, since the chunking layer above already batches
/// them into chunk-sized writes.
pub struct Channel {
    reader: BufReader<Box<dyn ByteChannel>>,
}

impl Channel {
    /// Default buffer capacity for the underlying `BufReader`.
    pub const BUFFER_CAPACITY: usize = 8192;

    pub fn new(channel: Box<dyn ByteChannel>) -> Self {
        Self {
            reader: BufReader::with_capacity(Self::BUFFER_CAPACITY, channel),
        }
    }

    pub fn connect_tcp(address: &str, port: u16, connection_timeout: Duration) -> Result<Self> {
        let addr = format!("{address}:{port}");
        let socket_addr = addr
            .parse()
            .or_else(|_| {
                use std::net::ToSocketAddrs;
                addr.to_socket_addrs()
                    .ok()
                    .and_then(|mut it| it.next())
                    .ok_or(Error::CannotConnect {
                        address: addr.clone(),
                        cause: "could not resolve address".to_string(),
                    })
            })
            .map_err(|_| Error::CannotConnect {
                address: addr.clone(),
                cause: "could not resolve address".to_string(),
            })?;

        let stream =
            TcpStream::connect_timeout(&socket_addr, connection_timeout).map_err(|e| {
                Error::CannotConnect {
                    address: addr.clone(),
                    cause: e.to_string(),
                }
            })?;
        stream.set_nodelay(true).map_err(Error::WriteFailure)?;
        Ok(Self::new(Box::new(stream)))
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::EndOfStream
            } else {
                Error::ReadFailure(e)
            }
        })
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.reader
            .get_mut()
            .write_all(buf)
            .map_err(Error::WriteFailure)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.reader.get_mut().flush().map_err(Error::WriteFailure)
    }
}
