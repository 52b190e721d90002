//! Chunked message framing: batches PackStream bytes into chunks of at
//! most `MAX_CHUNK_SIZE`, each prefixed with a 16-bit big-endian length,
//! and marks the end of a logical message with a literal `0x00 0x00`.

use crate::error::{Error, Result};
use crate::io::channel::Channel;
use crate::packstream::traits::{PackInput, PackOutput};

pub const MAX_CHUNK_SIZE: usize = 65535;

/// Sits between the `Packer` and a [`Channel`]. Reserves two bytes for the
/// current chunk's length at chunk start and back-patches them once the
/// chunk closes (on overflow or at a message boundary).
pub struct ChunkedOutput<'a> {
    channel: &'a mut Channel,
    /// Always starts with a 2-byte placeholder header; `chunk.len() - 2` is
    /// the payload length accumulated so far for the chunk in progress.
    chunk: Vec<u8>,
}

impl<'a> ChunkedOutput<'a> {
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            channel,
            chunk: vec![0, 0],
        }
    }

    fn payload_len(&self) -> usize {
        self.chunk.len() - 2
    }

    fn close_chunk(&mut self) -> Result<()> {
        let len = self.payload_len();
        if len > 0 {
            let len_bytes = (len as u16).to_be_bytes();
            self.chunk[0] = len_bytes[0];
            self.chunk[1] = len_bytes[1];
            self.channel.write_all(&self.chunk)?;
            self.chunk.clear();
            self.chunk.extend_from_slice(&[0, 0]);
        }
        Ok(())
    }

    /// Close whatever chunk is pending (if any) and emit the literal
    /// `0x00 0x00` boundary — a message boundary is emitted even for an
    /// entirely empty payload.
    pub fn message_boundary(&mut self) -> Result<()> {
        self.close_chunk()?;
        self.channel.write_all(&[0, 0])?;
        self.channel.flush()?;
        Ok(())
    }

    fn push(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let room = MAX_CHUNK_SIZE - self.payload_len();
            let take = room.min(bytes.len());
            self.chunk.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.payload_len() == MAX_CHUNK_SIZE {
                self.close_chunk()?;
            }
        }
        Ok(())
    }
}

impl PackOutput for ChunkedOutput<'_> {
    fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.push(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.push(bytes)
    }
}

/// Mirrors [`ChunkedOutput`] on the read side: reads a 2-byte length; if
/// nonzero, serves that many bytes as payload before reading the next
/// length; a zero length ends the current message.
pub struct ChunkedInput<'a> {
    channel: &'a mut Channel,
    remaining_in_chunk: usize,
    peeked: Option<u8>,
}

impl<'a> ChunkedInput<'a> {
    pub fn new(channel: &'a mut Channel) -> Self {
        Self {
            channel,
            remaining_in_chunk: 0,
            peeked: None,
        }
    }

    fn read_chunk_length(&mut self) -> Result<u16> {
        let mut len_bytes = [0u8; 2];
        self.channel.read_exact(&mut len_bytes)?;
        Ok(u16::from_be_bytes(len_bytes))
    }

    /// Returns `false` once the zero-length message boundary has been read.
    fn ensure_bytes_available(&mut self) -> Result<bool> {
        while self.remaining_in_chunk == 0 {
            let len = self.read_chunk_length()?;
            if len == 0 {
                return Ok(false);
            }
            self.remaining_in_chunk = len as usize;
        }
        Ok(true)
    }

    fn next_raw_byte(&mut self) -> Result<u8> {
        if !self.ensure_bytes_available()? {
            return Err(Error::InputFailure(
                "attempted to read past the message boundary".to_string(),
            ));
        }
        let mut byte = [0u8; 1];
        self.channel.read_exact(&mut byte)?;
        self.remaining_in_chunk -= 1;
        Ok(byte[0])
    }
}

impl PackInput for ChunkedInput<'_> {
    fn read_u8(&mut self) -> Result<u8> {
        if let Some(byte) = self.peeked.take() {
            return Ok(byte);
        }
        self.next_raw_byte()
    }

    fn peek_u8(&mut self) -> Result<u8> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let byte = self.next_raw_byte()?;
        self.peeked = Some(byte);
        Ok(byte)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        if n == 0 {
            return Ok(out);
        }
        if let Some(byte) = self.peeked.take() {
            out.push(byte);
        }
        while out.len() < n {
            out.push(self.next_raw_byte()?);
        }
        Ok(out)
    }
}
