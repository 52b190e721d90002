//! The seam between the PackStream codec and whatever frames its bytes
//! (chunked output/input in this crate). Isolating byte movement behind
//! these two traits keeps `Packer`/`Unpacker` oblivious to chunk-boundary
//! bookkeeping.

use crate::error::Result;
use auto_impl::auto_impl;

#[auto_impl(&mut, Box)]
pub trait PackOutput {
    fn write_u8(&mut self, byte: u8) -> Result<()>;
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

#[auto_impl(&mut, Box)]
pub trait PackInput {
    /// Consume and return the next byte.
    fn read_u8(&mut self) -> Result<u8>;
    /// Look at the next byte without consuming it.
    fn peek_u8(&mut self) -> Result<u8>;
    /// Consume and return exactly `n` bytes.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>>;
}
