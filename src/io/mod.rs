pub mod channel;
pub mod chunking;

pub use channel::{ByteChannel, Channel};
pub use chunking::{ChunkedInput, ChunkedOutput, MAX_CHUNK_SIZE};
