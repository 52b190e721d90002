//! The Bolt/1 version handshake: one fixed exchange that must complete
//! before any request is allowed on the connection.

use crate::constant::{BOLT_V1, HTTP_MAGIC, MAGIC_PREAMBLE, NO_VERSION, PROPOSED_VERSIONS};
use crate::error::{Error, Result};
use crate::io::Channel;

/// Writes the magic preamble and four proposed versions, then reads the
/// server's chosen version and maps it onto one of three outcomes: agreed,
/// none-supported, or a non-Bolt (HTTP) endpoint.
pub fn perform(channel: &mut Channel) -> Result<u32> {
    channel.write_all(&MAGIC_PREAMBLE)?;
    for version in PROPOSED_VERSIONS {
        channel.write_all(&version.to_be_bytes())?;
    }
    channel.flush()?;

    let mut reply = [0u8; 4];
    channel.read_exact(&mut reply)?;
    let agreed = u32::from_be_bytes(reply);

    match agreed {
        BOLT_V1 => Ok(agreed),
        NO_VERSION => Err(Error::NoSupportedProtocolVersion),
        HTTP_MAGIC => Err(Error::HttpEndpoint),
        other => Err(Error::UnexpectedProtocolVersion(other)),
    }
}
