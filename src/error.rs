use std::time::Duration;

use thiserror::Error;

pub use color_eyre::eyre;

pub type Result<T> = core::result::Result<T, Error>;

/// Every error the core can produce, grouped into four categories:
/// transport, codec, server failure, and usage.
#[derive(Debug, Error)]
pub enum Error {
    // -- Transport --------------------------------------------------------
    #[error("cannot connect to {address}: {cause}")]
    CannotConnect { address: String, cause: String },

    #[error("read failed: {0}")]
    ReadFailure(#[source] std::io::Error),

    #[error("unexpected end of stream")]
    EndOfStream,

    #[error("write failed: {0}")]
    WriteFailure(#[source] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("TLS failure: {0}")]
    SslFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    // -- Codec --------------------------------------------------------
    #[error("input failure: {0}")]
    InputFailure(String),

    #[error("output failure: {0}")]
    OutputFailure(String),

    #[error("unexpected PackStream marker: {0:#04x}")]
    UnexpectedType(u8),

    #[error("invalid structure signature: {0:#04x}")]
    InvalidStructureSignature(u8),

    #[error("invalid struct size: expected {expected}, got {actual}")]
    InvalidStructSize { expected: usize, actual: usize },

    #[error("structure has {0} fields, which overflows the 16-bit field count")]
    StructureFieldOverflow(usize),

    #[error("unsupported PackStream type")]
    UnsupportedType,

    #[error("value cannot be packed")]
    Unpackable,

    #[error("decoded size does not fit the platform's index type")]
    CannotRepresent,

    // -- Server failure --------------------------------------------------
    #[error("server failure {code}: {message}")]
    ServerFailure { code: String, message: String },

    // -- Usage ------------------------------------------------------------
    #[error("this session was already closed")]
    SessionReused,

    #[error(
        "You are using a session from multiple locations at the same time, which is not supported"
    )]
    ConcurrentSessionUse,

    #[error("transaction has already failed and must be rolled back")]
    TransactionAlreadyFailed,

    #[error("a RESET was sent but its SUCCESS response was never consumed")]
    ResetNotConsumed,

    #[error("pool exhausted: no session became available within {0:?}")]
    PoolFull(Duration),

    #[error("pool has been closed")]
    PoolClosed,

    // -- Handshake ---------------------------------------------------------
    #[error("server does not support any proposed protocol version")]
    NoSupportedProtocolVersion,

    #[error("server appears to be a plain HTTP endpoint, not a Bolt port")]
    HttpEndpoint,

    #[error("server proposed an unexpected protocol version: {0:#010x}")]
    UnexpectedProtocolVersion(u32),

    /// An invariant the codec/session should never violate. Kept as a
    /// catch-all for "this can't happen" states.
    #[error("internal bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre::eyre!(format!("{:#?}", err)))
    }

    /// Server failures outside {ClientError, TransientError}, and any
    /// `Neo.ClientError.Request.*` code, are unrecoverable; everything else
    /// (transport, codec) is always unrecoverable too since it implies a
    /// dead or desynced connection.
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            Error::ServerFailure { code, .. } => is_unrecoverable_code(code),
            Error::CannotConnect { .. }
            | Error::ReadFailure(_)
            | Error::EndOfStream
            | Error::WriteFailure(_)
            | Error::ConnectionClosed
            | Error::SslFailure(_)
            | Error::InputFailure(_)
            | Error::OutputFailure(_)
            | Error::UnexpectedType(_)
            | Error::InvalidStructureSignature(_)
            | Error::InvalidStructSize { .. }
            | Error::StructureFieldOverflow(_)
            | Error::UnsupportedType
            | Error::Unpackable
            | Error::CannotRepresent => true,
            _ => false,
        }
    }

    /// Any code beginning with `Neo.ClientError.Request` is a protocol violation.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Error::ServerFailure { code, .. } => is_protocol_violation_code(code),
            _ => false,
        }
    }
}

fn is_protocol_violation_code(code: &str) -> bool {
    code.starts_with("Neo.ClientError.Request")
}

fn is_unrecoverable_code(code: &str) -> bool {
    if is_protocol_violation_code(code) {
        return true;
    }
    let classification = code.split('.').nth(1).unwrap_or("");
    !matches!(classification, "ClientError" | "TransientError")
}

impl From<core::convert::Infallible> for Error {
    fn from(err: core::convert::Infallible) -> Self {
        match err {}
    }
}

/// The four user-facing exception types, produced exactly once at the API
/// boundary via [`public_exception`].
#[derive(Debug, Error)]
pub enum PublicError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Maps an internal [`Error`] onto the public exception hierarchy. This is
/// the single point of translation; every variant must be handled here,
/// following the classification taxonomy rather than falling back to a panic.
pub fn public_exception(err: &Error) -> PublicError {
    match err {
        Error::CannotConnect { .. }
        | Error::ReadFailure(_)
        | Error::EndOfStream
        | Error::WriteFailure(_)
        | Error::ConnectionClosed
        | Error::SslFailure(_) => PublicError::ServiceUnavailable(err.to_string()),

        Error::InputFailure(_)
        | Error::OutputFailure(_)
        | Error::UnexpectedType(_)
        | Error::InvalidStructureSignature(_)
        | Error::InvalidStructSize { .. }
        | Error::StructureFieldOverflow(_)
        | Error::UnsupportedType
        | Error::Unpackable
        | Error::CannotRepresent
        | Error::SessionReused
        | Error::ConcurrentSessionUse
        | Error::TransactionAlreadyFailed
        | Error::ResetNotConsumed
        | Error::PoolFull(_)
        | Error::PoolClosed
        | Error::NoSupportedProtocolVersion
        | Error::HttpEndpoint
        | Error::UnexpectedProtocolVersion(_) => PublicError::Client(err.to_string()),

        Error::ServerFailure { code, message } => {
            let classification = code.split('.').nth(1).unwrap_or("");
            match classification {
                "ClientError" => PublicError::Client(message.clone()),
                "TransientError" => PublicError::Transient(message.clone()),
                _ => PublicError::Database(message.clone()),
            }
        }

        Error::LibraryBug(report) => PublicError::Database(report.to_string()),
    }
}
