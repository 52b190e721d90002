//! Message format v1: each message is a PackStream `Struct` wrapped in
//! chunk framing, one struct per signature with a fixed, typed field list.
//! Bolt/1 only has nine message kinds total, so both directions fit in one
//! module instead of one file per command.

use crate::constant::Signature;
use crate::error::{Error, Result};
use crate::io::{ChunkedInput, ChunkedOutput};
use crate::packstream::{OrderedMap, PackOutput, Packer, Unpacker, Value};

/// A request-side message. `field_count` matches the wire field list for
/// `INIT`/`RUN` exactly; the no-field requests need no payload.
#[derive(Debug, Clone)]
pub enum Request {
    Init {
        client_name: String,
        auth_token: OrderedMap,
    },
    Run {
        statement: String,
        parameters: OrderedMap,
    },
    DiscardAll,
    PullAll,
    AckFailure,
    Reset,
}

impl Request {
    fn signature(&self) -> Signature {
        match self {
            Request::Init { .. } => Signature::Init,
            Request::Run { .. } => Signature::Run,
            Request::DiscardAll => Signature::DiscardAll,
            Request::PullAll => Signature::PullAll,
            Request::AckFailure => Signature::AckFailure,
            Request::Reset => Signature::Reset,
        }
    }

    fn field_count(&self) -> usize {
        match self {
            Request::Init { .. } | Request::Run { .. } => 2,
            Request::DiscardAll | Request::PullAll | Request::AckFailure | Request::Reset => 0,
        }
    }

    /// Writes `pack_struct_header(field_count, signature)` followed by each
    /// field, without closing the chunk — callers batch several messages
    /// before calling `message_boundary()`, to pipeline several requests
    /// onto the wire without waiting for each response in turn.
    pub fn write(&self, out: &mut ChunkedOutput<'_>) -> Result<()> {
        let mut packer = Packer::new(out);
        packer.pack_struct_header(self.field_count(), self.signature() as u8)?;
        match self {
            Request::Init {
                client_name,
                auth_token,
            } => {
                packer.pack_string(client_name)?;
                packer.pack_value(&Value::Map(auth_token.clone()))?;
            }
            Request::Run {
                statement,
                parameters,
            } => {
                packer.pack_string(statement)?;
                packer.pack_value(&Value::Map(parameters.clone()))?;
            }
            Request::DiscardAll | Request::PullAll | Request::AckFailure | Request::Reset => {}
        }
        Ok(())
    }
}

/// A response-side message.
#[derive(Debug, Clone)]
pub enum Response {
    Success(OrderedMap),
    Record(Vec<Value>),
    Ignored,
    Failure { code: String, message: String },
}

impl Response {
    /// Reads one `Struct` per message and dispatches on its signature.
    /// Callers read responses one at a time, in the order requests were sent.
    pub fn read(input: &mut ChunkedInput<'_>) -> Result<Self> {
        let mut unpacker = Unpacker::new(input);
        let (field_count, signature_byte) = unpacker.unpack_struct_header()?;
        let signature = Signature::from_byte(signature_byte)
            .ok_or(Error::InvalidStructureSignature(signature_byte))?;

        match signature {
            Signature::Success => {
                expect_fields(signature, field_count, 1)?;
                let meta = expect_map(unpacker.unpack_value()?)?;
                Ok(Response::Success(meta))
            }
            Signature::Record => {
                expect_fields(signature, field_count, 1)?;
                let fields = match unpacker.unpack_value()? {
                    Value::List(items) => items,
                    other => return Err(unexpected_value(&other)),
                };
                Ok(Response::Record(fields))
            }
            Signature::Ignored => {
                expect_fields(signature, field_count, 0)?;
                Ok(Response::Ignored)
            }
            Signature::Failure => {
                expect_fields(signature, field_count, 1)?;
                let meta = expect_map(unpacker.unpack_value()?)?;
                let code = meta
                    .get("code")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::InputFailure("FAILURE meta missing \"code\"".to_string())
                    })?
                    .to_string();
                let message = meta
                    .get("message")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::InputFailure("FAILURE meta missing \"message\"".to_string())
                    })?
                    .to_string();
                Ok(Response::Failure { code, message })
            }
            Signature::Init
            | Signature::Run
            | Signature::DiscardAll
            | Signature::PullAll
            | Signature::AckFailure
            | Signature::Reset => Err(Error::InvalidStructureSignature(signature_byte)),
        }
    }
}

fn expect_fields(signature: Signature, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::InvalidStructSize {
            expected,
            actual,
        })
        .map_err(|e| {
            tracing::warn!(?signature, actual, expected, "response field count mismatch");
            e
        })
    }
}

fn expect_map(value: Value) -> Result<OrderedMap> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(unexpected_value(&other)),
    }
}

fn unexpected_value(value: &Value) -> Error {
    let marker = match value {
        Value::Null => crate::packstream::marker::NULL,
        Value::Bool(_) => crate::packstream::marker::TRUE,
        Value::Int(_) => 0,
        Value::Float(_) => crate::packstream::marker::FLOAT_64,
        Value::Bytes(_) => crate::packstream::marker::BYTES_8,
        Value::String(_) => crate::packstream::marker::TINY_STRING,
        Value::List(_) => crate::packstream::marker::TINY_LIST,
        Value::Map(_) => crate::packstream::marker::TINY_MAP,
        Value::Struct { signature, .. } => *signature,
    };
    Error::UnexpectedType(marker)
}
