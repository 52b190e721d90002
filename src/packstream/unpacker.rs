//! The PackStream unpacker.

use super::marker::*;
use super::traits::PackInput;
use super::{OrderedMap, Value};
use crate::error::{Error, Result};

pub struct Unpacker<'a, I: PackInput> {
    input: &'a mut I,
}

impl<'a, I: PackInput> Unpacker<'a, I> {
    pub fn new(input: &'a mut I) -> Self {
        Self { input }
    }

    /// Look at the next marker's logical type without consuming it.
    pub fn peek_next_type(&mut self) -> Result<PackType> {
        let marker = self.input.peek_u8()?;
        classify(marker).ok_or(Error::UnexpectedType(marker))
    }

    pub fn unpack_null(&mut self) -> Result<()> {
        let marker = self.input.read_u8()?;
        if marker == NULL {
            Ok(())
        } else {
            Err(Error::UnexpectedType(marker))
        }
    }

    pub fn unpack_bool(&mut self) -> Result<bool> {
        match self.input.read_u8()? {
            TRUE => Ok(true),
            FALSE => Ok(false),
            marker => Err(Error::UnexpectedType(marker)),
        }
    }

    pub fn unpack_int(&mut self) -> Result<i64> {
        let marker = self.input.read_u8()?;
        match marker {
            0x00..=0x7F => Ok(marker as i64),
            0xF0..=0xFF => Ok(marker as i8 as i64),
            INT_8 => Ok(self.read_i8()? as i64),
            INT_16 => Ok(self.read_i16()? as i64),
            INT_32 => Ok(self.read_i32()? as i64),
            INT_64 => self.read_i64(),
            _ => Err(Error::UnexpectedType(marker)),
        }
    }

    pub fn unpack_float(&mut self) -> Result<f64> {
        let marker = self.input.read_u8()?;
        if marker != FLOAT_64 {
            return Err(Error::UnexpectedType(marker));
        }
        let bytes = self.input.read_exact(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        Ok(f64::from_bits(u64::from_be_bytes(buf)))
    }

    pub fn unpack_bytes(&mut self) -> Result<Vec<u8>> {
        let marker = self.input.read_u8()?;
        let len = match marker {
            BYTES_8 => self.read_u8_len()?,
            BYTES_16 => self.read_u16_len()?,
            BYTES_32 => self.read_u32_len()?,
            _ => return Err(Error::UnexpectedType(marker)),
        };
        self.input.read_exact(len)
    }

    pub fn unpack_string(&mut self) -> Result<String> {
        let marker = self.input.read_u8()?;
        let len = match marker {
            TINY_STRING..=0x8F => (marker & 0x0F) as usize,
            STRING_8 => self.read_u8_len()?,
            STRING_16 => self.read_u16_len()?,
            STRING_32 => self.read_u32_len()?,
            _ => return Err(Error::UnexpectedType(marker)),
        };
        let bytes = self.input.read_exact(len)?;
        simdutf8::basic::from_utf8(&bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InputFailure("string is not valid UTF-8".to_string()))
    }

    pub fn unpack_list_header(&mut self) -> Result<usize> {
        let marker = self.input.read_u8()?;
        match marker {
            TINY_LIST..=0x9F => Ok((marker & 0x0F) as usize),
            LIST_8 => self.read_u8_len(),
            LIST_16 => self.read_u16_len(),
            LIST_32 => self.read_u32_len(),
            _ => Err(Error::UnexpectedType(marker)),
        }
    }

    pub fn unpack_map_header(&mut self) -> Result<usize> {
        let marker = self.input.read_u8()?;
        match marker {
            TINY_MAP..=0xAF => Ok((marker & 0x0F) as usize),
            MAP_8 => self.read_u8_len(),
            MAP_16 => self.read_u16_len(),
            MAP_32 => self.read_u32_len(),
            _ => Err(Error::UnexpectedType(marker)),
        }
    }

    /// Returns `(field_count, signature)`. Rejects `RESERVED_DE` (0xDE)
    /// rather than interpret it as a 32-bit struct form that was never
    /// specified.
    pub fn unpack_struct_header(&mut self) -> Result<(usize, u8)> {
        let marker = self.input.read_u8()?;
        let field_count = match marker {
            TINY_STRUCT..=0xBF => (marker & 0x0F) as usize,
            STRUCT_8 => self.read_u8_len()?,
            STRUCT_16 => self.read_u16_len()?,
            RESERVED_DE => return Err(Error::InvalidStructureSignature(marker)),
            _ => return Err(Error::UnexpectedType(marker)),
        };
        let signature = self.input.read_u8()?;
        Ok((field_count, signature))
    }

    /// Decodes a full [`Value`] tree, dispatching on `peek_next_type`.
    pub fn unpack_value(&mut self) -> Result<Value> {
        match self.peek_next_type()? {
            PackType::Null => {
                self.unpack_null()?;
                Ok(Value::Null)
            }
            PackType::Bool => Ok(Value::Bool(self.unpack_bool()?)),
            PackType::Int => Ok(Value::Int(self.unpack_int()?)),
            PackType::Float => Ok(Value::Float(self.unpack_float()?)),
            PackType::Bytes => Ok(Value::Bytes(self.unpack_bytes()?)),
            PackType::String => Ok(Value::String(self.unpack_string()?)),
            PackType::List => {
                let count = self.unpack_list_header()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.unpack_value()?);
                }
                Ok(Value::List(items))
            }
            PackType::Map => {
                let count = self.unpack_map_header()?;
                let mut map = OrderedMap::new();
                for _ in 0..count {
                    let key = self.unpack_string()?;
                    let value = self.unpack_value()?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            PackType::Struct => {
                let (field_count, signature) = self.unpack_struct_header()?;
                let mut fields = Vec::with_capacity(field_count);
                for _ in 0..field_count {
                    fields.push(self.unpack_value()?);
                }
                Ok(Value::Struct { signature, fields })
            }
        }
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.input.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16> {
        let bytes = self.input.read_exact(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.input.read_exact(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.input.read_exact(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        Ok(i64::from_be_bytes(buf))
    }

    fn read_u8_len(&mut self) -> Result<usize> {
        Ok(self.input.read_u8()? as usize)
    }

    fn read_u16_len(&mut self) -> Result<usize> {
        let bytes = self.input.read_exact(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
    }

    /// A `STRING_32`/`BYTES_32`/`LIST_32`/`MAP_32` size that exceeds the
    /// platform's maximum index is a `CannotRepresent` error rather than a
    /// silent truncation.
    fn read_u32_len(&mut self) -> Result<usize> {
        let bytes = self.input.read_exact(4)?;
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        usize::try_from(len).map_err(|_| Error::CannotRepresent)
    }
}
