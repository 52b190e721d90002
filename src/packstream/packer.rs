//! The PackStream packer: narrowest-fit length-encoded integers/strings
//! written against the fixed PackStream marker table.

use super::marker::*;
use super::traits::PackOutput;
use crate::error::{Error, Result};

pub struct Packer<'a, O: PackOutput> {
    out: &'a mut O,
}

impl<'a, O: PackOutput> Packer<'a, O> {
    pub fn new(out: &'a mut O) -> Self {
        Self { out }
    }

    pub fn pack_null(&mut self) -> Result<()> {
        self.out.write_u8(NULL)
    }

    pub fn pack_bool(&mut self, value: bool) -> Result<()> {
        self.out.write_u8(if value { TRUE } else { FALSE })
    }

    /// Selects the narrowest of {TINY_INT, INT_8, INT_16, INT_32, INT_64};
    /// TINY_INT covers `-16..=127` inclusive.
    pub fn pack_int(&mut self, value: i64) -> Result<()> {
        if (TINY_INT_MIN..=TINY_INT_MAX).contains(&value) {
            self.out.write_u8(value as i8 as u8)
        } else if (i8::MIN as i64..TINY_INT_MIN).contains(&value) {
            self.out.write_u8(INT_8)?;
            self.out.write_u8(value as i8 as u8)
        } else if (i16::MIN as i64..i16::MAX as i64 + 1).contains(&value) {
            self.out.write_u8(INT_16)?;
            self.out.write_bytes(&(value as i16).to_be_bytes())
        } else if (i32::MIN as i64..i32::MAX as i64 + 1).contains(&value) {
            self.out.write_u8(INT_32)?;
            self.out.write_bytes(&(value as i32).to_be_bytes())
        } else {
            self.out.write_u8(INT_64)?;
            self.out.write_bytes(&value.to_be_bytes())
        }
    }

    pub fn pack_float(&mut self, value: f64) -> Result<()> {
        self.out.write_u8(FLOAT_64)?;
        self.out.write_bytes(&value.to_bits().to_be_bytes())
    }

    pub fn pack_bytes(&mut self, value: &[u8]) -> Result<()> {
        let len = value.len();
        if len <= 127 {
            self.out.write_u8(BYTES_8)?;
            self.out.write_u8(len as u8)?;
        } else if len <= u16::MAX as usize {
            self.out.write_u8(BYTES_16)?;
            self.out.write_bytes(&(len as u16).to_be_bytes())?;
        } else if len <= u32::MAX as usize {
            self.out.write_u8(BYTES_32)?;
            self.out.write_bytes(&(len as u32).to_be_bytes())?;
        } else {
            return Err(Error::StructureFieldOverflow(len));
        }
        self.out.write_bytes(value)
    }

    /// Selects among `{TINY_STRING (<16), STRING_8 (<=127), STRING_16
    /// (<65536), STRING_32}`.
    pub fn pack_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let len = bytes.len();
        if len < 16 {
            self.out.write_u8(TINY_STRING | len as u8)?;
        } else if len <= 127 {
            self.out.write_u8(STRING_8)?;
            self.out.write_u8(len as u8)?;
        } else if len < u16::MAX as usize {
            self.out.write_u8(STRING_16)?;
            self.out.write_bytes(&(len as u16).to_be_bytes())?;
        } else if len <= u32::MAX as usize {
            self.out.write_u8(STRING_32)?;
            self.out.write_bytes(&(len as u32).to_be_bytes())?;
        } else {
            return Err(Error::StructureFieldOverflow(len));
        }
        self.out.write_bytes(bytes)
    }

    pub fn pack_list_header(&mut self, count: usize) -> Result<()> {
        if count < 16 {
            self.out.write_u8(TINY_LIST | count as u8)
        } else if count <= 127 {
            self.out.write_u8(LIST_8)?;
            self.out.write_u8(count as u8)
        } else if count <= u16::MAX as usize {
            self.out.write_u8(LIST_16)?;
            self.out.write_bytes(&(count as u16).to_be_bytes())
        } else if count <= u32::MAX as usize {
            self.out.write_u8(LIST_32)?;
            self.out.write_bytes(&(count as u32).to_be_bytes())
        } else {
            Err(Error::StructureFieldOverflow(count))
        }
    }

    /// `count` is the number of key/value pairs, not the number of fields.
    pub fn pack_map_header(&mut self, count: usize) -> Result<()> {
        if count < 16 {
            self.out.write_u8(TINY_MAP | count as u8)
        } else if count <= 127 {
            self.out.write_u8(MAP_8)?;
            self.out.write_u8(count as u8)
        } else if count <= u16::MAX as usize {
            self.out.write_u8(MAP_16)?;
            self.out.write_bytes(&(count as u16).to_be_bytes())
        } else if count <= u32::MAX as usize {
            self.out.write_u8(MAP_32)?;
            self.out.write_bytes(&(count as u32).to_be_bytes())
        } else {
            Err(Error::StructureFieldOverflow(count))
        }
    }

    pub fn pack_struct_header(&mut self, field_count: usize, signature: u8) -> Result<()> {
        if field_count < 16 {
            self.out.write_u8(TINY_STRUCT | field_count as u8)?;
        } else if field_count <= u8::MAX as usize {
            self.out.write_u8(STRUCT_8)?;
            self.out.write_u8(field_count as u8)?;
        } else if field_count <= u16::MAX as usize {
            self.out.write_u8(STRUCT_16)?;
            self.out.write_bytes(&(field_count as u16).to_be_bytes())?;
        } else {
            return Err(Error::StructureFieldOverflow(field_count));
        }
        self.out.write_u8(signature)
    }

    /// Packs a generic [`Value`](crate::packstream::Value), recursing into
    /// lists/maps/structs. Unknown cases cannot arise since `Value` is
    /// closed, but a codec-only caller building its own tree could still
    /// hand us something unrepresentable in principle — hence `Unpackable`
    /// stays reachable even though dead here today.
    pub fn pack_value(&mut self, value: &crate::packstream::Value) -> Result<()> {
        use crate::packstream::Value;
        match value {
            Value::Null => self.pack_null(),
            Value::Bool(b) => self.pack_bool(*b),
            Value::Int(i) => self.pack_int(*i),
            Value::Float(f) => self.pack_float(*f),
            Value::Bytes(b) => self.pack_bytes(b),
            Value::String(s) => self.pack_string(s),
            Value::List(items) => {
                self.pack_list_header(items.len())?;
                for item in items {
                    self.pack_value(item)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                self.pack_map_header(map.len())?;
                for (key, value) in map.iter() {
                    self.pack_string(key)?;
                    self.pack_value(value)?;
                }
                Ok(())
            }
            Value::Struct { signature, fields } => {
                self.pack_struct_header(fields.len(), *signature)?;
                for field in fields {
                    self.pack_value(field)?;
                }
                Ok(())
            }
        }
    }
}
