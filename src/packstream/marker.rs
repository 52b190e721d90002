//! The PackStream marker table, exhaustive over every type Bolt/1 needs.

pub const TINY_INT_MIN: i64 = -16;
pub const TINY_INT_MAX: i64 = 127;

pub const TINY_STRING: u8 = 0x80;
pub const TINY_LIST: u8 = 0x90;
pub const TINY_MAP: u8 = 0xA0;
pub const TINY_STRUCT: u8 = 0xB0;

pub const NULL: u8 = 0xC0;
pub const FLOAT_64: u8 = 0xC1;
pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

pub const BYTES_8: u8 = 0xCC;
pub const BYTES_16: u8 = 0xCD;
pub const BYTES_32: u8 = 0xCE;

pub const STRING_8: u8 = 0xD0;
pub const STRING_16: u8 = 0xD1;
pub const STRING_32: u8 = 0xD2;

pub const LIST_8: u8 = 0xD4;
pub const LIST_16: u8 = 0xD5;
pub const LIST_32: u8 = 0xD6;

pub const MAP_8: u8 = 0xD8;
pub const MAP_16: u8 = 0xD9;
pub const MAP_32: u8 = 0xDA;

pub const STRUCT_8: u8 = 0xDC;
pub const STRUCT_16: u8 = 0xDD;
/// Reserved; the unpacker must reject it rather than interpret it as a
/// struct form.
pub const RESERVED_DE: u8 = 0xDE;

/// The logical type a marker byte describes, returned by `peek_next_type`
/// without consuming the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackType {
    Null,
    Bool,
    Int,
    Float,
    Bytes,
    String,
    List,
    Map,
    Struct,
}

/// Classify a marker byte into its `PackType`, or `None` for a reserved
/// byte that must never be read as a value.
pub fn classify(marker: u8) -> Option<PackType> {
    match marker {
        0x00..=0x7F | 0xF0..=0xFF => Some(PackType::Int),
        TINY_STRING..=0x8F => Some(PackType::String),
        TINY_LIST..=0x9F => Some(PackType::List),
        TINY_MAP..=0xAF => Some(PackType::Map),
        TINY_STRUCT..=0xBF => Some(PackType::Struct),
        NULL => Some(PackType::Null),
        FLOAT_64 => Some(PackType::Float),
        FALSE | TRUE => Some(PackType::Bool),
        INT_8 | INT_16 | INT_32 | INT_64 => Some(PackType::Int),
        BYTES_8 | BYTES_16 | BYTES_32 => Some(PackType::Bytes),
        STRING_8 | STRING_16 | STRING_32 => Some(PackType::String),
        LIST_8 | LIST_16 | LIST_32 => Some(PackType::List),
        MAP_8 | MAP_16 | MAP_32 => Some(PackType::Map),
        STRUCT_8 | STRUCT_16 => Some(PackType::Struct),
        _ => None,
    }
}
