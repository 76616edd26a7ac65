//! Value type enumeration

use std::fmt;

use crate::constants::*;
use crate::error::{FlowError, Result};

/// Discriminant of a [`Value`](crate::Value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// Absent value
    Nil = 0,
    /// Boolean value
    Boolean = 1,
    /// Integer in `[-2^63, 2^64-1]`
    Integer = 2,
    /// Double precision float
    Float = 3,
    /// UTF-8 string
    String = 4,
    /// Opaque bytes
    Binary = 5,
    /// Ordered sequence of values
    Array = 6,
    /// Sequence of key/value pairs
    Map = 7,
    /// Application-defined type code plus payload
    Extension = 8,
}

impl ValueType {
    /// Every variant, in discriminant order.
    pub const ALL: [ValueType; 9] = [
        ValueType::Nil,
        ValueType::Boolean,
        ValueType::Integer,
        ValueType::Float,
        ValueType::String,
        ValueType::Binary,
        ValueType::Array,
        ValueType::Map,
        ValueType::Extension,
    ];

    /// Lowercase name used in messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Nil => "nil",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Binary => "binary",
            ValueType::Array => "array",
            ValueType::Map => "map",
            ValueType::Extension => "extension",
        }
    }

    /// True for integer and float.
    pub fn is_number_type(self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }

    /// True for string and binary.
    pub fn is_raw_type(self) -> bool {
        matches!(self, ValueType::String | ValueType::Binary)
    }

    /// Classify the first byte of an encoded value.
    pub fn from_wire_tag(tag: u8) -> Result<Self> {
        match tag {
            0x00..=POSFIXINT_MAX | NEGFIXINT_PREFIX..=0xff => Ok(ValueType::Integer),
            FIXMAP_PREFIX..=0x8f | MAP16 | MAP32 => Ok(ValueType::Map),
            FIXARRAY_PREFIX..=0x9f | ARRAY16 | ARRAY32 => Ok(ValueType::Array),
            FIXSTR_PREFIX..=0xbf | STR8 | STR16 | STR32 => Ok(ValueType::String),
            NIL => Ok(ValueType::Nil),
            FALSE | TRUE => Ok(ValueType::Boolean),
            BIN8 | BIN16 | BIN32 => Ok(ValueType::Binary),
            EXT8 | EXT16 | EXT32 | FIXEXT1..=FIXEXT16 => Ok(ValueType::Extension),
            FLOAT32 | FLOAT64 => Ok(ValueType::Float),
            UINT8..=UINT64 | INT8..=INT64 => Ok(ValueType::Integer),
            NEVER_USED => Err(FlowError::MalformedEncoding(
                "never-used tag 0xc1".to_string(),
            )),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_in_discriminant_order() {
        for (index, ty) in ValueType::ALL.iter().enumerate() {
            assert_eq!(*ty as usize, index);
        }
    }

    #[test]
    fn test_from_wire_tag_valid() {
        let cases = vec![
            (0x00, ValueType::Integer),
            (0x7f, ValueType::Integer),
            (0x85, ValueType::Map),
            (0x93, ValueType::Array),
            (0xa5, ValueType::String),
            (NIL, ValueType::Nil),
            (TRUE, ValueType::Boolean),
            (BIN16, ValueType::Binary),
            (EXT8, ValueType::Extension),
            (FIXEXT16, ValueType::Extension),
            (FLOAT32, ValueType::Float),
            (UINT64, ValueType::Integer),
            (INT8, ValueType::Integer),
            (STR32, ValueType::String),
            (MAP32, ValueType::Map),
            (0xe0, ValueType::Integer),
            (0xff, ValueType::Integer),
        ];

        for (tag, expected) in cases {
            assert_eq!(ValueType::from_wire_tag(tag).unwrap(), expected, "tag {tag:#x}");
        }
    }

    #[test]
    fn test_from_wire_tag_never_used() {
        match ValueType::from_wire_tag(NEVER_USED) {
            Err(FlowError::MalformedEncoding(msg)) => assert!(msg.contains("0xc1")),
            other => panic!("expected malformed encoding, got {other:?}"),
        }
    }

    #[test]
    fn test_every_tag_but_one_is_classified() {
        let rejected: Vec<u8> = (0..=255u8)
            .filter(|tag| ValueType::from_wire_tag(*tag).is_err())
            .collect();
        assert_eq!(rejected, vec![NEVER_USED]);
    }

    #[test]
    fn test_type_groups() {
        assert!(ValueType::Integer.is_number_type());
        assert!(ValueType::Float.is_number_type());
        assert!(!ValueType::String.is_number_type());
        assert!(ValueType::Binary.is_raw_type());
        assert!(!ValueType::Extension.is_raw_type());
        assert_eq!(ValueType::Map.to_string(), "map");
    }
}
