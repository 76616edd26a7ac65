//! MessagePack encoder

use bulkflow_format::constants::*;
use bulkflow_format::{FlowError, Integer, Result, Value};
use bytes::BufMut;
use smallvec::SmallVec;

/// Tag byte plus at most eight bytes of big-endian payload.
type Header = SmallVec<[u8; 9]>;

/// Encode `value` into `dst`.
///
/// The whole encoding is sized up front; if `dst` cannot take it the call
/// fails with [`FlowError::CapacityExceeded`] before writing anything.
pub fn encode<B: BufMut>(value: &Value, dst: &mut B) -> Result<()> {
    let needed = encoded_len(value)?;
    let available = dst.remaining_mut();
    if needed > available {
        return Err(FlowError::CapacityExceeded { needed, available });
    }
    write_value(value, dst)
}

/// Encode `value` into a fresh vector.
pub fn encode_to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(value)?);
    write_value(value, &mut out)?;
    Ok(out)
}

/// Encode `value` at the start of `dst`, returning the number of bytes written.
pub fn encode_to_slice(value: &Value, dst: &mut [u8]) -> Result<usize> {
    let available = dst.len();
    let mut cursor = &mut dst[..];
    encode(value, &mut cursor)?;
    Ok(available - cursor.len())
}

/// Exact number of bytes [`encode`] writes for `value`.
pub fn encoded_len(value: &Value) -> Result<usize> {
    let len = match value {
        Value::Nil | Value::Boolean(_) => 1,
        Value::Integer(i) => integer_header(*i).len(),
        Value::Float(_) => 9,
        Value::String(s) => length_header(s.len(), LengthFamily::Str)?.len() + s.len(),
        Value::Binary(b) => length_header(b.len(), LengthFamily::Bin)?.len() + b.len(),
        Value::Array(items) => {
            let mut total = length_header(items.len(), LengthFamily::Array)?.len();
            for item in items {
                total += encoded_len(item)?;
            }
            total
        }
        Value::Map(entries) => {
            let mut total = length_header(entries.len(), LengthFamily::Map)?.len();
            for (key, val) in entries {
                total += encoded_len(key)? + encoded_len(val)?;
            }
            total
        }
        Value::Extension(ext) => extension_header(ext.type_code, ext.data.len())?.len() + ext.data.len(),
    };
    Ok(len)
}

fn write_value<B: BufMut>(value: &Value, dst: &mut B) -> Result<()> {
    match value {
        Value::Nil => dst.put_u8(NIL),
        Value::Boolean(false) => dst.put_u8(FALSE),
        Value::Boolean(true) => dst.put_u8(TRUE),
        Value::Integer(i) => dst.put_slice(&integer_header(*i)),
        Value::Float(f) => {
            dst.put_u8(FLOAT64);
            dst.put_f64(*f);
        }
        Value::String(s) => {
            dst.put_slice(&length_header(s.len(), LengthFamily::Str)?);
            dst.put_slice(s.as_bytes());
        }
        Value::Binary(b) => {
            dst.put_slice(&length_header(b.len(), LengthFamily::Bin)?);
            dst.put_slice(b);
        }
        Value::Array(items) => {
            dst.put_slice(&length_header(items.len(), LengthFamily::Array)?);
            for item in items {
                write_value(item, dst)?;
            }
        }
        Value::Map(entries) => {
            dst.put_slice(&length_header(entries.len(), LengthFamily::Map)?);
            for (key, val) in entries {
                write_value(key, dst)?;
                write_value(val, dst)?;
            }
        }
        Value::Extension(ext) => {
            dst.put_slice(&extension_header(ext.type_code, ext.data.len())?);
            dst.put_slice(&ext.data);
        }
    }
    Ok(())
}

/// Smallest encoding of an integer.
pub(crate) fn integer_header(value: Integer) -> Header {
    let mut header = Header::new();
    let v = match value.as_i64() {
        Ok(v) => v,
        Err(_) => {
            header.push(UINT64);
            header.extend_from_slice(&value.to_u64().to_be_bytes());
            return header;
        }
    };

    if v >= 0 {
        if v <= i64::from(POSFIXINT_MAX) {
            header.push(v as u8);
        } else if let Ok(b) = u8::try_from(v) {
            header.push(UINT8);
            header.push(b);
        } else if let Ok(s) = u16::try_from(v) {
            header.push(UINT16);
            header.extend_from_slice(&s.to_be_bytes());
        } else if let Ok(w) = u32::try_from(v) {
            header.push(UINT32);
            header.extend_from_slice(&w.to_be_bytes());
        } else {
            header.push(UINT64);
            header.extend_from_slice(&(v as u64).to_be_bytes());
        }
    } else if v >= NEGFIXINT_MIN {
        header.push(v as i8 as u8);
    } else if let Ok(b) = i8::try_from(v) {
        header.push(INT8);
        header.push(b as u8);
    } else if let Ok(s) = i16::try_from(v) {
        header.push(INT16);
        header.extend_from_slice(&s.to_be_bytes());
    } else if let Ok(w) = i32::try_from(v) {
        header.push(INT32);
        header.extend_from_slice(&w.to_be_bytes());
    } else {
        header.push(INT64);
        header.extend_from_slice(&v.to_be_bytes());
    }
    header
}

#[derive(Debug, Clone, Copy)]
enum LengthFamily {
    Str,
    Bin,
    Array,
    Map,
}

impl LengthFamily {
    /// (fix prefix and its max length, 8-bit tag, 16-bit tag, 32-bit tag)
    fn tags(self) -> (Option<(u8, usize)>, Option<u8>, u8, u8) {
        match self {
            LengthFamily::Str => (Some((FIXSTR_PREFIX, FIXSTR_MAX_LEN)), Some(STR8), STR16, STR32),
            LengthFamily::Bin => (None, Some(BIN8), BIN16, BIN32),
            LengthFamily::Array => (
                Some((FIXARRAY_PREFIX, FIX_CONTAINER_MAX_LEN)),
                None,
                ARRAY16,
                ARRAY32,
            ),
            LengthFamily::Map => (
                Some((FIXMAP_PREFIX, FIX_CONTAINER_MAX_LEN)),
                None,
                MAP16,
                MAP32,
            ),
        }
    }
}

fn length_header(len: usize, family: LengthFamily) -> Result<Header> {
    let (fix, tag8, tag16, tag32) = family.tags();
    let mut header = Header::new();

    match fix {
        Some((prefix, max)) if len <= max => {
            header.push(prefix | len as u8);
            return Ok(header);
        }
        _ => {}
    }

    if let (Some(tag), Ok(l)) = (tag8, u8::try_from(len)) {
        header.push(tag);
        header.push(l);
    } else if let Ok(l) = u16::try_from(len) {
        header.push(tag16);
        header.extend_from_slice(&l.to_be_bytes());
    } else if let Ok(l) = u32::try_from(len) {
        header.push(tag32);
        header.extend_from_slice(&l.to_be_bytes());
    } else {
        return Err(FlowError::LimitExceeded(format!(
            "{family:?} length {len} exceeds the 32-bit wire limit"
        )));
    }
    Ok(header)
}

fn extension_header(type_code: i8, len: usize) -> Result<Header> {
    let mut header = Header::new();
    let fixed = match len {
        1 => Some(FIXEXT1),
        2 => Some(FIXEXT2),
        4 => Some(FIXEXT4),
        8 => Some(FIXEXT8),
        16 => Some(FIXEXT16),
        _ => None,
    };

    if let Some(tag) = fixed {
        header.push(tag);
    } else if let Ok(l) = u8::try_from(len) {
        header.push(EXT8);
        header.push(l);
    } else if let Ok(l) = u16::try_from(len) {
        header.push(EXT16);
        header.extend_from_slice(&l.to_be_bytes());
    } else if let Ok(l) = u32::try_from(len) {
        header.push(EXT32);
        header.extend_from_slice(&l.to_be_bytes());
    } else {
        return Err(FlowError::LimitExceeded(format!(
            "Extension length {len} exceeds the 32-bit wire limit"
        )));
    }
    header.push(type_code as u8);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkflow_format::ExtensionValue;

    fn bytes_of(value: Value) -> Vec<u8> {
        encode_to_vec(&value).unwrap()
    }

    #[test]
    fn test_integer_tiers() {
        let cases: Vec<(Value, Vec<u8>)> = vec![
            (Value::from(0i64), vec![0x00]),
            (Value::from(127i64), vec![0x7f]),
            (Value::from(128i64), vec![UINT8, 0x80]),
            (Value::from(256i64), vec![UINT16, 0x01, 0x00]),
            (Value::from(65_536i64), vec![UINT32, 0x00, 0x01, 0x00, 0x00]),
            (
                Value::from(1i64 << 32),
                vec![UINT64, 0, 0, 0, 1, 0, 0, 0, 0],
            ),
            (Value::from(-1i64), vec![0xff]),
            (Value::from(-32i64), vec![0xe0]),
            (Value::from(-33i64), vec![INT8, 0xdf]),
            (Value::from(-129i64), vec![INT16, 0xff, 0x7f]),
            (Value::from(-32_769i64), vec![INT32, 0xff, 0xff, 0x7f, 0xff]),
            (
                Value::from(i64::MIN),
                vec![INT64, 0x80, 0, 0, 0, 0, 0, 0, 0],
            ),
            (
                Value::from(u64::MAX),
                vec![UINT64, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(bytes_of(value.clone()), expected, "{value:?}");
        }
    }

    #[test]
    fn test_scalars() {
        assert_eq!(bytes_of(Value::Nil), vec![NIL]);
        assert_eq!(bytes_of(Value::from(true)), vec![TRUE]);
        assert_eq!(bytes_of(Value::from(false)), vec![FALSE]);
        let mut expected = vec![FLOAT64];
        expected.extend_from_slice(&1.5f64.to_be_bytes());
        assert_eq!(bytes_of(Value::Float(1.5)), expected);
    }

    #[test]
    fn test_string_tiers() {
        assert_eq!(bytes_of(Value::from("abc")), vec![0xa3, b'a', b'b', b'c']);
        let s32 = "x".repeat(32);
        assert_eq!(&bytes_of(Value::from(s32.as_str()))[..2], &[STR8, 32]);
        let s256 = "x".repeat(256);
        assert_eq!(&bytes_of(Value::from(s256.as_str()))[..3], &[STR16, 0x01, 0x00]);
        let s64k = "x".repeat(65_536);
        assert_eq!(
            &bytes_of(Value::from(s64k.as_str()))[..5],
            &[STR32, 0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_binary_has_no_fix_tier() {
        assert_eq!(bytes_of(Value::Binary(vec![])), vec![BIN8, 0]);
        assert_eq!(bytes_of(Value::Binary(vec![7])), vec![BIN8, 1, 7]);
    }

    #[test]
    fn test_container_tiers() {
        let small = Value::Array(vec![Value::Nil; 15]);
        assert_eq!(bytes_of(small)[0], 0x9f);
        let medium = Value::Array(vec![Value::Nil; 16]);
        assert_eq!(&bytes_of(medium)[..3], &[ARRAY16, 0x00, 0x10]);
        let map = Value::Map(vec![(Value::from(1i64), Value::Nil)]);
        assert_eq!(bytes_of(map), vec![0x81, 0x01, NIL]);
    }

    #[test]
    fn test_extension_tiers() {
        let fix = Value::Extension(ExtensionValue::new(5, vec![1, 2, 3, 4]));
        assert_eq!(bytes_of(fix), vec![FIXEXT4, 5, 1, 2, 3, 4]);
        let odd = Value::Extension(ExtensionValue::new(-1, vec![9, 9, 9]));
        assert_eq!(bytes_of(odd), vec![EXT8, 3, 0xff, 9, 9, 9]);
        let empty = Value::Extension(ExtensionValue::new(1, vec![]));
        assert_eq!(bytes_of(empty), vec![EXT8, 0, 1]);
    }

    #[test]
    fn test_encoded_len_matches_output() {
        let value = Value::Map(vec![
            (Value::from("ids"), Value::Array((0..20i64).map(Value::from).collect())),
            (Value::from("blob"), Value::Binary(vec![0; 300])),
            (Value::from("max"), Value::from(u64::MAX)),
        ]);
        assert_eq!(encoded_len(&value).unwrap(), bytes_of(value).len());
    }

    #[test]
    fn test_encode_to_slice_rejects_small_destination() {
        let value = Value::from("hello world");
        let mut small = [0u8; 4];
        match encode_to_slice(&value, &mut small) {
            Err(FlowError::CapacityExceeded { needed, available }) => {
                assert_eq!(needed, 12);
                assert_eq!(available, 4);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
        assert_eq!(small, [0u8; 4]);

        let mut big = [0u8; 32];
        assert_eq!(encode_to_slice(&value, &mut big).unwrap(), 12);
        assert_eq!(big[0], 0xab);
    }

    #[test]
    fn test_write_value_without_sizing_pass() {
        let value = Value::Array(vec![
            Value::from("x"),
            Value::Extension(ExtensionValue::new(3, vec![7; 5])),
        ]);
        let mut out = Vec::new();
        write_value(&value, &mut out).unwrap();
        assert_eq!(out, bytes_of(value));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_headers_are_errors() {
        let too_long = u32::MAX as usize + 1;
        for family in [
            LengthFamily::Str,
            LengthFamily::Bin,
            LengthFamily::Array,
            LengthFamily::Map,
        ] {
            assert!(matches!(
                length_header(too_long, family),
                Err(FlowError::LimitExceeded(_))
            ));
        }
        assert!(matches!(
            extension_header(0, too_long),
            Err(FlowError::LimitExceeded(_))
        ));
    }
}
