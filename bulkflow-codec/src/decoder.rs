//! MessagePack decoder

use bulkflow_format::constants::*;
use bulkflow_format::{ExtensionValue, FlowError, Integer, Limits, Result, Value, ValueType};
use bytes::Buf;

/// Streaming decoder over a byte slice holding one or more encoded values
pub struct Decoder<'a> {
    input: &'a [u8],
    total_len: usize,
    limits: Limits,
    failed: bool,
}

impl<'a> Decoder<'a> {
    /// Create a decoder with default limits.
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_limits(input, Limits::default())
    }

    /// Create a decoder with explicit limits.
    pub fn with_limits(input: &'a [u8], limits: Limits) -> Self {
        Self {
            input,
            total_len: input.len(),
            limits,
            failed: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.total_len - self.input.len()
    }

    /// True once every input byte has been consumed.
    pub fn is_finished(&self) -> bool {
        !self.input.has_remaining()
    }

    /// Variant of the next value without consuming it.
    pub fn peek_type(&self) -> Result<ValueType> {
        match self.input.first() {
            Some(tag) => ValueType::from_wire_tag(*tag),
            None => Err(FlowError::UnexpectedEof),
        }
    }

    /// Decode the next value.
    pub fn decode_value(&mut self) -> Result<Value> {
        let result = self.read_value(0);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.input.remaining() < n {
            Err(FlowError::UnexpectedEof)
        } else {
            Ok(())
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.input.get_u8())
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.input.get_u16())
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.input.get_u32())
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.input.get_u64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.need(len)?;
        let (head, tail) = self.input.split_at(len);
        self.input = tail;
        Ok(head)
    }

    fn read_len(&mut self, width: LengthWidth) -> Result<usize> {
        let len = match width {
            LengthWidth::U8 => u32::from(self.read_u8()?),
            LengthWidth::U16 => u32::from(self.read_u16()?),
            LengthWidth::U32 => self.read_u32()?,
        };
        usize::try_from(len).map_err(|_| FlowError::LimitExceeded(format!("length {len}")))
    }

    fn read_value(&mut self, depth: usize) -> Result<Value> {
        let tag = self.read_u8()?;
        match tag {
            0x00..=POSFIXINT_MAX => Ok(Value::Integer(Integer::from(tag))),
            NEGFIXINT_PREFIX..=0xff => Ok(Value::Integer(Integer::from(tag as i8))),
            FIXMAP_PREFIX..=0x8f => self.read_map(usize::from(tag & 0x0f), depth),
            FIXARRAY_PREFIX..=0x9f => self.read_array(usize::from(tag & 0x0f), depth),
            FIXSTR_PREFIX..=0xbf => self.read_string(usize::from(tag & 0x1f)),
            NIL => Ok(Value::Nil),
            NEVER_USED => Err(FlowError::MalformedEncoding(format!(
                "never-used tag {tag:#04x} at offset {}",
                self.offset() - 1
            ))),
            FALSE => Ok(Value::Boolean(false)),
            TRUE => Ok(Value::Boolean(true)),
            BIN8 => {
                let len = self.read_len(LengthWidth::U8)?;
                self.read_binary(len)
            }
            BIN16 => {
                let len = self.read_len(LengthWidth::U16)?;
                self.read_binary(len)
            }
            BIN32 => {
                let len = self.read_len(LengthWidth::U32)?;
                self.read_binary(len)
            }
            EXT8 => {
                let len = self.read_len(LengthWidth::U8)?;
                self.read_extension(len)
            }
            EXT16 => {
                let len = self.read_len(LengthWidth::U16)?;
                self.read_extension(len)
            }
            EXT32 => {
                let len = self.read_len(LengthWidth::U32)?;
                self.read_extension(len)
            }
            FLOAT32 => {
                let bits = self.read_u32()?;
                Ok(Value::Float(f64::from(f32::from_bits(bits))))
            }
            FLOAT64 => {
                let bits = self.read_u64()?;
                Ok(Value::Float(f64::from_bits(bits)))
            }
            UINT8 => Ok(Value::Integer(Integer::from(self.read_u8()?))),
            UINT16 => Ok(Value::Integer(Integer::from(self.read_u16()?))),
            UINT32 => Ok(Value::Integer(Integer::from(self.read_u32()?))),
            // The one tag whose value may exceed i64::MAX.
            UINT64 => Ok(Value::Integer(Integer::from_u64(self.read_u64()?))),
            INT8 => Ok(Value::Integer(Integer::from(self.read_u8()? as i8))),
            INT16 => Ok(Value::Integer(Integer::from(self.read_u16()? as i16))),
            INT32 => Ok(Value::Integer(Integer::from(self.read_u32()? as i32))),
            INT64 => Ok(Value::Integer(Integer::from(self.read_u64()? as i64))),
            FIXEXT1 => self.read_extension(1),
            FIXEXT2 => self.read_extension(2),
            FIXEXT4 => self.read_extension(4),
            FIXEXT8 => self.read_extension(8),
            FIXEXT16 => self.read_extension(16),
            STR8 => {
                let len = self.read_len(LengthWidth::U8)?;
                self.read_string(len)
            }
            STR16 => {
                let len = self.read_len(LengthWidth::U16)?;
                self.read_string(len)
            }
            STR32 => {
                let len = self.read_len(LengthWidth::U32)?;
                self.read_string(len)
            }
            ARRAY16 => {
                let len = self.read_len(LengthWidth::U16)?;
                self.read_array(len, depth)
            }
            ARRAY32 => {
                let len = self.read_len(LengthWidth::U32)?;
                self.read_array(len, depth)
            }
            MAP16 => {
                let len = self.read_len(LengthWidth::U16)?;
                self.read_map(len, depth)
            }
            MAP32 => {
                let len = self.read_len(LengthWidth::U32)?;
                self.read_map(len, depth)
            }
        }
    }

    fn read_string(&mut self, len: usize) -> Result<Value> {
        if len > self.limits.max_string_len {
            return Err(FlowError::LimitExceeded(format!(
                "String length {} exceeds limit {}",
                len, self.limits.max_string_len
            )));
        }
        let offset = self.offset();
        let bytes = self.read_bytes(len)?;
        let text = std::str::from_utf8(bytes).map_err(|e| {
            FlowError::MalformedEncoding(format!("invalid UTF-8 in string at offset {offset}: {e}"))
        })?;
        Ok(Value::String(text.to_string()))
    }

    fn read_binary(&mut self, len: usize) -> Result<Value> {
        if len > self.limits.max_binary_len {
            return Err(FlowError::LimitExceeded(format!(
                "Binary length {} exceeds limit {}",
                len, self.limits.max_binary_len
            )));
        }
        Ok(Value::Binary(self.read_bytes(len)?.to_vec()))
    }

    fn read_extension(&mut self, len: usize) -> Result<Value> {
        if len > self.limits.max_extension_len {
            return Err(FlowError::LimitExceeded(format!(
                "Extension length {} exceeds limit {}",
                len, self.limits.max_extension_len
            )));
        }
        let type_code = self.read_u8()? as i8;
        let data = self.read_bytes(len)?.to_vec();
        Ok(Value::Extension(ExtensionValue { type_code, data }))
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        let next = depth + 1;
        if next > self.limits.max_depth {
            return Err(FlowError::LimitExceeded(format!(
                "Nesting depth exceeds limit {}",
                self.limits.max_depth
            )));
        }
        Ok(next)
    }

    fn read_array(&mut self, len: usize, depth: usize) -> Result<Value> {
        let depth = self.enter(depth)?;
        if len > self.limits.max_array_len {
            return Err(FlowError::LimitExceeded(format!(
                "Array length {} exceeds limit {}",
                len, self.limits.max_array_len
            )));
        }
        // Every element takes at least one byte.
        self.need(len)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_value(depth)?);
        }
        Ok(Value::Array(items))
    }

    fn read_map(&mut self, len: usize, depth: usize) -> Result<Value> {
        let depth = self.enter(depth)?;
        if len > self.limits.max_map_len {
            return Err(FlowError::LimitExceeded(format!(
                "Map length {} exceeds limit {}",
                len, self.limits.max_map_len
            )));
        }
        // Every key and every value takes at least one byte.
        self.need(len.saturating_mul(2))?;
        let mut entries = Vec::with_capacity(len);
        for _ in 0..len {
            let key = self.read_value(depth)?;
            let value = self.read_value(depth)?;
            entries.push((key, value));
        }
        Ok(Value::Map(entries))
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_finished() {
            None
        } else {
            Some(self.decode_value())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LengthWidth {
    U8,
    U16,
    U32,
}

/// Decode exactly one value; trailing bytes are malformed.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode_value()?;
    if !decoder.is_finished() {
        return Err(FlowError::MalformedEncoding(format!(
            "{} trailing bytes after value",
            bytes.len() - decoder.offset()
        )));
    }
    Ok(value)
}

/// Decode every value in `bytes`.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Value>> {
    Decoder::new(bytes).collect()
}
