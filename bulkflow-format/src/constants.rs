//! Wire tag bytes of the MessagePack encoding

/// Largest value stored in a positive fixint tag (`0x00..=0x7f`).
pub const POSFIXINT_MAX: u8 = 0x7f;
/// First byte of the fixmap range; low nibble carries the entry count.
pub const FIXMAP_PREFIX: u8 = 0x80;
/// First byte of the fixarray range; low nibble carries the element count.
pub const FIXARRAY_PREFIX: u8 = 0x90;
/// First byte of the fixstr range; low five bits carry the byte length.
pub const FIXSTR_PREFIX: u8 = 0xa0;
/// First byte of the negative fixint range (`-32..=-1`).
pub const NEGFIXINT_PREFIX: u8 = 0xe0;

/// Largest entry count encodable in a fixmap or fixarray.
pub const FIX_CONTAINER_MAX_LEN: usize = 15;
/// Largest byte length encodable in a fixstr.
pub const FIXSTR_MAX_LEN: usize = 31;
/// Smallest value encodable as a negative fixint.
pub const NEGFIXINT_MIN: i64 = -32;

/// Nil.
pub const NIL: u8 = 0xc0;
/// Never used by the format; decoders must reject it.
pub const NEVER_USED: u8 = 0xc1;
/// Boolean false.
pub const FALSE: u8 = 0xc2;
/// Boolean true.
pub const TRUE: u8 = 0xc3;

/// Binary with 8-bit length.
pub const BIN8: u8 = 0xc4;
/// Binary with 16-bit length.
pub const BIN16: u8 = 0xc5;
/// Binary with 32-bit length.
pub const BIN32: u8 = 0xc6;

/// Extension with 8-bit length.
pub const EXT8: u8 = 0xc7;
/// Extension with 16-bit length.
pub const EXT16: u8 = 0xc8;
/// Extension with 32-bit length.
pub const EXT32: u8 = 0xc9;

/// IEEE 754 single precision float.
pub const FLOAT32: u8 = 0xca;
/// IEEE 754 double precision float.
pub const FLOAT64: u8 = 0xcb;

/// Unsigned 8-bit integer.
pub const UINT8: u8 = 0xcc;
/// Unsigned 16-bit integer.
pub const UINT16: u8 = 0xcd;
/// Unsigned 32-bit integer.
pub const UINT32: u8 = 0xce;
/// Unsigned 64-bit integer; the only tag whose value can exceed `i64::MAX`.
pub const UINT64: u8 = 0xcf;

/// Signed 8-bit integer.
pub const INT8: u8 = 0xd0;
/// Signed 16-bit integer.
pub const INT16: u8 = 0xd1;
/// Signed 32-bit integer.
pub const INT32: u8 = 0xd2;
/// Signed 64-bit integer.
pub const INT64: u8 = 0xd3;

/// Extension with 1 byte of payload.
pub const FIXEXT1: u8 = 0xd4;
/// Extension with 2 bytes of payload.
pub const FIXEXT2: u8 = 0xd5;
/// Extension with 4 bytes of payload.
pub const FIXEXT4: u8 = 0xd6;
/// Extension with 8 bytes of payload.
pub const FIXEXT8: u8 = 0xd7;
/// Extension with 16 bytes of payload.
pub const FIXEXT16: u8 = 0xd8;

/// String with 8-bit length.
pub const STR8: u8 = 0xd9;
/// String with 16-bit length.
pub const STR16: u8 = 0xda;
/// String with 32-bit length.
pub const STR32: u8 = 0xdb;

/// Array with 16-bit element count.
pub const ARRAY16: u8 = 0xdc;
/// Array with 32-bit element count.
pub const ARRAY32: u8 = 0xdd;

/// Map with 16-bit entry count.
pub const MAP16: u8 = 0xde;
/// Map with 32-bit entry count.
pub const MAP32: u8 = 0xdf;
