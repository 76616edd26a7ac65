//! Integer values spanning `[-2^63, 2^64-1]`

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{FlowError, Result};

/// Integer as carried by the wire format.
///
/// The format admits values from `-2^63` up to `2^64-1`, one bit wider than
/// `i64`. Values inside the `i64` range always use the signed
/// representation; only `[2^63, 2^64-1]` uses the unsigned one, so every
/// integer has exactly one representation.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Integer {
    repr: Repr,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Repr {
    Long(i64),
    // Invariant: > i64::MAX
    ULong(u64),
}

impl Integer {
    /// Smallest representable integer (`-2^63`).
    pub const MIN: Integer = Integer {
        repr: Repr::Long(i64::MIN),
    };
    /// Largest representable integer (`2^64-1`).
    pub const MAX: Integer = Integer {
        repr: Repr::ULong(u64::MAX),
    };

    /// Integer from an unsigned 64-bit value.
    pub const fn from_u64(value: u64) -> Self {
        if value > i64::MAX as u64 {
            Integer {
                repr: Repr::ULong(value),
            }
        } else {
            Integer {
                repr: Repr::Long(value as i64),
            }
        }
    }

    /// Integer from a signed 64-bit value.
    pub const fn from_i64(value: i64) -> Self {
        Integer {
            repr: Repr::Long(value),
        }
    }

    /// Integer from an `i128`, or `None` outside `[-2^63, 2^64-1]`.
    pub fn from_i128(value: i128) -> Option<Self> {
        if let Ok(v) = i64::try_from(value) {
            Some(Integer::from_i64(v))
        } else if let Ok(v) = u64::try_from(value) {
            Some(Integer::from_u64(v))
        } else {
            None
        }
    }

    /// True if the value is in `[-2^7, 2^7-1]`.
    pub fn is_in_byte_range(&self) -> bool {
        matches!(self.repr, Repr::Long(v) if i8::try_from(v).is_ok())
    }

    /// True if the value is in `[-2^15, 2^15-1]`.
    pub fn is_in_short_range(&self) -> bool {
        matches!(self.repr, Repr::Long(v) if i16::try_from(v).is_ok())
    }

    /// True if the value is in `[-2^31, 2^31-1]`.
    pub fn is_in_int_range(&self) -> bool {
        matches!(self.repr, Repr::Long(v) if i32::try_from(v).is_ok())
    }

    /// True if the value is in `[-2^63, 2^63-1]`.
    pub fn is_in_long_range(&self) -> bool {
        matches!(self.repr, Repr::Long(_))
    }

    /// True for negative values.
    pub fn is_negative(&self) -> bool {
        matches!(self.repr, Repr::Long(v) if v < 0)
    }

    /// The value as `i8`, failing with [`FlowError::IntegerOverflow`].
    pub fn as_i8(&self) -> Result<i8> {
        self.checked(|v| i8::try_from(v).ok())
    }

    /// The value as `i16`, failing with [`FlowError::IntegerOverflow`].
    pub fn as_i16(&self) -> Result<i16> {
        self.checked(|v| i16::try_from(v).ok())
    }

    /// The value as `i32`, failing with [`FlowError::IntegerOverflow`].
    pub fn as_i32(&self) -> Result<i32> {
        self.checked(|v| i32::try_from(v).ok())
    }

    /// The value as `i64`; fails for `[2^63, 2^64-1]`.
    pub fn as_i64(&self) -> Result<i64> {
        self.checked(Some)
    }

    /// The value as `u64`; fails for negative values.
    pub fn as_u64(&self) -> Result<u64> {
        match self.repr {
            Repr::Long(v) => u64::try_from(v).map_err(|_| FlowError::IntegerOverflow(*self)),
            Repr::ULong(v) => Ok(v),
        }
    }

    /// The value as `i128`. Always succeeds.
    pub fn as_i128(&self) -> i128 {
        match self.repr {
            Repr::Long(v) => i128::from(v),
            Repr::ULong(v) => i128::from(v),
        }
    }

    fn checked<T>(&self, narrow: impl FnOnce(i64) -> Option<T>) -> Result<T> {
        match self.repr {
            Repr::Long(v) => narrow(v).ok_or(FlowError::IntegerOverflow(*self)),
            Repr::ULong(_) => Err(FlowError::IntegerOverflow(*self)),
        }
    }

    /// Truncating cast to `i8`.
    pub fn to_i8(&self) -> i8 {
        self.bits() as i8
    }

    /// Truncating cast to `i16`.
    pub fn to_i16(&self) -> i16 {
        self.bits() as i16
    }

    /// Truncating cast to `i32`.
    pub fn to_i32(&self) -> i32 {
        self.bits() as i32
    }

    /// Two's complement reinterpretation as `i64`.
    pub fn to_i64(&self) -> i64 {
        self.bits() as i64
    }

    /// Two's complement reinterpretation as `u64`.
    pub fn to_u64(&self) -> u64 {
        self.bits()
    }

    /// Nearest `f32`.
    pub fn to_f32(&self) -> f32 {
        match self.repr {
            Repr::Long(v) => v as f32,
            Repr::ULong(v) => v as f32,
        }
    }

    /// Nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        match self.repr {
            Repr::Long(v) => v as f64,
            Repr::ULong(v) => v as f64,
        }
    }

    /// 64-bit pattern of the value.
    fn bits(&self) -> u64 {
        match self.repr {
            Repr::Long(v) => v as u64,
            Repr::ULong(v) => v,
        }
    }

    /// 32-bit hash code.
    ///
    /// Values in the `i32` range hash to themselves; wider values fold the
    /// high and low halves of their 64-bit pattern.
    pub fn hash_code(&self) -> i32 {
        match self.repr {
            Repr::Long(v) if i32::try_from(v).is_ok() => v as i32,
            _ => {
                let bits = self.bits();
                (bits ^ (bits >> 32)) as i32
            }
        }
    }
}

impl Hash for Integer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hash_code());
    }
}

impl Ord for Integer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_i128().cmp(&other.as_i128())
    }
}

impl PartialOrd for Integer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::Long(v) => fmt::Display::fmt(&v, f),
            Repr::ULong(v) => fmt::Display::fmt(&v, f),
        }
    }
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Integer({self})")
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Integer {
            fn from(value: $t) -> Self {
                Integer::from_i64(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Integer {
            fn from(value: $t) -> Self {
                Integer::from_u64(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl TryFrom<i128> for Integer {
    type Error = FlowError;

    fn try_from(value: i128) -> Result<Self> {
        Integer::from_i128(value).ok_or_else(|| {
            FlowError::LimitExceeded(format!("{value} is outside the wire integer range"))
        })
    }
}

impl TryFrom<usize> for Integer {
    type Error = FlowError;

    fn try_from(value: usize) -> Result<Self> {
        u64::try_from(value)
            .map(Integer::from_u64)
            .map_err(|_| FlowError::LimitExceeded(format!("{value} does not fit in 64 bits")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_byte_range_boundaries() {
        for v in -128i64..=127 {
            let int = Integer::from(v);
            assert!(int.is_in_byte_range());
            assert_eq!(i64::from(int.as_i8().unwrap()), v);
        }

        let int = Integer::from(128i64);
        assert!(!int.is_in_byte_range());
        match int.as_i8() {
            Err(FlowError::IntegerOverflow(carried)) => {
                assert_eq!(carried, Integer::from(128i64));
                assert_eq!(carried.to_string(), "128");
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        assert!(Integer::from(-129i64).as_i8().is_err());
    }

    #[test]
    fn test_long_max_is_long_but_not_int() {
        let int = Integer::from(i64::MAX);
        assert!(int.is_in_long_range());
        assert!(!int.is_in_int_range());
        match int.as_i32() {
            Err(FlowError::IntegerOverflow(carried)) => {
                assert_eq!(carried.to_string(), "9223372036854775807")
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        assert_eq!(int.as_i64().unwrap(), i64::MAX);
    }

    #[test]
    fn test_unsigned_upper_half() {
        let max = Integer::from(u64::MAX);
        assert_eq!(max, Integer::MAX);
        assert!(!max.is_in_long_range());
        assert!(!max.is_negative());
        assert!(max.as_i64().is_err());
        assert_eq!(max.as_u64().unwrap(), u64::MAX);
        assert_eq!(max.as_i128(), 18_446_744_073_709_551_615);
        assert_eq!(max.to_string(), "18446744073709551615");
        assert_eq!(max.to_i64(), -1);

        let boundary = Integer::from(1u64 << 63);
        assert!(!boundary.is_in_long_range());
        assert_eq!(boundary.as_i128(), 1i128 << 63);
        assert!(boundary > Integer::from(i64::MAX));
    }

    #[test]
    fn test_unsigned_inside_long_range_normalizes() {
        assert_eq!(Integer::from(5u64), Integer::from(5i64));
        assert_eq!(Integer::from(i64::MAX as u64), Integer::from(i64::MAX));
        assert!(Integer::from(i64::MAX as u64).is_in_long_range());
    }

    #[test]
    fn test_negative_rejects_u64() {
        let int = Integer::from(-1i64);
        assert!(int.is_negative());
        assert!(int.as_u64().is_err());
        assert_eq!(int.to_u64(), u64::MAX);
    }

    #[test]
    fn test_from_i128_range() {
        assert_eq!(Integer::from_i128(-1), Some(Integer::from(-1i64)));
        assert_eq!(Integer::from_i128(i128::from(u64::MAX)), Some(Integer::MAX));
        assert_eq!(Integer::from_i128(i128::from(u64::MAX) + 1), None);
        assert_eq!(Integer::from_i128(i128::from(i64::MIN) - 1), None);
        assert!(Integer::try_from(i128::MAX).is_err());
    }

    #[test]
    fn test_lossy_casts() {
        let int = Integer::from(300i64);
        assert_eq!(int.to_i8(), 44);
        assert_eq!(int.to_i16(), 300);
        assert_eq!(int.to_f64(), 300.0);
        assert_eq!(Integer::MAX.to_f64(), u64::MAX as f64);
        assert_eq!(Integer::from(70_000i64).to_i16(), 70_000i64 as i16);
    }

    #[test]
    fn test_hash_code() {
        assert_eq!(Integer::from(0i64).hash_code(), 0);
        assert_eq!(Integer::from(-7i64).hash_code(), -7);
        assert_eq!(Integer::from(i32::MAX).hash_code(), i32::MAX);
        let wide = 1i64 << 40;
        assert_eq!(
            Integer::from(wide).hash_code(),
            ((wide as u64) ^ ((wide as u64) >> 32)) as i32
        );
    }

    proptest! {
        #[test]
        fn prop_checked_matches_std(v in any::<i64>()) {
            let int = Integer::from(v);
            prop_assert_eq!(int.as_i8().ok(), i8::try_from(v).ok());
            prop_assert_eq!(int.as_i16().ok(), i16::try_from(v).ok());
            prop_assert_eq!(int.as_i32().ok(), i32::try_from(v).ok());
            prop_assert_eq!(int.is_in_short_range(), i16::try_from(v).is_ok());
            prop_assert_eq!(int.to_i32(), v as i32);
        }

        #[test]
        fn prop_u64_roundtrip(v in any::<u64>()) {
            let int = Integer::from(v);
            prop_assert_eq!(int.as_u64().unwrap(), v);
            prop_assert_eq!(int.is_in_long_range(), v <= i64::MAX as u64);
            prop_assert_eq!(int.to_string(), v.to_string());
        }
    }
}
