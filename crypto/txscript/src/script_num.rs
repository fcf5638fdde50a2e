use core::cmp::Ordering;
use core::iter;
use core::ops::{Div, Neg, Rem};
use thiserror::Error;

/// Operand width of numeric opcodes before 64-bit integers activate.
pub const MAX_INTEGER_SIZE_32_BIT: usize = 4;
/// Operand width of numeric opcodes once 64-bit integers are active.
pub const MAX_INTEGER_SIZE_64_BIT: usize = 8;
/// CHECKLOCKTIMEVERIFY and CHECKSEQUENCEVERIFY accept 5 byte operands, which cover
/// the whole unsigned 32 bit range of lock times and sequences.
pub const LOCKTIME_INTEGER_SIZE: usize = 5;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ScriptNumError {
    #[error("script number overflow")]
    Overflow,
    #[error("non-minimally encoded script number")]
    NonMinimal,
}

/// A script integer in the range `[i64::MIN + 1, i64::MAX]`.
///
/// On the stack numbers are little endian sign-magnitude byte strings: the top bit
/// of the last byte is the sign. `i64::MIN` is excluded because its magnitude would
/// need a ninth byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptNum(i64);

impl ScriptNum {
    pub const ZERO: ScriptNum = ScriptNum(0);

    /// Returns `None` for `i64::MIN`.
    #[inline]
    pub const fn from_int(value: i64) -> Option<Self> {
        if value == i64::MIN { None } else { Some(ScriptNum(value)) }
    }

    /// The caller guarantees `value` is in range.
    #[inline]
    pub const fn from_int_unchecked(value: i64) -> Self {
        ScriptNum(value)
    }

    /// Interprets a stack element as a number of at most `max_size` bytes.
    pub fn decode(bytes: &[u8], require_minimal: bool, max_size: usize) -> Result<Self, ScriptNumError> {
        if bytes.len() > max_size || bytes.len() > MAX_INTEGER_SIZE_64_BIT {
            return Err(ScriptNumError::Overflow);
        }
        if require_minimal && !is_minimally_encoded(bytes, max_size) {
            return Err(ScriptNumError::NonMinimal);
        }
        let Some(&msb) = bytes.last() else {
            return Ok(ScriptNum::ZERO);
        };

        let magnitude = bytes.iter().enumerate().fold(0u64, |acc, (i, &b)| acc | (b as u64) << (8 * i));
        if msb & 0x80 != 0 {
            let sign_bit = 0x80u64 << (8 * (bytes.len() - 1));
            Ok(ScriptNum(-((magnitude & !sign_bit) as i64)))
        } else {
            Ok(ScriptNum(magnitude as i64))
        }
    }

    #[inline]
    pub const fn get_int64(self) -> i64 {
        self.0
    }

    /// The value saturated into the `i32` range.
    #[inline]
    pub fn get_int(self) -> i32 {
        self.0.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Minimal stack encoding of the number.
    pub fn serialize(self) -> Vec<u8> {
        let negative = self.0 < 0;
        let mut positive = self.0.unsigned_abs();
        let mut last_saturated = false;
        let mut number_vec: Vec<u8> = iter::from_fn(move || {
            if positive == 0 {
                if last_saturated {
                    last_saturated = false;
                    Some(0)
                } else {
                    None
                }
            } else {
                let value = positive & 0xff;
                last_saturated = (value & 0x80) != 0;
                positive >>= 8;
                Some(value as u8)
            }
        })
        .collect();
        if negative {
            if let Some(num) = number_vec.last_mut() {
                *num |= 0x80;
            }
        }
        number_vec
    }

    #[inline]
    pub fn safe_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).and_then(Self::from_int)
    }

    #[inline]
    pub fn safe_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).and_then(Self::from_int)
    }

    #[inline]
    pub fn safe_mul(self, other: Self) -> Option<Self> {
        self.0.checked_mul(other.0).and_then(Self::from_int)
    }

    #[inline]
    pub fn safe_bitwise_and(self, other: Self) -> Option<Self> {
        Self::from_int(self.0 & other.0)
    }
}

impl From<ScriptNum> for i64 {
    fn from(num: ScriptNum) -> i64 {
        num.0
    }
}

impl PartialEq<i64> for ScriptNum {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<i64> for ScriptNum {
    fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
        self.0.partial_cmp(other)
    }
}

impl Neg for ScriptNum {
    type Output = ScriptNum;

    /// `-i64::MIN` is not representable and leaves the value unchanged.
    fn neg(self) -> ScriptNum {
        if self.0 == i64::MIN { self } else { ScriptNum(-self.0) }
    }
}

impl Div for ScriptNum {
    type Output = ScriptNum;

    /// Panics on a zero divisor; callers reject it first.
    fn div(self, rhs: ScriptNum) -> ScriptNum {
        if rhs.0 == -1 && self.0 == i64::MIN { self } else { ScriptNum(self.0 / rhs.0) }
    }
}

impl Rem for ScriptNum {
    type Output = ScriptNum;

    /// Panics on a zero divisor; callers reject it first.
    fn rem(self, rhs: ScriptNum) -> ScriptNum {
        if rhs.0 == -1 && self.0 == i64::MIN { ScriptNum(0) } else { ScriptNum(self.0 % rhs.0) }
    }
}

/// Whether `bytes` is the shortest encoding of its value and fits in `max_size` bytes.
///
/// Negative zero (`[0x80]`) is rejected as well.
pub fn is_minimally_encoded(bytes: &[u8], max_size: usize) -> bool {
    if bytes.len() > max_size {
        return false;
    }

    match bytes {
        [] => true,
        // If the most significant byte, excluding the sign bit, is zero then we're
        // not minimal, unless the next byte has its high bit set (e.g. 0xff00 for 255).
        [.., last] if last & 0x7f != 0 => true,
        [_] => false,
        [.., second_last, _] => second_last & 0x80 != 0,
    }
}

/// Trims `data` to the minimal encoding of the number it represents.
///
/// Returns whether `data` was modified.
pub fn minimally_encode(data: &mut Vec<u8>) -> bool {
    let Some(&last) = data.last() else {
        return false;
    };

    // Already minimal when the last byte carries more than the sign bit
    if last & 0x7f != 0 {
        return false;
    }

    // A single 0x00 or 0x80 byte is zero, which encodes as an empty array
    if data.len() == 1 {
        data.clear();
        return true;
    }

    if data[data.len() - 2] & 0x80 != 0 {
        return false;
    }

    // Find the most significant non zero byte and fold the sign into it
    match data[..data.len() - 1].iter().rposition(|&b| b != 0) {
        Some(pos) => {
            if data[pos] & 0x80 != 0 {
                data[pos + 1] = last;
                data.truncate(pos + 2);
            } else {
                data[pos] |= last;
                data.truncate(pos + 1);
            }
        }
        None => data.clear(),
    }
    true
}
