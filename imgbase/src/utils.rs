//! Numeric primitives: wide multiplication, bit counting, endian-aware loads and stores, and
//! IEEE 754 bit-representation conversions.

pub use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Multiplies two `u64`s, returning the 128-bit product as `(hi, lo)`.
#[inline]
pub const fn multiply_u64(a: u64, b: u64) -> (u64, u64) {
    let p = (a as u128) * (b as u128);
    ((p >> 64) as u64, p as u64)
}

/// Number of leading zero bits. 64 for zero.
#[inline]
pub const fn count_leading_zeroes_u64(x: u64) -> u32 {
    x.leading_zeros()
}

/// Reads a u16 from the start of `buf`. Panics if `buf` is too short.
#[inline(always)]
pub fn peek_u16<B: ByteOrder>(buf: &[u8]) -> u16 {
    B::read_u16(buf)
}

#[inline(always)]
pub fn peek_u24<B: ByteOrder>(buf: &[u8]) -> u32 {
    B::read_u24(buf)
}

#[inline(always)]
pub fn peek_u32<B: ByteOrder>(buf: &[u8]) -> u32 {
    B::read_u32(buf)
}

#[inline(always)]
pub fn peek_u48<B: ByteOrder>(buf: &[u8]) -> u64 {
    B::read_u48(buf)
}

#[inline(always)]
pub fn peek_u64<B: ByteOrder>(buf: &[u8]) -> u64 {
    B::read_u64(buf)
}

/// Writes a u16 to the start of `buf`. Panics if `buf` is too short.
#[inline(always)]
pub fn poke_u16<B: ByteOrder>(buf: &mut [u8], x: u16) {
    B::write_u16(buf, x)
}

#[inline(always)]
pub fn poke_u24<B: ByteOrder>(buf: &mut [u8], x: u32) {
    B::write_u24(buf, x)
}

#[inline(always)]
pub fn poke_u32<B: ByteOrder>(buf: &mut [u8], x: u32) {
    B::write_u32(buf, x)
}

#[inline(always)]
pub fn poke_u48<B: ByteOrder>(buf: &mut [u8], x: u64) {
    B::write_u48(buf, x)
}

#[inline(always)]
pub fn poke_u64<B: ByteOrder>(buf: &mut [u8], x: u64) {
    B::write_u64(buf, x)
}

/// Reads an unsigned integer of `n` bytes (1 to 8) from the start of `buf`.
#[inline]
pub fn peek_uint<B: ByteOrder>(buf: &[u8], n: usize) -> u64 {
    B::read_uint(buf, n)
}

/// Writes the low `n` bytes (1 to 8) of `x` to the start of `buf`.
#[inline]
pub fn poke_uint<B: ByteOrder>(buf: &mut [u8], x: u64, n: usize) {
    // byteorder asserts that x fits in n bytes
    let x = if n >= 8 { x } else { x & ((1u64 << (8 * n)) - 1) };
    B::write_uint(buf, x, n)
}

/// A conversion result, along with whether information was lost on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossyValue<T> {
    pub value: T,
    pub lossy: bool,
}

/// Converts an `f64` to the bit representation of the nearest IEEE 754 half precision value
/// towards zero.
///
/// Infinities stay infinite. Finite values too large for an `f16` saturate to the largest finite
/// `f16` (which is lossy). NaNs stay NaN, keeping the quiet bit.
pub fn f64_to_u16_truncate(f: f64) -> LossyValue<u16> {
    let u = f.to_bits();
    let neg = ((u >> 63) << 15) as u16;
    let u = u & 0x7FFF_FFFF_FFFF_FFFF;
    let exp = u >> 52;
    let man = u & 0x000F_FFFF_FFFF_FFFF;

    if exp == 0x7FF {
        if man == 0 {
            return LossyValue { value: neg | 0x7C00, lossy: false };
        }
        // low bits set so the mantissa stays non-zero
        return LossyValue {
            value: neg | 0x7DFF | ((man >> 42) as u16),
            lossy: false,
        };
    } else if exp > 0x40E {
        return LossyValue { value: neg | 0x7BFF, lossy: true };
    } else if exp <= 0x3E6 {
        return LossyValue { value: neg, lossy: u != 0 };
    } else if exp <= 0x3F0 {
        // subnormal f16
        let man = man | 0x0010_0000_0000_0000;
        let shift = (1051 - exp) as u32;
        let shifted_man = man >> shift;
        return LossyValue {
            value: neg | (shifted_man as u16),
            lossy: (shifted_man << shift) != man,
        };
    }

    let exp = (exp - 1008) << 10;
    LossyValue {
        value: neg | (exp as u16) | ((man >> 42) as u16),
        lossy: (man << 22) != 0,
    }
}

/// Like [`f64_to_u16_truncate`], but for IEEE 754 single precision.
pub fn f64_to_u32_truncate(f: f64) -> LossyValue<u32> {
    let u = f.to_bits();
    let neg = ((u >> 63) as u32) << 31;
    let u = u & 0x7FFF_FFFF_FFFF_FFFF;
    let exp = u >> 52;
    let man = u & 0x000F_FFFF_FFFF_FFFF;

    if exp == 0x7FF {
        if man == 0 {
            return LossyValue { value: neg | 0x7F80_0000, lossy: false };
        }
        return LossyValue {
            value: neg | 0x7FBF_FFFF | ((man >> 29) as u32),
            lossy: false,
        };
    } else if exp > 0x47E {
        return LossyValue { value: neg | 0x7F7F_FFFF, lossy: true };
    } else if exp <= 0x369 {
        return LossyValue { value: neg, lossy: u != 0 };
    } else if exp <= 0x380 {
        // subnormal f32
        let man = man | 0x0010_0000_0000_0000;
        let shift = (926 - exp) as u32;
        let shifted_man = man >> shift;
        return LossyValue {
            value: neg | (shifted_man as u32),
            lossy: (shifted_man << shift) != man,
        };
    }

    let exp = (exp - 896) << 23;
    LossyValue {
        value: neg | (exp as u32) | ((man >> 29) as u32),
        lossy: (man << 35) != 0,
    }
}

/// Converts the bit representation of an IEEE 754 half precision value to an `f64`. Exact.
pub fn u16_to_f64(u: u16) -> f64 {
    let neg = (u as u64 >> 15) << 63;
    let exp = ((u >> 10) & 0x1F) as u64;
    let man = (u & 0x3FF) as u64;

    let bits = if exp == 0x1F {
        neg | 0x7FF0_0000_0000_0000 | (man << 42)
    } else if exp != 0 {
        neg | ((exp + 1008) << 52) | (man << 42)
    } else if man == 0 {
        neg
    } else {
        // subnormal f16, normal f64
        let lz = man.leading_zeros() - 54;
        let man = (man << (lz + 1)) & 0x3FF;
        neg | ((1008 - lz as u64) << 52) | (man << 42)
    };
    f64::from_bits(bits)
}

/// Converts the bit representation of an IEEE 754 single precision value to an `f64`. Exact.
#[inline]
pub fn u32_to_f64(u: u32) -> f64 {
    f64::from(f32::from_bits(u))
}
