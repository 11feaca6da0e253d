//! The Eisel-Lemire fast path: `mantissa * 10^exp10` to `f64` with one or two 64×64-bit
//! multiplications, for the inputs where that is provably exact.
//!
//! See <https://lemire.me/blog/2020/03/10/fast-float-parsing-in-practice/>.

use super::tables::POWERS_OF_10;
use crate::utils::{count_leading_zeroes_u64, multiply_u64};

/// The smallest `exp10` with a [`POWERS_OF_10`] entry.
pub const EXP10_MIN_INCL: i32 = -307;
/// The largest `exp10` with a [`POWERS_OF_10`] entry.
pub const EXP10_MAX_INCL: i32 = 288;

/// The IEEE-754 bits (sign bit clear) of `man * 10^exp10`, or `None` if the product lands too
/// close to a rounding boundary to decide here.
///
/// `man` must be non-zero and `exp10` within [`EXP10_MIN_INCL`]`..=`[`EXP10_MAX_INCL`]; anything
/// else also gives `None`. Within that range the result is always a normal, finite `f64`.
pub fn eisel_lemire(man: u64, exp10: i32) -> Option<u64> {
    if man == 0 || !(EXP10_MIN_INCL..=EXP10_MAX_INCL).contains(&exp10) {
        return None;
    }
    let [po10_lo, po10_hi] = POWERS_OF_10[(exp10 - EXP10_MIN_INCL) as usize];

    let clz = count_leading_zeroes_u64(man);
    let man = man << clz;

    // log2(10) ≈ 217706 / 65536. 1087 is the f64 bias (1023) plus 64.
    let mut ret_exp2 = ((((217706 * i64::from(exp10)) >> 16) + 1087) - i64::from(clz)) as u64;

    let (mut x_hi, mut x_lo) = multiply_u64(man, po10_hi);

    // The low 9 bits of x_hi are all ones and adding man to x_lo would carry: the truncated
    // approximation of 10^exp10 may matter. Fold in the low half and look again.
    if (x_hi & 0x1FF) == 0x1FF && x_lo.overflowing_add(man).1 {
        let (y_hi, y_lo) = multiply_u64(man, po10_lo);
        let (merged_lo, carry) = x_lo.overflowing_add(y_hi);
        let merged_hi = x_hi + u64::from(carry);

        if (merged_hi & 0x1FF) == 0x1FF
            && merged_lo.wrapping_add(1) == 0
            && y_lo.overflowing_add(man).1
        {
            return None;
        }
        x_hi = merged_hi;
        x_lo = merged_lo;
    }

    // Keep 54 bits: 53 for the mantissa and one to round with.
    let msb = x_hi >> 63;
    let mut ret_mantissa = x_hi >> (msb + 9);
    ret_exp2 -= 1 ^ msb;

    // Exactly halfway between two f64s. Ties-to-even needs the bits we dropped.
    if x_lo == 0 && (x_hi & 0x1FF) == 0 && (ret_mantissa & 3) == 1 {
        return None;
    }

    ret_mantissa += ret_mantissa & 1;
    ret_mantissa >>= 1;
    if ret_mantissa >> 53 != 0 {
        ret_mantissa >>= 1;
        ret_exp2 += 1;
    }

    Some((ret_mantissa & 0x000F_FFFF_FFFF_FFFF) | (ret_exp2 << 52))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(man: u64, exp10: i32) -> Option<f64> {
        eisel_lemire(man, exp10).map(f64::from_bits)
    }

    #[test]
    fn simple_values() {
        assert_eq!(el(1, 0), Some(1.0));
        assert_eq!(el(u64::MAX, 0), Some(18446744073709551615.0));
        assert_eq!(el(123456789, -307), Some(123456789e-307));
        assert_eq!(el(1, -307), Some(1e-307));
        assert_eq!(el(17976931348623157, 276), Some(1.7976931348623157e292));
        assert_eq!(el(9007199254740995, 0), Some(9007199254740996.0));
    }

    #[test]
    fn gives_up_near_ties() {
        // 2^53 + 1 is exactly between two f64s.
        assert_eq!(el(9007199254740993, 0), None);
        // Exact inputs whose truncated power of 10 is ambiguous; the caller's exact path
        // handles these.
        assert_eq!(el(15, -1), None);
        assert_eq!(el(1, 23), None);
    }

    #[test]
    fn rejects_preconditions() {
        assert_eq!(el(0, 0), None);
        assert_eq!(el(1, -308), None);
        assert_eq!(el(1, 289), None);
    }
}
