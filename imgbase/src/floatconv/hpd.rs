//! High precision decimal: the exact intermediate between decimal text and binary floating point.

use super::{
    eisel_lemire::{eisel_lemire, EXP10_MAX_INCL, EXP10_MIN_INCL},
    tables::{HPD_LEFT_SHIFT, POWERS_OF_5},
};
use crate::{
    status::{error, Error},
    ParseNumberOptions,
};
use core::{cmp::Ordering, fmt};
use snafu::ensure;

/// Decimal points beyond `±DECIMAL_POINT_RANGE` mean infinity or zero.
pub const DECIMAL_POINT_RANGE: i32 = 2047;

/// How many decimal digits are kept. Further non-zero digits only set the `truncated` flag.
pub const DIGITS_PRECISION: usize = 800;

/// The largest `n` with `(10 << n) < (1 << 64)`, i.e. the largest single shift step.
pub const SHIFT_MAX_INCL: u32 = 60;

/// Decimal-to-binary exponent steps: shifting by `POWERS[n]` bits moves the decimal point by at
/// most `n` places. `(10000 >> 13) == 1`, so `POWERS[4] == 13`.
const POWERS: [u32; 19] = [
    0, 3, 6, 9, 13, 16, 19, 23, 26, 29, 33, 36, 39, 43, 46, 49, 53, 56, 59,
];

const F64_BIAS: i32 = -1023;

/// A fixed precision decimal number, used only for converting to and from `f64`.
///
/// The value is `±0.d₀d₁d₂… × 10^decimal_point`, where `d` are the first `num_digits` entries of
/// `digits`, each in `0..=9`. The decimal point may lie before the first digit or past the last
/// one, padding with implicit zeroes. Trailing zero digits are trimmed.
///
/// The all-zeroes value is `+0`.
#[derive(Clone)]
pub struct HighPrecisionDecimal {
    num_digits: u32,
    decimal_point: i32,
    negative: bool,
    /// Non-zero digits beyond [`DIGITS_PRECISION`] were dropped. Breaks exact rounding ties
    /// upwards.
    truncated: bool,
    digits: [u8; DIGITS_PRECISION],
}

impl Default for HighPrecisionDecimal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HighPrecisionDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighPrecisionDecimal")
            .field("digits", &self.digits())
            .field("decimal_point", &self.decimal_point)
            .field("negative", &self.negative)
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl PartialEq for HighPrecisionDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.digits() == other.digits()
            && self.decimal_point == other.decimal_point
            && self.negative == other.negative
            && self.truncated == other.truncated
    }
}

impl Eq for HighPrecisionDecimal {}

impl HighPrecisionDecimal {
    pub const fn new() -> Self {
        Self {
            num_digits: 0,
            decimal_point: 0,
            negative: false,
            truncated: false,
            digits: [0; DIGITS_PRECISION],
        }
    }

    /// The integer `x`, negated if `negative`.
    pub fn from_u64(mut x: u64, negative: bool) -> Self {
        let mut h = Self::new();
        let mut buf = [0u8; 20];
        let mut n = 0;
        while x > 0 {
            n += 1;
            buf[buf.len() - n] = (x % 10) as u8;
            x /= 10;
        }
        h.digits[..n].copy_from_slice(&buf[buf.len() - n..]);
        h.num_digits = n as u32;
        h.decimal_point = n as i32;
        h.negative = negative;
        h.trim();
        h
    }

    /// The stored digits, most significant first, without trailing zeroes.
    #[inline]
    pub fn digits(&self) -> &[u8] {
        &self.digits[..self.num_digits as usize]
    }

    #[inline]
    pub fn decimal_point(&self) -> i32 {
        self.decimal_point
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[inline(always)]
    fn digit_at(&self, i: i32) -> u8 {
        if 0 <= i && (i as u32) < self.num_digits {
            self.digits[i as usize]
        } else {
            0
        }
    }

    /// Drops trailing zero digits. They carry no information since the decimal point is explicit.
    pub fn trim(&mut self) {
        while self.num_digits > 0 && self.digits[self.num_digits as usize - 1] == 0 {
            self.num_digits -= 1;
        }
    }

    /// Parses decimal text: an optional sign, digits with an optional decimal separator, and an
    /// optional `e`/`E` exponent. Honors the underscore, leading zero and decimal comma options.
    ///
    /// The whole of `s` must be consumed. Special values such as `inf` are not recognized here.
    pub fn parse(s: &[u8], options: ParseNumberOptions) -> Result<Self, Error> {
        #[derive(PartialEq)]
        enum Next {
            End,
            Fraction,
            Exponent,
        }

        let underscores = options.contains(ParseNumberOptions::ALLOW_UNDERSCORES);
        let separator = if options.contains(ParseNumberOptions::DECIMAL_SEPARATOR_IS_A_COMMA) {
            b','
        } else {
            b'.'
        };
        let skip_underscores = |p: &mut usize| {
            if underscores {
                while s.get(*p) == Some(&b'_') {
                    *p += 1;
                }
            }
        };

        let mut h = Self::new();
        let mut p = 0;

        skip_underscores(&mut p);
        match s.get(p) {
            Some(b'+') => p += 1,
            Some(b'-') => {
                h.negative = true;
                p += 1;
            }
            _ => {}
        }
        skip_underscores(&mut p);
        let Some(&first) = s.get(p) else {
            return error::BadArgumentSnafu.fail();
        };

        let mut nd = 0usize;
        let mut dp = 0i32;
        let mut no_digits_before_separator = false;

        let mut next = if first == b'0'
            && !options.contains(ParseNumberOptions::ALLOW_MULTIPLE_LEADING_ZEROES)
        {
            p += 1;
            loop {
                let Some(&c) = s.get(p) else {
                    break Next::End;
                };
                p += 1;
                if c == separator {
                    break Next::Fraction;
                } else if c | 0x20 == b'e' {
                    break Next::Exponent;
                }
                ensure!(c == b'_' && underscores, error::BadArgumentSnafu);
            }
        } else if first.is_ascii_digit() {
            loop {
                let Some(&c) = s.get(p) else {
                    break Next::End;
                };
                p += 1;
                if c.is_ascii_digit() {
                    let d = c - b'0';
                    if nd == 0 && d == 0 {
                        // Leading zeroes.
                        continue;
                    }
                    if nd < DIGITS_PRECISION {
                        h.digits[nd] = d;
                        nd += 1;
                    } else if d != 0 {
                        h.truncated = true;
                    }
                    // Integral digits past the precision still scale the value.
                    dp = dp.saturating_add(1);
                } else if c == separator {
                    break Next::Fraction;
                } else if c | 0x20 == b'e' {
                    break Next::Exponent;
                } else {
                    ensure!(c == b'_' && underscores, error::BadArgumentSnafu);
                }
            }
        } else if first == separator {
            p += 1;
            no_digits_before_separator = true;
            Next::Fraction
        } else {
            return error::BadArgumentSnafu.fail();
        };

        if next == Next::Fraction {
            next = loop {
                let Some(&c) = s.get(p) else {
                    break Next::End;
                };
                p += 1;
                if c == b'0' {
                    if nd == 0 {
                        dp = dp.saturating_sub(1);
                    } else if nd < DIGITS_PRECISION {
                        h.digits[nd] = 0;
                        nd += 1;
                    }
                } else if c.is_ascii_digit() {
                    if nd < DIGITS_PRECISION {
                        h.digits[nd] = c - b'0';
                        nd += 1;
                    } else {
                        h.truncated = true;
                    }
                } else if c | 0x20 == b'e' {
                    break Next::Exponent;
                } else {
                    ensure!(c == b'_' && underscores, error::BadArgumentSnafu);
                }
            };
        }

        if next == Next::Exponent {
            skip_underscores(&mut p);
            let mut exp_sign = 1;
            match s.get(p) {
                Some(b'+') => p += 1,
                Some(b'-') => {
                    exp_sign = -1;
                    p += 1;
                }
                _ => {}
            }

            // Anything past this is infinity or zero regardless of the digits.
            const EXP_LARGE: i32 = DECIMAL_POINT_RANGE + DIGITS_PRECISION as i32;
            let mut exp = 0i32;
            let mut saw_exp_digits = false;
            while let Some(&c) = s.get(p) {
                if c == b'_' && underscores {
                    // Separator.
                } else if c.is_ascii_digit() {
                    saw_exp_digits = true;
                    if exp < EXP_LARGE {
                        exp = 10 * exp + i32::from(c - b'0');
                    }
                } else {
                    break;
                }
                p += 1;
            }
            ensure!(saw_exp_digits, error::BadArgumentSnafu);
            dp = dp.saturating_add(exp_sign * exp);
        }

        ensure!(p == s.len(), error::BadArgumentSnafu);

        h.num_digits = nd as u32;
        if nd == 0 {
            ensure!(!no_digits_before_separator, error::BadArgumentSnafu);
            h.decimal_point = 0;
        } else {
            h.decimal_point = dp.clamp(-DECIMAL_POINT_RANGE - 1, DECIMAL_POINT_RANGE + 1);
        }
        h.trim();
        Ok(h)
    }

    /// How many digits a left shift by `shift` bits adds.
    fn lshift_num_new_digits(&self, shift: u32) -> u32 {
        let shift = (shift & 63) as usize;
        let x_a = u32::from(HPD_LEFT_SHIFT[shift]);
        let x_b = u32::from(HPD_LEFT_SHIFT[shift + 1]);
        let num_new_digits = x_a >> 11;
        let pow5 = &POWERS_OF_5[(x_a & 0x7FF) as usize..(x_b & 0x7FF) as usize];

        let digits = self.digits();
        for (i, &p) in pow5.iter().enumerate() {
            let Some(&d) = digits.get(i) else {
                return num_new_digits - 1;
            };
            match d.cmp(&p) {
                Ordering::Equal => continue,
                Ordering::Less => return num_new_digits - 1,
                Ordering::Greater => return num_new_digits,
            }
        }
        num_new_digits
    }

    /// The integral part, rounded to even, or `u64::MAX` if it has more than 18 digits. The sign
    /// is ignored.
    pub fn rounded_integer(&self) -> u64 {
        if self.num_digits == 0 || self.decimal_point < 0 {
            return 0;
        } else if self.decimal_point > 18 {
            return u64::MAX;
        }

        let dp = self.decimal_point;
        let mut n = (0..dp).fold(0u64, |n, i| 10 * n + u64::from(self.digit_at(i)));

        let nd = self.num_digits as i32;
        if dp < nd {
            let d = self.digit_at(dp);
            let mut round_up = d >= 5;
            if d == 5 && dp + 1 == nd {
                round_up = self.truncated || (dp > 0 && self.digit_at(dp - 1) & 1 != 0);
            }
            if round_up {
                n += 1;
            }
        }
        n
    }

    /// Multiplies by `2^shift`, for `shift` in `1..=SHIFT_MAX_INCL`.
    fn small_lshift(&mut self, shift: u32) {
        if self.num_digits == 0 {
            return;
        }
        let num_new_digits = self.lshift_num_new_digits(shift);
        let mut rx = self.num_digits as usize;
        let mut wx = rx + num_new_digits as usize;
        let mut n = 0u64;

        // Right to left: pick up a digit, put down a digit.
        while rx > 0 {
            rx -= 1;
            wx -= 1;
            n += u64::from(self.digits[rx]) << shift;
            let (quo, rem) = (n / 10, n % 10);
            if wx < DIGITS_PRECISION {
                self.digits[wx] = rem as u8;
            } else if rem > 0 {
                self.truncated = true;
            }
            n = quo;
        }

        // Leading digits.
        while n > 0 {
            wx -= 1;
            let (quo, rem) = (n / 10, n % 10);
            if wx < DIGITS_PRECISION {
                self.digits[wx] = rem as u8;
            } else if rem > 0 {
                self.truncated = true;
            }
            n = quo;
        }

        self.num_digits = (self.num_digits + num_new_digits).min(DIGITS_PRECISION as u32);
        self.decimal_point += num_new_digits as i32;
        self.trim();
    }

    /// Divides by `2^shift`, for `shift` in `1..=SHIFT_MAX_INCL`.
    fn small_rshift(&mut self, shift: u32) {
        let nd = self.num_digits as usize;
        let mut rx = 0usize;
        let mut wx = 0usize;
        let mut n = 0u64;

        // Pick up enough leading digits to cover the first shift.
        while n >> shift == 0 {
            if rx < nd {
                n = 10 * n + u64::from(self.digits[rx]);
                rx += 1;
            } else if n == 0 {
                return;
            } else {
                // Implicit trailing zeroes.
                while n >> shift == 0 {
                    n *= 10;
                    rx += 1;
                }
                break;
            }
        }

        self.decimal_point -= rx as i32 - 1;
        if self.decimal_point < -DECIMAL_POINT_RANGE {
            // Indistinguishable from zero.
            self.num_digits = 0;
            self.decimal_point = 0;
            self.truncated = false;
            return;
        }

        // Left to right: pick up a digit, put down a digit.
        let mask = (1u64 << shift) - 1;
        while rx < nd {
            let new_digit = (n >> shift) as u8;
            n = 10 * (n & mask) + u64::from(self.digits[rx]);
            rx += 1;
            self.digits[wx] = new_digit;
            wx += 1;
        }

        // Trailing digits.
        while n > 0 {
            let new_digit = (n >> shift) as u8;
            n = 10 * (n & mask);
            if wx < DIGITS_PRECISION {
                self.digits[wx] = new_digit;
                wx += 1;
            } else if new_digit > 0 {
                self.truncated = true;
            }
        }

        self.num_digits = wx as u32;
        self.trim();
    }

    /// Multiplies by `2^shift`. Negative shifts divide.
    pub fn lshift(&mut self, mut shift: i32) {
        let max = SHIFT_MAX_INCL as i32;
        if shift > 0 {
            while shift > max {
                self.small_lshift(SHIFT_MAX_INCL);
                shift -= max;
            }
            self.small_lshift(shift as u32);
        } else if shift < 0 {
            while shift < -max {
                self.small_rshift(SHIFT_MAX_INCL);
                shift += max;
            }
            self.small_rshift((-shift) as u32);
        }
    }

    /// Truncates to at most `n` digits. Does nothing for a negative `n`.
    pub fn round_down(&mut self, n: i32) {
        if n < 0 || self.num_digits <= n as u32 {
            return;
        }
        self.num_digits = n as u32;
        self.trim();
    }

    /// Rounds away from zero to at most `n` digits. Does nothing for a negative `n`.
    pub fn round_up(&mut self, n: i32) {
        if n < 0 || self.num_digits <= n as u32 {
            return;
        }
        for i in (0..n as usize).rev() {
            if self.digits[i] < 9 {
                self.digits[i] += 1;
                self.num_digits = i as u32 + 1;
                return;
            }
        }
        // All nines.
        self.digits[0] = 1;
        self.num_digits = 1;
        self.decimal_point += 1;
    }

    /// Rounds to at most `n` digits, ties to even. Does nothing for a negative `n`.
    pub fn round_nearest(&mut self, n: i32) {
        if n < 0 || self.num_digits <= n as u32 {
            return;
        }
        let d = self.digit_at(n);
        let mut up = d >= 5;
        if d == 5 && n + 1 == self.num_digits as i32 {
            up = self.truncated || (n > 0 && self.digit_at(n - 1) & 1 != 0);
        }
        if up {
            self.round_up(n);
        } else {
            self.round_down(n);
        }
    }

    /// Rounds to the fewest digits that still identify the `f64` `mantissa * 2^(exp2 - 52)`, the
    /// number this decimal holds.
    ///
    /// The candidates are bounded by the halfway points to the neighboring `f64`s. The digits are
    /// walked until rounding down, rounding up, or both land strictly inside those bounds (or on
    /// them, when `mantissa` is even and round-to-even would pick it).
    pub fn round_just_enough(&mut self, exp2: i32, mantissa: u64) {
        if mantissa == 0 || (exp2 < 53 && self.decimal_point >= self.num_digits as i32) {
            return;
        }

        const MIN_INCL_NORMAL_EXP2: i32 = -1022;
        const MIN_INCL_NORMAL_MANTISSA: u64 = 1 << 52;

        // Halfway to the next smaller f64. Below a power of two that f64 is twice as dense.
        let (l_exp2, l_mantissa) =
            if exp2 > MIN_INCL_NORMAL_EXP2 && mantissa <= MIN_INCL_NORMAL_MANTISSA {
                (exp2 - 1, 2 * mantissa - 1)
            } else {
                (exp2, mantissa - 1)
            };
        let mut lower = Self::from_u64(2 * l_mantissa + 1, false);
        lower.lshift(l_exp2 - 53);

        // Halfway to the next larger f64.
        let mut upper = Self::from_u64(2 * mantissa + 1, false);
        upper.lshift(exp2 - 53);

        let inclusive = mantissa & 1 == 0;

        // -1: the digits of self and upper agree so far.
        //  0: they differed by one at some digit, followed only by 9s in self and 0s in upper.
        // +1: rounding up certainly stays below upper.
        let mut upper_delta = -1;

        for ui in 0.. {
            let hi = ui - upper.decimal_point + self.decimal_point;
            if hi >= self.num_digits as i32 {
                break;
            }
            let hd = self.digit_at(hi);

            let li = ui - upper.decimal_point + lower.decimal_point;
            let ld = lower.digit_at(li);

            let can_round_down =
                ld != hd || (inclusive && li + 1 == lower.num_digits as i32);

            let ud = upper.digit_at(ui);
            if upper_delta < 0 {
                if hd + 1 < ud {
                    upper_delta = 1;
                } else if hd != ud {
                    upper_delta = 0;
                }
            } else if upper_delta == 0 && (hd != 9 || ud != 0) {
                upper_delta = 1;
            }

            let can_round_up = upper_delta > 0
                || (upper_delta == 0 && (inclusive || ui + 1 < upper.num_digits as i32));

            match (can_round_down, can_round_up) {
                (true, true) => return self.round_nearest(hi + 1),
                (true, false) => return self.round_down(hi + 1),
                (false, true) => return self.round_up(hi + 1),
                (false, false) => {}
            }
        }
    }

    /// Converts to the nearest `f64`, ties to even, trying the Eisel-Lemire shortcut first.
    ///
    /// Fails only if the value overflows to infinity and `options` rejects infinities. The decimal
    /// is left in an unspecified state.
    pub fn to_f64(&mut self, options: ParseNumberOptions) -> Result<f64, Error> {
        if self.num_digits > 0 && self.num_digits <= 19 {
            let man = self.digits().iter().fold(0u64, |m, &d| 10 * m + u64::from(d));
            let exp10 = self.decimal_point - self.num_digits as i32;
            if (EXP10_MIN_INCL..=EXP10_MAX_INCL).contains(&exp10) {
                if let Some(bits) = eisel_lemire(man, exp10) {
                    return Ok(f64::from_bits(bits | (u64::from(self.negative) << 63)));
                }
            }
        }
        self.to_f64_exact(options)
    }

    /// Converts to the nearest `f64`, ties to even, by repeated binary shifts only.
    pub fn to_f64_exact(&mut self, options: ParseNumberOptions) -> Result<f64, Error> {
        let sign = if self.negative { 1u64 << 63 } else { 0 };
        let zero: Result<f64, Error> = Ok(f64::from_bits(sign));
        let infinity = || -> Result<f64, Error> {
            ensure!(
                !options.contains(ParseNumberOptions::REJECT_INF_AND_NAN),
                error::BadArgumentSnafu
            );
            Ok(f64::from_bits(sign | 0x7FF0_0000_0000_0000))
        };

        // The largest and smallest positive finite f64 are about 1.8e308 and 4.9e-324.
        if self.num_digits == 0 || self.decimal_point < -326 {
            return zero;
        } else if self.decimal_point > 310 {
            return infinity();
        }

        let step = |n: i32| POWERS.get(n as usize).copied().unwrap_or(SHIFT_MAX_INCL);

        // Shift right until below 1, possibly below 1/2...
        let mut exp2 = 0i32;
        while self.decimal_point > 0 {
            let shift = step(self.decimal_point);
            self.small_rshift(shift);
            if self.decimal_point < -DECIMAL_POINT_RANGE {
                return zero;
            }
            exp2 += shift as i32;
        }
        // ...then left into [1/2, 1).
        while self.decimal_point <= 0 {
            let shift = if self.decimal_point == 0 {
                if self.digits[0] >= 5 {
                    break;
                }
                if self.digits[0] < 2 {
                    2
                } else {
                    1
                }
            } else {
                step(-self.decimal_point)
            };
            self.small_lshift(shift);
            if self.decimal_point > DECIMAL_POINT_RANGE {
                return infinity();
            }
            exp2 -= shift as i32;
        }

        // f64 mantissas are in [1, 2).
        exp2 -= 1;

        // Subnormals.
        while F64_BIAS + 1 > exp2 {
            let n = ((F64_BIAS + 1 - exp2) as u32).min(SHIFT_MAX_INCL);
            self.small_rshift(n);
            exp2 += n as i32;
        }

        if exp2 - F64_BIAS >= 0x7FF {
            return infinity();
        }

        self.small_lshift(53);
        let mut man2 = self.rounded_integer();

        // Rounding carried into a 54th bit.
        if man2 >> 53 != 0 {
            man2 >>= 1;
            exp2 += 1;
            if exp2 - F64_BIAS >= 0x7FF {
                return infinity();
            }
        }

        if man2 >> 52 == 0 {
            exp2 = F64_BIAS;
        }

        let exp2_bits = ((exp2 - F64_BIAS) & 0x7FF) as u64;
        Ok(f64::from_bits(
            (man2 & 0x000F_FFFF_FFFF_FFFF) | (exp2_bits << 52) | sign,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> HighPrecisionDecimal {
        HighPrecisionDecimal::parse(s.as_bytes(), ParseNumberOptions::DEFAULT).unwrap()
    }

    #[test]
    fn parse_layout() {
        let h = parse("-0.00789e1");
        assert_eq!(h.digits(), &[7, 8, 9]);
        assert_eq!(h.decimal_point(), -1);
        assert!(h.is_negative());

        let h = parse("7890.");
        assert_eq!(h.digits(), &[7, 8, 9]);
        assert_eq!(h.decimal_point(), 4);

        let h = parse("0");
        assert!(h.digits().is_empty());
        assert_eq!(h, HighPrecisionDecimal::new());
    }

    #[test]
    fn parse_rejects() {
        for s in ["", "-", ".", "e5", "1e", "1.5x", "01", "1__0", "1e+", "--1", "0x10"] {
            assert_eq!(
                HighPrecisionDecimal::parse(s.as_bytes(), ParseNumberOptions::DEFAULT),
                Err(Error::BadArgument),
                "{s:?}"
            );
        }
    }

    #[test]
    fn parse_options() {
        let o = ParseNumberOptions::ALLOW_UNDERSCORES
            | ParseNumberOptions::ALLOW_MULTIPLE_LEADING_ZEROES
            | ParseNumberOptions::DECIMAL_SEPARATOR_IS_A_COMMA;
        let h = HighPrecisionDecimal::parse(b"_-_00_1_2,5_e_1_", o).unwrap();
        assert_eq!(h.digits(), &[1, 2, 5]);
        assert_eq!(h.decimal_point(), 3);
        assert!(h.is_negative());
    }

    #[test]
    fn long_integral_part_keeps_its_magnitude() {
        let mut s = String::from("1");
        s.extend(core::iter::repeat('0').take(900));
        let h = parse(&s);
        assert_eq!(h.decimal_point(), 901);
        assert_eq!(h.digits(), &[1]);

        s.push('1');
        let h = parse(&s);
        assert!(h.is_truncated());
    }

    #[test]
    fn exponent_clamps() {
        assert_eq!(parse("1e999999999999").decimal_point(), DECIMAL_POINT_RANGE + 1);
        assert_eq!(parse("1e-999999999999").decimal_point(), -DECIMAL_POINT_RANGE - 1);
    }

    #[test]
    fn shifts() {
        let mut h = HighPrecisionDecimal::from_u64(5, false);
        h.lshift(3);
        assert_eq!((h.digits(), h.decimal_point()), (&[4][..], 2));
        h.lshift(-6);
        assert_eq!((h.digits(), h.decimal_point()), (&[6, 2, 5][..], 0));

        let mut h = HighPrecisionDecimal::from_u64(1, false);
        h.lshift(64);
        assert_eq!(h.rounded_integer(), u64::MAX);
        assert_eq!(h.digits(), b"\x01\x08\x04\x04\x06\x07\x04\x04\x00\x07\x03\x07\x00\x09\x05\x05\x01\x06\x01\x06");
    }

    #[test]
    fn rounding() {
        let mut h = parse("2.5");
        assert_eq!(h.rounded_integer(), 2);
        h.round_nearest(1);
        assert_eq!(h.digits(), &[2]);

        assert_eq!(parse("3.5").rounded_integer(), 4);
        assert_eq!(parse("3.51").rounded_integer(), 4);

        let mut h = parse("9.99");
        h.round_up(2);
        assert_eq!((h.digits(), h.decimal_point()), (&[1][..], 2));

        let mut h = parse("1.2345");
        h.round_down(2);
        assert_eq!(h.digits(), &[1, 2]);
        h.round_down(-1);
        assert_eq!(h.digits(), &[1, 2]);
    }

    #[test]
    fn just_enough() {
        // 0.1 is 0x3FB999999999999A: mantissa 0x1999999999999A, exp2 -4.
        let man = 0x1999_9999_9999_9Au64;
        let mut h = HighPrecisionDecimal::from_u64(man, false);
        h.lshift(-4 - 52);
        assert!(h.digits().len() > 50);
        h.round_just_enough(-4, man);
        assert_eq!((h.digits(), h.decimal_point()), (&[1][..], 0));
    }

    #[test]
    fn exact_conversion() {
        let f = |s: &str| parse(s).to_f64_exact(ParseNumberOptions::DEFAULT).unwrap();
        assert_eq!(f("0.1"), 0.1);
        assert_eq!(f("-2.5e-3"), -2.5e-3);
        assert_eq!(f("9007199254740993"), 9007199254740992.0);
        assert_eq!(f("4.9406564584124654e-324"), 5e-324);
        assert_eq!(f("2.4703282292062328e-324"), 5e-324);
        assert_eq!(f("2.4703282292062327e-324"), 0.0);
        assert_eq!(f("1.7976931348623157e308"), f64::MAX);
        assert_eq!(f("1.8e308"), f64::INFINITY);
        assert_eq!(
            parse("1.8e308").to_f64_exact(ParseNumberOptions::REJECT_INF_AND_NAN),
            Err(Error::BadArgument)
        );
        assert_eq!(f("-1e-400").to_bits(), (-0.0f64).to_bits());
    }
}
