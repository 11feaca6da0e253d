//! Correctly rounded conversion between decimal text and `f64`.
//!
//! Parsing tries, in order: an exact `f64` multiplication when both the mantissa and the power
//! of 10 are exactly representable, the [Eisel-Lemire](eisel_lemire) algorithm, and finally a
//! [`HighPrecisionDecimal`] that is slow but always right. Rendering always goes through a
//! [`HighPrecisionDecimal`].

pub mod eisel_lemire;
pub mod hpd;
mod tables;

use self::{
    eisel_lemire::{eisel_lemire, EXP10_MAX_INCL, EXP10_MIN_INCL},
    hpd::HighPrecisionDecimal,
    tables::F64_POWERS_OF_10,
};
use crate::{
    status::{error, Error},
    ParseNumberOptions, RenderNumberOptions,
};

/// Renderers never emit more than this many digits after the decimal separator.
pub const PRECISION_MAX_INCL: u32 = 4095;

/// Parses `s` as an `f64`, rounding to nearest, ties to even.
///
/// Accepts an optional sign, decimal digits with an optional separator, and an optional `e`/`E`
/// exponent, plus `inf`, `infinity` and `nan` (case-insensitive, optionally signed) unless
/// [`ParseNumberOptions::REJECT_INF_AND_NAN`] is set. The whole slice must be consumed: there is
/// no leading or trailing whitespace.
///
/// Values too large for `f64` become infinities, values too small become zeroes.
///
/// ```
/// use imgbase::{floatconv::parse_number_f64, ParseNumberOptions};
///
/// assert_eq!(parse_number_f64(b"-1.25e3", ParseNumberOptions::DEFAULT), Ok(-1250.0));
/// assert!(parse_number_f64(b"1.25 ", ParseNumberOptions::DEFAULT).is_err());
/// ```
pub fn parse_number_f64(s: &[u8], options: ParseNumberOptions) -> Result<f64, Error> {
    if let Some(f) = parse_fast(s, options) {
        return Ok(f);
    }
    tracing::trace!(len = s.len(), "parse_number_f64: taking the slow path");

    match HighPrecisionDecimal::parse(s, options) {
        Ok(mut h) => h.to_f64(options),
        Err(_) => parse_special(s, options),
    }
}

/// `±dd.ddddE±xxx` without underscores or a leading `+`, small enough to fit a `u64` mantissa
/// and an in-range base-10 exponent. `None` means "try harder", not "invalid".
fn parse_fast(s: &[u8], options: ParseNumberOptions) -> Option<f64> {
    if s.len() >= 256 {
        return None;
    }
    let separator = if options.contains(ParseNumberOptions::DECIMAL_SEPARATOR_IS_A_COMMA) {
        b','
    } else {
        b'.'
    };
    // NUL never appears in a valid number, so reading past the end acts as a terminator.
    let at = |i: usize| s.get(i).copied().unwrap_or(0);

    let mut p = 0;
    let negative = at(p) == b'-';
    if negative {
        p += 1;
    }
    let start_of_digits = p;

    let mut man: u64;
    if at(p) == b'0' {
        man = 0;
        p += 1;
        if at(p).is_ascii_digit() {
            return None;
        }
    } else if at(p).is_ascii_digit() {
        man = 0;
        while at(p).is_ascii_digit() {
            // Overflow is caught below by counting digits.
            man = man.wrapping_mul(10).wrapping_add(u64::from(at(p) - b'0'));
            p += 1;
        }
    } else {
        return None;
    }

    let mut exp10 = 0i32;
    if at(p) == separator {
        p += 1;
        let first_after_separator = p;
        if !at(p).is_ascii_digit() {
            return None;
        }
        while at(p).is_ascii_digit() {
            man = man.wrapping_mul(10).wrapping_add(u64::from(at(p) - b'0'));
            p += 1;
        }
        exp10 = first_after_separator as i32 - p as i32;
    }

    // Off by one when there is a separator. Corrected below only if it matters.
    let mut digit_count = p - start_of_digits;

    if at(p) | 0x20 == b'e' {
        p += 1;
        let mut exp_sign = 1;
        match at(p) {
            b'-' => {
                exp_sign = -1;
                p += 1;
            }
            b'+' => p += 1,
            _ => {}
        }
        if !at(p).is_ascii_digit() {
            return None;
        }
        let mut exp_num = 0i32;
        while at(p).is_ascii_digit() {
            if exp_num > 0x100_0000 {
                return None;
            }
            exp_num = 10 * exp_num + i32::from(at(p) - b'0');
            p += 1;
        }
        exp10 += exp_sign * exp_num;
    }

    if p != s.len() {
        return None;
    }

    // 19 digits always fit in a u64, 20 may not.
    if digit_count > 19 {
        let leading = s[start_of_digits..]
            .iter()
            .take_while(|&&c| c == b'0' || c == b'.')
            .count();
        digit_count -= leading;
        if digit_count > 19 {
            return None;
        }
    }

    if !(EXP10_MIN_INCL..=EXP10_MAX_INCL).contains(&exp10) {
        return None;
    }

    // Both factors exact: one IEEE operation rounds correctly.
    if (-22..=22).contains(&exp10) && man >> 53 == 0 {
        let mut d = man as f64;
        if exp10 >= 0 {
            d *= F64_POWERS_OF_10[exp10 as usize];
        } else {
            d /= F64_POWERS_OF_10[(-exp10) as usize];
        }
        return Some(if negative { -d } else { d });
    }

    let bits = eisel_lemire(man, exp10)?;
    Some(f64::from_bits(bits | (u64::from(negative) << 63)))
}

/// Parses `inf`, `infinity` and `nan`, case-insensitive, with an optional sign and optional
/// underscores around it.
fn parse_special(s: &[u8], options: ParseNumberOptions) -> Result<f64, Error> {
    snafu::ensure!(
        !options.contains(ParseNumberOptions::REJECT_INF_AND_NAN),
        error::BadArgumentSnafu
    );

    let is_underscore = |c: &&u8| **c == b'_';
    let mut rest = s;
    let skip = |r: &mut &[u8]| {
        let n = r.iter().take_while(is_underscore).count();
        *r = &r[n..];
    };

    skip(&mut rest);
    let mut negative = false;
    match rest.first() {
        Some(b'+') => rest = &rest[1..],
        Some(b'-') => {
            negative = true;
            rest = &rest[1..];
        }
        _ => {}
    }
    skip(&mut rest);

    let word_len = rest.iter().take_while(|&&c| c != b'_').count();
    let (word, mut tail) = rest.split_at(word_len);
    let bits = if word.eq_ignore_ascii_case(b"inf") || word.eq_ignore_ascii_case(b"infinity") {
        0x7FF0_0000_0000_0000u64
    } else if word.eq_ignore_ascii_case(b"nan") {
        0x7FFF_FFFF_FFFF_FFFF
    } else {
        return error::BadArgumentSnafu.fail();
    };

    skip(&mut tail);
    snafu::ensure!(tail.is_empty(), error::BadArgumentSnafu);

    Ok(f64::from_bits(bits | (u64::from(negative) << 63)))
}

/// Writes `x` as decimal text to `dst`, returning the number of bytes written.
///
/// Returns 0, leaving `dst` untouched, if the output does not fit.
///
/// The style follows C's `printf`: [`RenderNumberOptions::EXPONENT_ABSENT`] is `%f`,
/// [`RenderNumberOptions::EXPONENT_PRESENT`] is `%e`, and neither (or both) is `%g`. `precision`
/// is capped at [`PRECISION_MAX_INCL`] and ignored under
/// [`RenderNumberOptions::JUST_ENOUGH_PRECISION`], which picks the shortest output that parses
/// back to exactly `x`.
///
/// Infinities render as `Inf`, `-Inf` or `+Inf`; NaNs as `NaN` regardless of sign.
///
/// ```
/// use imgbase::{floatconv::render_number_f64, RenderNumberOptions};
///
/// let mut buf = [0u8; 32];
/// let n = render_number_f64(&mut buf, 0.1 + 0.2, 0, RenderNumberOptions::JUST_ENOUGH_PRECISION);
/// assert_eq!(&buf[..n], b"0.30000000000000004");
/// ```
pub fn render_number_f64(
    dst: &mut [u8],
    x: f64,
    precision: u32,
    options: RenderNumberOptions,
) -> usize {
    let bits = x.to_bits();
    let neg = bits >> 63 != 0;
    let mut exp2 = ((bits >> 52) & 0x7FF) as i32;
    let mut man = bits & 0x000F_FFFF_FFFF_FFFF;

    if exp2 == 0x7FF {
        let text: &[u8] = if man != 0 {
            b"NaN"
        } else if neg {
            b"-Inf"
        } else if options.contains(RenderNumberOptions::LEADING_PLUS_SIGN) {
            b"+Inf"
        } else {
            b"Inf"
        };
        return match place(dst, text.len(), options) {
            Some(out) => {
                out.copy_from_slice(text);
                text.len()
            }
            None => 0,
        };
    } else if exp2 == 0 {
        exp2 = -1022;
    } else {
        exp2 -= 1023;
        man |= 1 << 52;
    }

    let mut precision = precision.min(PRECISION_MAX_INCL) as i32;
    let just_enough = options.contains(RenderNumberOptions::JUST_ENOUGH_PRECISION);

    let mut h = HighPrecisionDecimal::from_u64(man, neg);
    if !h.digits().is_empty() {
        h.lshift(exp2 - 52);
    }

    let absent = options.contains(RenderNumberOptions::EXPONENT_ABSENT);
    let present = options.contains(RenderNumberOptions::EXPONENT_PRESENT);
    match (absent, present) {
        (true, false) => {
            if just_enough {
                h.round_just_enough(exp2, man);
                precision = (h.digits().len() as i32 - h.decimal_point()).max(0);
            } else {
                h.round_nearest(precision + h.decimal_point());
            }
            return render_exponent_absent(dst, &h, precision as u32, options);
        }
        (false, true) => {
            if just_enough {
                h.round_just_enough(exp2, man);
                precision = (h.digits().len() as i32 - 1).max(0);
            } else {
                h.round_nearest(precision + 1);
            }
            return render_exponent_present(dst, &h, precision as u32, options);
        }
        _ => {}
    }

    // %g: precision counts significant digits.
    let e_threshold;
    if just_enough {
        h.round_just_enough(exp2, man);
        precision = h.digits().len() as i32;
        e_threshold = 6;
    } else {
        precision = precision.max(1);
        h.round_nearest(precision);
        let nd = h.digits().len() as i32;
        e_threshold = if precision > nd && nd >= h.decimal_point() {
            nd
        } else {
            precision
        };
    }

    let nd = h.digits().len() as i32;
    let e = h.decimal_point() - 1;
    if e < -4 || e_threshold <= e {
        let p = precision.min(nd);
        return render_exponent_present(dst, &h, (p - 1).max(0) as u32, options);
    }

    let p = if precision > h.decimal_point() {
        nd
    } else {
        precision
    };
    render_exponent_absent(dst, &h, (p - h.decimal_point()).max(0) as u32, options)
}

/// The `n` bytes of `dst` that output goes to, honoring [`RenderNumberOptions::ALIGN_RIGHT`].
#[inline]
fn place(dst: &mut [u8], n: usize, options: RenderNumberOptions) -> Option<&mut [u8]> {
    if n > dst.len() {
        None
    } else if options.contains(RenderNumberOptions::ALIGN_RIGHT) {
        let len = dst.len();
        Some(&mut dst[len - n..])
    } else {
        Some(&mut dst[..n])
    }
}

#[inline]
fn sign_len(h: &HighPrecisionDecimal, options: RenderNumberOptions) -> usize {
    usize::from(h.is_negative() || options.contains(RenderNumberOptions::LEADING_PLUS_SIGN))
}

#[inline]
fn separator(options: RenderNumberOptions) -> u8 {
    if options.contains(RenderNumberOptions::DECIMAL_SEPARATOR_IS_A_COMMA) {
        b','
    } else {
        b'.'
    }
}

/// Writes a bare sign, if any, to the front of `out`, returning the rest.
fn put_sign<'a>(
    out: &'a mut [u8],
    h: &HighPrecisionDecimal,
    options: RenderNumberOptions,
) -> &'a mut [u8] {
    let sign = if h.is_negative() {
        b'-'
    } else if options.contains(RenderNumberOptions::LEADING_PLUS_SIGN) {
        b'+'
    } else {
        return out;
    };
    out[0] = sign;
    &mut out[1..]
}

#[inline(always)]
fn digit_or_zero(digits: &[u8], i: i64) -> u8 {
    let d = usize::try_from(i)
        .ok()
        .and_then(|i| digits.get(i))
        .copied()
        .unwrap_or(0);
    b'0' | d
}

/// `%f`: `±ddd.ddd` with exactly `precision` fractional digits.
fn render_exponent_absent(
    dst: &mut [u8],
    h: &HighPrecisionDecimal,
    precision: u32,
    options: RenderNumberOptions,
) -> usize {
    let dp = h.decimal_point();
    let integral_len = dp.max(1) as usize;
    let fraction_len = if precision > 0 { precision as usize + 1 } else { 0 };
    let n = sign_len(h, options) + integral_len + fraction_len;

    let Some(out) = place(dst, n, options) else {
        return 0;
    };
    let out = put_sign(out, h, options);
    let digits = h.digits();

    let (integral, fraction) = out.split_at_mut(integral_len);
    if dp <= 0 {
        integral[0] = b'0';
    } else {
        for (i, o) in integral.iter_mut().enumerate() {
            *o = digit_or_zero(digits, i as i64);
        }
    }

    if let Some((sep, rest)) = fraction.split_first_mut() {
        *sep = separator(options);
        for (i, o) in rest.iter_mut().enumerate() {
            *o = digit_or_zero(digits, i64::from(dp) + i as i64);
        }
    }
    n
}

/// `%e`: `±d.ddde±xx` with exactly `precision` fractional digits and at least two exponent
/// digits.
fn render_exponent_present(
    dst: &mut [u8],
    h: &HighPrecisionDecimal,
    precision: u32,
    options: RenderNumberOptions,
) -> usize {
    let digits = h.digits();
    let exp = if digits.is_empty() {
        0
    } else {
        h.decimal_point() - 1
    };
    let exp_abs = exp.unsigned_abs();
    let exp_len = if exp_abs < 100 { 2 } else { 3 };
    let fraction_len = if precision > 0 { precision as usize + 1 } else { 0 };
    let n = sign_len(h, options) + 1 + fraction_len + 2 + exp_len;

    let Some(out) = place(dst, n, options) else {
        return 0;
    };
    let out = put_sign(out, h, options);

    out[0] = digit_or_zero(digits, 0);
    let (fraction, exponent) = out[1..].split_at_mut(fraction_len);
    if let Some((sep, rest)) = fraction.split_first_mut() {
        *sep = separator(options);
        for (i, o) in rest.iter_mut().enumerate() {
            *o = digit_or_zero(digits, i as i64 + 1);
        }
    }

    exponent[0] = b'e';
    exponent[1] = if exp < 0 { b'-' } else { b'+' };
    let mut e = exp_abs;
    for o in exponent[2..].iter_mut().rev() {
        *o = b'0' | (e % 10) as u8;
        e /= 10;
    }
    n
}
