//! Integer parsing and rendering.

use crate::{
    status::{error, Error},
    ParseNumberOptions, RenderNumberOptions,
};
use snafu::ensure;

/// The longest output of [`render_number_u64`]: a `+` and 20 digits.
pub const U64_BYTE_LENGTH_MAX_INCL: usize = 21;

/// The longest output of [`render_number_i64`]: a sign and 19 digits.
pub const I64_BYTE_LENGTH_MAX_INCL: usize = 20;

/// `"00"` through `"99"`.
#[rustfmt::skip]
static FIRST_HUNDRED: [u8; 200] = *b"\
    0001020304050607080910111213141516171819\
    2021222324252627282930313233343536373839\
    4041424344454647484950515253545556575859\
    6061626364656667686970717273747576777879\
    8081828384858687888990919293949596979899";

/// Parses a `u64`.
///
/// Decimal by default, with `0x`/`0X` for hexadecimal and `0d`/`0D` for explicit decimal. A
/// leading `0` may not be followed by more digits unless
/// [`ParseNumberOptions::ALLOW_MULTIPLE_LEADING_ZEROES`] is set. With
/// [`ParseNumberOptions::ALLOW_UNDERSCORES`], underscores may appear anywhere except between the
/// `0` and the `x`/`d` of a prefix.
///
/// Fails with [`Error::OutOfBounds`] on overflow and [`Error::BadArgument`] on anything else.
///
/// ```
/// use imgbase::{intconv::parse_number_u64, ParseNumberOptions};
///
/// let o = ParseNumberOptions::ALLOW_UNDERSCORES;
/// assert_eq!(parse_number_u64(b"0x_FF_FF", o), Ok(0xFFFF));
/// assert_eq!(parse_number_u64(b"1_000", o), Ok(1000));
/// ```
pub fn parse_number_u64(s: &[u8], options: ParseNumberOptions) -> Result<u64, Error> {
    let underscores = options.contains(ParseNumberOptions::ALLOW_UNDERSCORES);
    let leading_zeroes = options.contains(ParseNumberOptions::ALLOW_MULTIPLE_LEADING_ZEROES);
    let skip_underscores = |s: &[u8]| -> usize {
        if underscores {
            s.iter().take_while(|&&c| c == b'_').count()
        } else {
            0
        }
    };

    let s = &s[skip_underscores(s)..];
    let Some((&first, rest)) = s.split_first() else {
        return error::BadArgumentSnafu.fail();
    };
    if first != b'0' {
        return parse_decimal(s, underscores);
    }

    let Some(&next) = rest.first() else {
        return Ok(0);
    };
    if underscores && next == b'_' {
        let n = skip_underscores(rest);
        return if n == rest.len() {
            Ok(0)
        } else if leading_zeroes {
            parse_decimal(&rest[n..], underscores)
        } else {
            error::BadArgumentSnafu.fail()
        };
    }

    match next {
        b'x' | b'X' | b'd' | b'D' => {
            let digits = &rest[1..];
            let digits = &digits[skip_underscores(digits)..];
            if !digits.is_empty() {
                return if next | 0x20 == b'x' {
                    parse_hexadecimal(digits, underscores)
                } else {
                    parse_decimal(digits, underscores)
                };
            }
        }
        _ => {}
    }

    ensure!(leading_zeroes, error::BadArgumentSnafu);
    parse_decimal(rest, underscores)
}

fn parse_decimal(s: &[u8], underscores: bool) -> Result<u64, Error> {
    // u64::MAX is 10 * MAX10 + MAX1.
    const MAX10: u64 = 1_844_674_407_370_955_161;
    const MAX1: u64 = 5;

    let Some((&first, rest)) = s.split_first() else {
        return error::BadArgumentSnafu.fail();
    };
    ensure!(first.is_ascii_digit(), error::BadArgumentSnafu);
    let mut v = u64::from(first - b'0');

    for &c in rest {
        if c == b'_' && underscores {
            continue;
        }
        ensure!(c.is_ascii_digit(), error::BadArgumentSnafu);
        let digit = u64::from(c - b'0');
        ensure!(
            v < MAX10 || (v == MAX10 && digit <= MAX1),
            error::OutOfBoundsSnafu
        );
        v = 10 * v + digit;
    }
    Ok(v)
}

fn parse_hexadecimal(s: &[u8], underscores: bool) -> Result<u64, Error> {
    let hex = |c: u8| (c as char).to_digit(16).map(u64::from);

    let Some((&first, rest)) = s.split_first() else {
        return error::BadArgumentSnafu.fail();
    };
    let Some(mut v) = hex(first) else {
        return error::BadArgumentSnafu.fail();
    };

    for &c in rest {
        if c == b'_' && underscores {
            continue;
        }
        let Some(digit) = hex(c) else {
            return error::BadArgumentSnafu.fail();
        };
        ensure!(v >> 60 == 0, error::OutOfBoundsSnafu);
        v = (v << 4) | digit;
    }
    Ok(v)
}

/// Parses an `i64`: an optional `+` or `-`, then anything [`parse_number_u64`] accepts.
///
/// ```
/// use imgbase::{intconv::parse_number_i64, Error, ParseNumberOptions};
///
/// let o = ParseNumberOptions::DEFAULT;
/// assert_eq!(parse_number_i64(b"-9223372036854775808", o), Ok(i64::MIN));
/// assert_eq!(parse_number_i64(b"9223372036854775808", o), Err(Error::OutOfBounds));
/// ```
pub fn parse_number_i64(s: &[u8], options: ParseNumberOptions) -> Result<i64, Error> {
    let mut s = s;
    if options.contains(ParseNumberOptions::ALLOW_UNDERSCORES) {
        let n = s.iter().take_while(|&&c| c == b'_').count();
        s = &s[n..];
    }

    let negative = match s.first() {
        None => return error::BadArgumentSnafu.fail(),
        Some(b'-') => {
            s = &s[1..];
            true
        }
        Some(b'+') => {
            s = &s[1..];
            false
        }
        Some(_) => false,
    };

    let v = parse_number_u64(s, options)?;
    if negative {
        ensure!(v <= 1 << 63, error::OutOfBoundsSnafu);
        Ok((v as i64).wrapping_neg())
    } else {
        i64::try_from(v).map_err(|_| Error::OutOfBounds)
    }
}

/// Writes `x` in decimal to `dst`, returning the number of bytes written.
///
/// Returns 0, leaving `dst` untouched, if the output does not fit.
/// [`U64_BYTE_LENGTH_MAX_INCL`] bytes are always enough.
pub fn render_number_u64(dst: &mut [u8], x: u64, options: RenderNumberOptions) -> usize {
    render(dst, x, false, options)
}

/// Writes `x` in decimal to `dst`, returning the number of bytes written.
///
/// Returns 0, leaving `dst` untouched, if the output does not fit.
/// [`I64_BYTE_LENGTH_MAX_INCL`] bytes are always enough.
pub fn render_number_i64(dst: &mut [u8], x: i64, options: RenderNumberOptions) -> usize {
    render(dst, x.unsigned_abs(), x < 0, options)
}

fn render(dst: &mut [u8], mut x: u64, negative: bool, options: RenderNumberOptions) -> usize {
    let mut buf = [0u8; U64_BYTE_LENGTH_MAX_INCL];
    let mut start = buf.len();

    while x >= 100 {
        let i = (x % 100) as usize * 2;
        x /= 100;
        start -= 2;
        buf[start..start + 2].copy_from_slice(&FIRST_HUNDRED[i..i + 2]);
    }
    if x < 10 {
        start -= 1;
        buf[start] = b'0' + x as u8;
    } else {
        let i = x as usize * 2;
        start -= 2;
        buf[start..start + 2].copy_from_slice(&FIRST_HUNDRED[i..i + 2]);
    }

    if negative {
        start -= 1;
        buf[start] = b'-';
    } else if options.contains(RenderNumberOptions::LEADING_PLUS_SIGN) {
        start -= 1;
        buf[start] = b'+';
    }

    let out = &buf[start..];
    let n = out.len();
    if n > dst.len() {
        return 0;
    }
    let at = if options.contains(RenderNumberOptions::ALIGN_RIGHT) {
        dst.len() - n
    } else {
        0
    };
    dst[at..at + n].copy_from_slice(out);
    n
}
