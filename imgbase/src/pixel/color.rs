//! Color arithmetic on 8-bit `0xAARRGGBB` and 16-bit `0xAAAARRRRGGGGBBBB` values.
//!
//! Conversions between premultiplied and non-premultiplied alpha, and Porter-Duff compositing,
//! are done in 16 bits per channel. 8-bit inputs are widened by multiplying by `0x101`, and
//! 16-bit results are narrowed to the nearest 8-bit value.

/// Splits a 16-bit color into `[b, g, r, a]`.
#[inline(always)]
pub const fn split_u64(c: u64) -> [u64; 4] {
    [c & 0xFFFF, (c >> 16) & 0xFFFF, (c >> 32) & 0xFFFF, c >> 48]
}

/// Joins `[b, g, r, a]` 16-bit channels. Channels must not exceed `0xFFFF`.
#[inline(always)]
pub const fn join_u64([b, g, r, a]: [u64; 4]) -> u64 {
    (a << 48) | (r << 32) | (g << 16) | b
}

/// Widens each channel of an 8-bit color to 16 bits.
#[inline]
pub const fn u32_to_u64(c: u32) -> u64 {
    let c = c as u64;
    let b = c & 0xFF;
    let g = (c >> 8) & 0xFF;
    let r = (c >> 16) & 0xFF;
    let a = c >> 24;
    join_u64([b * 0x101, g * 0x101, r * 0x101, a * 0x101])
}

/// Narrows each channel of a 16-bit color to 8 bits, rounding to nearest.
#[inline]
pub const fn u64_to_u32(c: u64) -> u32 {
    let [b, g, r, a] = split_u64(c);
    let [b, g, r, a] = [
        narrow_from_u16(b, 8),
        narrow_from_u16(g, 8),
        narrow_from_u16(r, 8),
        narrow_from_u16(a, 8),
    ];
    ((a << 24) | (r << 16) | (g << 8) | b) as u32
}

/// Non-premultiplied to premultiplied alpha, 16 bits per channel, rounding to nearest.
#[inline]
pub const fn nonpremul_to_premul_u64(c: u64) -> u64 {
    let [b, g, r, a] = split_u64(c);
    if a == 0xFFFF {
        return c;
    }
    join_u64([
        premul_channel(b, a),
        premul_channel(g, a),
        premul_channel(r, a),
        a,
    ])
}

#[inline(always)]
const fn premul_channel(x: u64, a: u64) -> u64 {
    (x * a + 0x7FFF) / 0xFFFF
}

/// Premultiplied to non-premultiplied alpha, 16 bits per channel, rounding to nearest. Fully
/// transparent colors become transparent black.
///
/// Together with [`nonpremul_to_premul_u64`] and rounded narrowing, every 8-bit
/// non-premultiplied color with non-zero alpha survives a trip through 16-bit premultiplied.
#[inline]
pub const fn premul_to_nonpremul_u64(c: u64) -> u64 {
    let [b, g, r, a] = split_u64(c);
    if a == 0xFFFF {
        return c;
    }
    if a == 0 {
        return 0;
    }
    join_u64([
        unpremul_channel(b, a),
        unpremul_channel(g, a),
        unpremul_channel(r, a),
        a,
    ])
}

#[inline(always)]
const fn unpremul_channel(x: u64, a: u64) -> u64 {
    let v = (x * 0xFFFF + a / 2) / a;
    if v > 0xFFFF {
        0xFFFF
    } else {
        v
    }
}

/// Non-premultiplied to premultiplied alpha, 8 bits per channel, going through 16 bits.
#[inline]
pub const fn nonpremul_to_premul_u32(c: u32) -> u32 {
    u64_to_u32(nonpremul_to_premul_u64(u32_to_u64(c)))
}

/// Premultiplied to non-premultiplied alpha, 8 bits per channel, going through 16 bits.
#[inline]
pub const fn premul_to_nonpremul_u32(c: u32) -> u32 {
    u64_to_u32(premul_to_nonpremul_u64(u32_to_u64(c)))
}

/// Porter-Duff "over" with both colors premultiplied.
#[inline]
pub const fn src_over_premul_premul(dst: u64, src: u64) -> u64 {
    let [db, dg, dr, da] = split_u64(dst);
    let [sb, sg, sr, sa] = split_u64(src);
    let ia = 0xFFFF - sa;
    join_u64([
        sb + db * ia / 0xFFFF,
        sg + dg * ia / 0xFFFF,
        sr + dr * ia / 0xFFFF,
        sa + da * ia / 0xFFFF,
    ])
}

/// Porter-Duff "over" with a premultiplied destination and a non-premultiplied source.
#[inline]
pub const fn src_over_premul_nonpremul(dst: u64, src: u64) -> u64 {
    let [db, dg, dr, da] = split_u64(dst);
    let [sb, sg, sr, sa] = split_u64(src);
    let ia = 0xFFFF - sa;
    join_u64([
        (sb * sa + db * ia) / 0xFFFF,
        (sg * sa + dg * ia) / 0xFFFF,
        (sr * sa + dr * ia) / 0xFFFF,
        sa + da * ia / 0xFFFF,
    ])
}

/// Porter-Duff "over" with a non-premultiplied destination and a premultiplied source.
#[inline]
pub const fn src_over_nonpremul_premul(dst: u64, src: u64) -> u64 {
    premul_to_nonpremul_u64(src_over_premul_premul(nonpremul_to_premul_u64(dst), src))
}

/// Porter-Duff "over" with both colors non-premultiplied.
#[inline]
pub const fn src_over_nonpremul_nonpremul(dst: u64, src: u64) -> u64 {
    premul_to_nonpremul_u64(src_over_premul_nonpremul(nonpremul_to_premul_u64(dst), src))
}

/// 16-bit luma of 16-bit RGB, using the JFIF coefficients.
#[inline]
pub const fn gray_u16(r: u64, g: u64, b: u64) -> u64 {
    (19595 * r + 38470 * g + 7471 * b + 32768) >> 16
}

/// 8-bit luma of an 8-bit color. Alpha is ignored.
#[inline]
pub const fn gray_u32(c: u32) -> u8 {
    let [b, g, r, _] = split_u64(u32_to_u64(c));
    narrow_from_u16(gray_u16(r, g, b), 8) as u8
}

/// Swaps the red and blue channels: `0xAARRGGBB` to `0xAABBGGRR` and back.
#[inline]
pub const fn swap_u32_argb_abgr(c: u32) -> u32 {
    let o = c & 0xFF00_FF00;
    let r = (c >> 16) & 0xFF;
    let b = c & 0xFF;
    o | (b << 16) | r
}

/// Widens an `n`-bit sample to 16 bits by bit replication, so that all zeroes and all ones map
/// to `0x0000` and `0xFFFF`. 5 to 8 bits this way is the familiar `(v << 3) | (v >> 2)`.
#[inline]
pub const fn expand_to_u16(v: u64, n: u32) -> u64 {
    match n {
        0 => 0,
        16 => v & 0xFFFF,
        8 => (v & 0xFF) * 0x101,
        _ => {
            let v = v & ((1 << n) - 1);
            let mut out = 0u64;
            let mut filled = 0;
            while filled < 16 {
                out = (out << n) | v;
                filled += n;
            }
            (out >> (filled - 16)) & 0xFFFF
        }
    }
}

/// Narrows a 16-bit sample to the nearest `n`-bit value. Undoes [`expand_to_u16`].
#[inline]
pub const fn narrow_from_u16(v: u64, n: u32) -> u64 {
    if n == 0 {
        0
    } else {
        ((v & 0xFFFF) * ((1 << n) - 1) + 0x7FFF) / 0xFFFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premul_8bit_rounds() {
        assert_eq!(nonpremul_to_premul_u32(0x8100_0080), 0x8100_0041);
        assert_eq!(nonpremul_to_premul_u32(0xFF12_3456), 0xFF12_3456);
        assert_eq!(nonpremul_to_premul_u32(0x0012_3456), 0x0000_0000);
        assert_eq!(nonpremul_to_premul_u32(0x8033_2211), 0x801A_1109);
        assert_eq!(premul_to_nonpremul_u32(0x0012_3456), 0);
        assert_eq!(premul_to_nonpremul_u32(0xFF12_3456), 0xFF12_3456);
        assert_eq!(premul_to_nonpremul_u32(0x8040_4040), 0x8080_8080);
    }

    #[test]
    fn premultiply_roundtrip_exhaustive() {
        for a in 1..=0xFFu32 {
            for c in 0..=0xFFu32 {
                let argb = (a << 24) | (c << 16) | ((255 - c) << 8) | (c ^ 0x5A);
                let premul = nonpremul_to_premul_u64(u32_to_u64(argb));
                assert_eq!(u64_to_u32(premul_to_nonpremul_u64(premul)), argb, "{argb:08X}");
            }
        }
    }

    #[test]
    fn src_over_golden() {
        // half-alpha non-premultiplied color over quarter-alpha premultiplied black
        let dst = u32_to_u64(0x4000_0000);
        let src = u32_to_u64(0x8033_2211);
        assert_eq!(u64_to_u32(src_over_premul_nonpremul(dst, src)), 0xA01A_1109);

        let src_premul = nonpremul_to_premul_u64(src);
        assert_eq!(u64_to_u32(src_premul), 0x801A_1109);
        assert_eq!(u64_to_u32(src_over_premul_premul(dst, src_premul)), 0xA01A_1109);
    }

    #[test]
    fn src_over_extremes() {
        let dst = u32_to_u64(0xFF10_2030);
        assert_eq!(src_over_premul_premul(dst, u32_to_u64(0xFFAA_BBCC)), u32_to_u64(0xFFAA_BBCC));
        assert_eq!(src_over_premul_premul(dst, 0), dst);
        assert_eq!(src_over_nonpremul_nonpremul(dst, u32_to_u64(0x00AA_BBCC)), dst);
    }

    #[test]
    fn gray_and_swaps() {
        assert_eq!(gray_u32(0xFFFF_FFFF), 0xFF);
        assert_eq!(gray_u32(0xFF00_0000), 0x00);
        assert_eq!(gray_u32(0x00FF_0000), 0x4C);
        assert_eq!(swap_u32_argb_abgr(0x1122_3344), 0x1144_3322);
    }

    #[test]
    fn bit_replication() {
        assert_eq!(expand_to_u16(0x1F, 5), 0xFFFF);
        assert_eq!(expand_to_u16(0, 5), 0);
        for v in 0..32u64 {
            assert_eq!(expand_to_u16(v, 5) >> 8, (v << 3) | (v >> 2));
            assert_eq!(narrow_from_u16(expand_to_u16(v, 5), 5), v);
        }
        for v in 0..64u64 {
            assert_eq!(expand_to_u16(v, 6) >> 8, (v << 2) | (v >> 4));
        }
        assert_eq!(expand_to_u16(0xAB, 8), 0xABAB);
        assert_eq!(expand_to_u16(0x3, 2), 0xFFFF);
        assert_eq!(expand_to_u16(0x2, 2), 0xAAAA);
        assert_eq!(expand_to_u16(0x2AB, 10), 0xAAEA);
        assert_eq!(narrow_from_u16(0x4102, 8), 0x41);
        assert_eq!(narrow_from_u16(0x19B3, 8), 0x1A);
        for v in 0..=0xFFu64 {
            assert_eq!(narrow_from_u16(v * 0x101, 8), v);
        }
    }
}
