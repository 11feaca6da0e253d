//! Bit-packed pixel format and subsampling descriptors.
//!
//! # Pixel format layout
//!
//! ```plain
//! .- PixelFormat (u32) --------------------------------------------------------.
//! | 31 | 30 29 28 | 27 26 | 25 24 | 23 | 22 | 21 20 | 19..16 | 15..12 | .. | 3..0 |
//! |----+----------+-------+-------+----+----+-------+--------+--------+----+------|
//! |  0 |  color   |   0   | transp| BE | FP | planes| index  | ch 3   | .. | ch 0 |
//! `-------------------------------------------------------------------------------`
//! ```
//!
//! - color model: 0 alpha only, 1 gray, 2 BGR order, 3 RGB order, 4 YUV, 5 CMY
//! - transparency: 0 opaque, 1 opaque with a padding (or K) channel, 2 non-premultiplied alpha,
//!   3 premultiplied alpha
//! - BE: multi-byte samples are big-endian
//! - FP: samples are floating point
//! - planes: number of planes minus one
//! - index: depth code of the palette index, 0 for direct color
//! - ch 0..3: depth codes of each channel, channel 0 first in memory
//!
//! Depth codes 0 to 8 are literal bit counts, 9 to 15 mean 10, 12, 16, 24, 32, 48 and 64 bits.

const DEPTH_CODES: [u32; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 16, 24, 32, 48, 64];

/// An opaque 32-bit pixel format descriptor. Zero is always invalid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorModel {
    Alpha,
    Gray,
    Bgr,
    Rgb,
    Yuv,
    Cmy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transparency {
    Opaque,
    /// An extra non-alpha channel: `X` padding for BGR/RGB, `K` ink for YUV/CMY.
    OpaqueWithPadding,
    NonPremultiplied,
    Premultiplied,
}

#[rustfmt::skip]
impl PixelFormat {
    pub const INVALID: Self = Self(0x0000_0000);

    pub const A: Self = Self(0x0200_0008);

    pub const Y: Self = Self(0x1000_0008);
    pub const Y_16LE: Self = Self(0x1000_000B);
    pub const Y_16BE: Self = Self(0x1080_000B);
    pub const YA_NONPREMUL: Self = Self(0x1200_0088);
    pub const YA_NONPREMUL_2X16BE: Self = Self(0x1280_00BB);
    pub const YA_PREMUL: Self = Self(0x1300_0088);

    pub const BGR_565: Self = Self(0x2000_0565);
    pub const BGR: Self = Self(0x2000_0888);
    pub const BGRX: Self = Self(0x2100_8888);
    pub const BGRX_4X16LE: Self = Self(0x2100_BBBB);
    pub const BGRA_NONPREMUL: Self = Self(0x2200_8888);
    pub const BGRA_NONPREMUL_4X16LE: Self = Self(0x2200_BBBB);
    pub const BGRA_PREMUL: Self = Self(0x2300_8888);
    pub const BGRA_PREMUL_4X16LE: Self = Self(0x2300_BBBB);

    pub const RGB: Self = Self(0x3000_0888);
    pub const RGB_3X16BE: Self = Self(0x3080_0BBB);
    pub const RGBX: Self = Self(0x3100_8888);
    pub const RGBA_NONPREMUL: Self = Self(0x3200_8888);
    pub const RGBA_NONPREMUL_4X16BE: Self = Self(0x3280_BBBB);
    pub const RGBA_PREMUL: Self = Self(0x3300_8888);

    pub const INDEXED__BGRX: Self = Self(0x2108_8888);
    pub const INDEXED__BGRA_NONPREMUL: Self = Self(0x2208_8888);
    pub const INDEXED__BGRA_PREMUL: Self = Self(0x2308_8888);

    pub const YUV: Self = Self(0x4020_0888);
    pub const YUVK: Self = Self(0x4130_8888);
    pub const YUVA_NONPREMUL: Self = Self(0x4230_8888);

    pub const CMY: Self = Self(0x5020_0888);
    pub const CMYK: Self = Self(0x5130_8888);
}

impl PixelFormat {
    #[inline]
    pub const fn repr(self) -> u32 {
        self.0
    }

    /// Non-zero, reserved bits clear, and a known color model.
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && (self.0 & 0x8C00_0000) == 0 && ((self.0 >> 28) & 7) <= 5
    }

    pub const fn color_model(self) -> Option<ColorModel> {
        match (self.0 >> 28) & 7 {
            0 => Some(ColorModel::Alpha),
            1 => Some(ColorModel::Gray),
            2 => Some(ColorModel::Bgr),
            3 => Some(ColorModel::Rgb),
            4 => Some(ColorModel::Yuv),
            5 => Some(ColorModel::Cmy),
            _ => None,
        }
    }

    pub const fn transparency(self) -> Transparency {
        match (self.0 >> 24) & 3 {
            0 => Transparency::Opaque,
            1 => Transparency::OpaqueWithPadding,
            2 => Transparency::NonPremultiplied,
            _ => Transparency::Premultiplied,
        }
    }

    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(
            self.transparency(),
            Transparency::NonPremultiplied | Transparency::Premultiplied
        )
    }

    #[inline]
    pub const fn is_premultiplied(self) -> bool {
        matches!(self.transparency(), Transparency::Premultiplied)
    }

    #[inline]
    pub const fn is_big_endian(self) -> bool {
        (self.0 >> 23) & 1 != 0
    }

    #[inline]
    pub const fn is_floating_point(self) -> bool {
        (self.0 >> 22) & 1 != 0
    }

    /// 1 to 4 for valid formats, 0 for [`PixelFormat::INVALID`].
    #[inline]
    pub const fn num_planes(self) -> u32 {
        if self.0 == 0 {
            0
        } else {
            ((self.0 >> 20) & 3) + 1
        }
    }

    #[inline]
    pub const fn is_indexed(self) -> bool {
        (self.0 >> 16) & 0xF != 0
    }

    #[inline]
    pub const fn is_direct(self) -> bool {
        self.0 != 0 && !self.is_indexed()
    }

    #[inline]
    pub const fn is_interleaved(self) -> bool {
        self.num_planes() == 1
    }

    #[inline]
    pub const fn is_planar(self) -> bool {
        self.num_planes() > 1
    }

    /// Bits per palette index, 0 for direct formats.
    #[inline]
    pub const fn index_depth(self) -> u32 {
        DEPTH_CODES[((self.0 >> 16) & 0xF) as usize]
    }

    /// Bits per sample of channel `c` (masked to 0..=3). For indexed formats this describes the
    /// palette entries, not the pixels.
    #[inline]
    pub const fn channel_depth(self, c: u32) -> u32 {
        DEPTH_CODES[((self.0 >> (4 * (c & 3))) & 0xF) as usize]
    }

    /// Channel depths, channel 0 first.
    pub const fn channel_depths(self) -> [u32; 4] {
        [
            self.channel_depth(0),
            self.channel_depth(1),
            self.channel_depth(2),
            self.channel_depth(3),
        ]
    }

    /// Bits per pixel of an interleaved format. 0 for planar and invalid formats.
    pub const fn bits_per_pixel(self) -> u32 {
        if !self.is_valid() || !self.is_interleaved() {
            return 0;
        }
        if self.is_indexed() {
            return self.index_depth();
        }
        let [a, b, c, d] = self.channel_depths();
        a + b + c + d
    }

    /// Bytes per pixel of an interleaved format, or 0 if that isn't a whole number.
    pub const fn bytes_per_pixel(self) -> u32 {
        let bpp = self.bits_per_pixel();
        if bpp % 8 != 0 {
            0
        } else {
            bpp / 8
        }
    }

    /// The format of the palette entries of an indexed format: the same transparency, as 4×8-bit
    /// BGRA. [`PixelFormat::INVALID`] for direct formats.
    pub const fn palette_format(self) -> PixelFormat {
        if !self.is_indexed() {
            return PixelFormat::INVALID;
        }
        PixelFormat(0x2000_8888 | (self.0 & 0x0300_0000))
    }
}

/// How each plane of a planar format samples the pixel grid.
///
/// Per plane `p`, byte `p` holds `(bias_x << 6) | (shift_x << 4) | (bias_y << 2) | shift_y`.
/// Pixel `(x, y)` maps to sample `((x + bias_x) >> shift_x, (y + bias_y) >> shift_y)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSubsampling(pub u32);

impl PixelSubsampling {
    pub const NONE: Self = Self(0x0000_0000);
    pub const S_444: Self = Self(0x0000_0000);
    pub const S_440: Self = Self(0x0001_0100);
    pub const S_422: Self = Self(0x0010_1000);
    pub const S_420: Self = Self(0x0011_1100);
    pub const S_411: Self = Self(0x0020_2000);
    pub const S_410: Self = Self(0x0021_2100);

    #[inline]
    pub const fn repr(self) -> u32 {
        self.0
    }

    // The plane index wraps around instead of panicking.
    #[inline]
    const fn field(self, plane: u32, shift: u32) -> u32 {
        (self.0 >> ((plane & 3) * 8 + shift)) & 3
    }

    #[inline]
    pub const fn bias_x(self, plane: u32) -> u32 {
        self.field(plane, 6)
    }

    #[inline]
    pub const fn shift_x(self, plane: u32) -> u32 {
        self.field(plane, 4)
    }

    #[inline]
    pub const fn bias_y(self, plane: u32) -> u32 {
        self.field(plane, 2)
    }

    #[inline]
    pub const fn shift_y(self, plane: u32) -> u32 {
        self.field(plane, 0)
    }

    /// Number of samples in plane `plane` covering `width` pixels.
    pub const fn plane_width(self, plane: u32, width: u32) -> u32 {
        if width == 0 {
            return 0;
        }
        (((width as u64 - 1 + self.bias_x(plane) as u64) >> self.shift_x(plane)) + 1) as u32
    }

    /// Number of sample rows in plane `plane` covering `height` pixels.
    pub const fn plane_height(self, plane: u32, height: u32) -> u32 {
        if height == 0 {
            return 0;
        }
        (((height as u64 - 1 + self.bias_y(plane) as u64) >> self.shift_y(plane)) + 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let f = PixelFormat::BGRA_NONPREMUL;
        assert!(f.is_valid());
        assert_eq!(f.color_model(), Some(ColorModel::Bgr));
        assert_eq!(f.transparency(), Transparency::NonPremultiplied);
        assert_eq!(f.num_planes(), 1);
        assert_eq!(f.bits_per_pixel(), 32);
        assert_eq!(f.bytes_per_pixel(), 4);

        assert_eq!(PixelFormat::BGR_565.channel_depths(), [5, 6, 5, 0]);
        assert_eq!(PixelFormat::BGR_565.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::RGBA_NONPREMUL_4X16BE.bytes_per_pixel(), 8);
        assert!(PixelFormat::Y_16BE.is_big_endian());
        assert!(!PixelFormat::Y_16LE.is_big_endian());
        assert_eq!(PixelFormat::A.color_model(), Some(ColorModel::Alpha));
    }

    #[test]
    fn invalid_format() {
        let f = PixelFormat::INVALID;
        assert!(!f.is_valid());
        assert_eq!(f.num_planes(), 0);
        assert_eq!(f.bits_per_pixel(), 0);
        assert!(!f.is_direct());
        assert!(!PixelFormat(0x7000_0008).is_valid());
    }

    #[test]
    fn indexed_formats() {
        for f in [
            PixelFormat::INDEXED__BGRX,
            PixelFormat::INDEXED__BGRA_NONPREMUL,
            PixelFormat::INDEXED__BGRA_PREMUL,
        ] {
            assert!(f.is_indexed());
            assert_eq!(f.num_planes(), 1);
            assert_eq!(f.bits_per_pixel(), 8);
            assert_eq!(f.palette_format().bytes_per_pixel(), 4);
        }
        assert_eq!(
            PixelFormat::INDEXED__BGRA_PREMUL.palette_format(),
            PixelFormat::BGRA_PREMUL
        );
        assert_eq!(PixelFormat::BGRA_PREMUL.palette_format(), PixelFormat::INVALID);
    }

    #[test]
    fn planar_formats() {
        assert_eq!(PixelFormat::YUV.num_planes(), 3);
        assert_eq!(PixelFormat::CMYK.num_planes(), 4);
        assert!(PixelFormat::YUVA_NONPREMUL.is_planar());
        assert_eq!(PixelFormat::YUV.bits_per_pixel(), 0);
    }

    #[test]
    fn subsampling() {
        let s = PixelSubsampling::S_420;
        assert_eq!((s.shift_x(0), s.shift_y(0)), (0, 0));
        assert_eq!((s.shift_x(1), s.shift_y(1)), (1, 1));
        assert_eq!((s.shift_x(2), s.shift_y(2)), (1, 1));
        // plane 5 wraps to plane 1
        assert_eq!(s.shift_x(5), s.shift_x(1));
        assert_eq!(PixelSubsampling::S_410.shift_x(1), 2);
        assert_eq!(PixelSubsampling::S_410.shift_y(1), 1);

        assert_eq!(s.plane_width(1, 5), 3);
        assert_eq!(s.plane_height(1, 4), 2);
        assert_eq!(s.plane_width(0, 5), 5);
        assert_eq!(s.plane_width(1, 0), 0);

        let biased = PixelSubsampling(0x0000_C000);
        assert_eq!(biased.bias_x(1), 3);
        assert_eq!(biased.plane_width(1, 1), 4);
    }
}
