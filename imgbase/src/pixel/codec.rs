//! Loading and storing single pixels of any supported interleaved format as 16-bit
//! `0xAAAARRRRGGGGBBBB` values.

use super::{
    color::{expand_to_u16, gray_u16, join_u64, narrow_from_u16, split_u64},
    format::{ColorModel, PixelFormat, Transparency},
};
use crate::utils::{peek_uint, poke_uint, BigEndian, LittleEndian};

/// How a pixel's color relates to its alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaKind {
    Opaque,
    NonPremultiplied,
    Premultiplied,
}

impl AlphaKind {
    pub const fn of(pixfmt: PixelFormat) -> AlphaKind {
        match pixfmt.transparency() {
            Transparency::Opaque | Transparency::OpaqueWithPadding => AlphaKind::Opaque,
            Transparency::NonPremultiplied => AlphaKind::NonPremultiplied,
            Transparency::Premultiplied => AlphaKind::Premultiplied,
        }
    }
}

/// What a stored channel means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Blue,
    Green,
    Red,
    Alpha,
    Gray,
    /// Ignored on load, all ones on store.
    Pad,
}

#[derive(Debug, Clone, Copy)]
struct Channel {
    lane: Lane,
    depth: u32,
    /// Bit offset within a packed pixel, or byte offset within a byte-aligned pixel.
    offset: u32,
}

/// A precomputed description of where each channel of a pixel format lives.
#[derive(Debug, Clone, Copy)]
pub struct PixelLayout {
    channels: [Channel; 4],
    num_channels: usize,
    bytes_per_pixel: usize,
    /// Channels are whole bytes and stored one sample at a time. Otherwise the whole pixel is
    /// one integer with channel 0 in its low bits.
    byte_aligned: bool,
    big_endian: bool,
    kind: AlphaKind,
}

impl PixelLayout {
    /// The layout of a direct, interleaved, integer format with whole-byte pixels and channels
    /// of at most 16 bits. `None` for anything else.
    pub fn new(pixfmt: PixelFormat) -> Option<PixelLayout> {
        if !pixfmt.is_valid()
            || !pixfmt.is_interleaved()
            || pixfmt.is_indexed()
            || pixfmt.is_floating_point()
        {
            return None;
        }
        let bytes_per_pixel = pixfmt.bytes_per_pixel() as usize;
        if bytes_per_pixel == 0 || bytes_per_pixel > 8 {
            return None;
        }

        let transparency = pixfmt.transparency();
        let extra = match transparency {
            Transparency::Opaque => None,
            Transparency::OpaqueWithPadding => Some(Lane::Pad),
            Transparency::NonPremultiplied | Transparency::Premultiplied => Some(Lane::Alpha),
        };
        #[rustfmt::skip]
        let lanes: [Option<Lane>; 4] = match pixfmt.color_model()? {
            ColorModel::Alpha => [Some(Lane::Alpha), None, None, None],
            ColorModel::Gray => [Some(Lane::Gray), extra, None, None],
            ColorModel::Bgr => [Some(Lane::Blue), Some(Lane::Green), Some(Lane::Red), extra],
            ColorModel::Rgb => [Some(Lane::Red), Some(Lane::Green), Some(Lane::Blue), extra],
            ColorModel::Yuv | ColorModel::Cmy => return None,
        };

        let depths = pixfmt.channel_depths();
        let byte_aligned = depths.iter().all(|d| d % 8 == 0);

        let mut channels = [Channel {
            lane: Lane::Pad,
            depth: 0,
            offset: 0,
        }; 4];
        let mut num_channels = 0;
        let mut offset = 0;
        for (lane, depth) in lanes.into_iter().zip(depths) {
            if depth == 0 {
                continue;
            }
            if depth > 16 {
                return None;
            }
            // A depth without a meaning, e.g. a fourth channel in an opaque BGR format.
            let lane = lane?;
            channels[num_channels] = Channel {
                lane,
                depth,
                offset: if byte_aligned { offset / 8 } else { offset },
            };
            num_channels += 1;
            offset += depth;
        }
        if num_channels == 0 || offset as usize != 8 * bytes_per_pixel {
            return None;
        }

        Some(PixelLayout {
            channels,
            num_channels,
            bytes_per_pixel,
            byte_aligned,
            big_endian: pixfmt.is_big_endian(),
            kind: AlphaKind::of(pixfmt),
        })
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    #[inline]
    pub fn kind(&self) -> AlphaKind {
        self.kind
    }

    #[inline(always)]
    fn read(&self, buf: &[u8], n: usize) -> u64 {
        if self.big_endian {
            peek_uint::<BigEndian>(buf, n)
        } else {
            peek_uint::<LittleEndian>(buf, n)
        }
    }

    #[inline(always)]
    fn write(&self, buf: &mut [u8], x: u64, n: usize) {
        if self.big_endian {
            poke_uint::<BigEndian>(buf, x, n)
        } else {
            poke_uint::<LittleEndian>(buf, x, n)
        }
    }

    /// Reads the pixel at the start of `src`, in this format's own alpha kind. Opaque formats
    /// load with full alpha, alpha-only formats load as black.
    ///
    /// `src` must hold at least [`bytes_per_pixel`](Self::bytes_per_pixel) bytes.
    pub fn load(&self, src: &[u8]) -> u64 {
        let packed = if self.byte_aligned {
            0
        } else {
            self.read(src, self.bytes_per_pixel)
        };

        let mut out = [0u64, 0, 0, 0xFFFF];
        for ch in &self.channels[..self.num_channels] {
            let raw = if self.byte_aligned {
                let start = ch.offset as usize;
                self.read(&src[start..], ch.depth as usize / 8)
            } else {
                (packed >> ch.offset) & ((1 << ch.depth) - 1)
            };
            let v = expand_to_u16(raw, ch.depth);
            match ch.lane {
                Lane::Blue => out[0] = v,
                Lane::Green => out[1] = v,
                Lane::Red => out[2] = v,
                Lane::Alpha => out[3] = v,
                Lane::Gray => {
                    out[0] = v;
                    out[1] = v;
                    out[2] = v;
                }
                Lane::Pad => {}
            }
        }
        join_u64(out)
    }

    /// Writes `color`, already in this format's alpha kind, to the start of `dst`.
    ///
    /// `dst` must hold at least [`bytes_per_pixel`](Self::bytes_per_pixel) bytes.
    pub fn store(&self, dst: &mut [u8], color: u64) {
        let [b, g, r, a] = split_u64(color);
        let mut packed = 0u64;
        for ch in &self.channels[..self.num_channels] {
            let v = match ch.lane {
                Lane::Blue => b,
                Lane::Green => g,
                Lane::Red => r,
                Lane::Alpha => a,
                Lane::Gray => gray_u16(r, g, b),
                Lane::Pad => 0xFFFF,
            };
            let v = narrow_from_u16(v, ch.depth);
            if self.byte_aligned {
                let start = ch.offset as usize;
                self.write(&mut dst[start..], v, ch.depth as usize / 8);
            } else {
                packed |= v << ch.offset;
            }
        }
        if !self.byte_aligned {
            self.write(dst, packed, self.bytes_per_pixel);
        }
    }
}
