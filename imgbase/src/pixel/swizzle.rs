//! Scanline conversion and compositing between pixel formats.
//!
//! A [`PixelSwizzler`] is prepared once per frame for a (destination, source, blend) triple and
//! then applied row by row. Preparation picks the cheapest strategy that is exact for the pair:
//! plain copies, red/blue swaps, palette expansion, or a generic path that widens every pixel to
//! 16 bits per channel, converts or composites, and narrows again.

use super::{
    codec::{AlphaKind, PixelLayout},
    color::{
        nonpremul_to_premul_u64, premul_to_nonpremul_u64, src_over_nonpremul_nonpremul,
        src_over_nonpremul_premul, src_over_premul_nonpremul, src_over_premul_premul,
    },
    format::{ColorModel, PixelFormat},
    PALETTE_ENTRY_LEN, PALETTE_LEN,
};
use crate::{
    io::IoBuffer,
    status::{error, Error},
};
use itertools::izip;
use snafu::ensure;

/// How source pixels combine with the destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelBlend {
    /// Overwrite the destination.
    #[default]
    Src,
    /// Porter-Duff "source over destination".
    SrcOver,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Direct(PixelLayout),
    /// 8-bit indices into a palette whose entries have this layout.
    Indexed(PixelLayout),
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
    Copy,
    SwapRedBlue,
    IndexedCopy,
    /// Destination pixels are exactly palette entries.
    PaletteExpand,
    Generic { src: Source, dst: PixelLayout },
}

/// A prepared conversion from one pixel format to another.
#[derive(Debug, Clone, Copy)]
pub struct PixelSwizzler {
    strategy: Strategy,
    blend: PixelBlend,
    dst_bpp: usize,
    src_bpp: usize,
}

/// Formats the swizzler can read or write at all.
fn check_format(pixfmt: PixelFormat) -> Result<(), Error> {
    let ok = match pixfmt.color_model() {
        Some(ColorModel::Alpha | ColorModel::Gray | ColorModel::Bgr | ColorModel::Rgb) => {
            if pixfmt.is_indexed() {
                pixfmt.is_valid()
                    && pixfmt.is_interleaved()
                    && pixfmt.index_depth() == 8
                    && !pixfmt.is_floating_point()
            } else {
                PixelLayout::new(pixfmt).is_some()
            }
        }
        _ => false,
    };
    ensure!(ok, error::UnsupportedPixelSwizzlerOptionSnafu);
    Ok(())
}

fn palette_layout(pixfmt: PixelFormat) -> Result<PixelLayout, Error> {
    PixelLayout::new(pixfmt.palette_format()).ok_or(Error::UnsupportedPixelSwizzlerOption)
}

/// Converts a color between alpha kinds for a plain overwrite. Non-premultiplied colors going
/// into an opaque format are flattened onto black.
#[inline(always)]
fn convert_kind(c: u64, from: AlphaKind, to: AlphaKind) -> u64 {
    match (from, to) {
        (AlphaKind::NonPremultiplied, AlphaKind::Premultiplied | AlphaKind::Opaque) => {
            nonpremul_to_premul_u64(c)
        }
        (AlphaKind::Premultiplied, AlphaKind::NonPremultiplied) => premul_to_nonpremul_u64(c),
        _ => c,
    }
}

#[inline(always)]
fn composite(dst: u64, dst_kind: AlphaKind, src: u64, src_kind: AlphaKind) -> u64 {
    match (dst_kind, src_kind) {
        (AlphaKind::NonPremultiplied, AlphaKind::NonPremultiplied) => {
            src_over_nonpremul_nonpremul(dst, src)
        }
        (AlphaKind::NonPremultiplied, _) => src_over_nonpremul_premul(dst, src),
        (_, AlphaKind::NonPremultiplied) => src_over_premul_nonpremul(dst, src),
        _ => src_over_premul_premul(dst, src),
    }
}

impl PixelSwizzler {
    /// Validates a conversion and picks how to do it.
    ///
    /// For indexed sources, `src_palette` (1024 bytes) is installed into `dst_palette` (at least
    /// 1024 bytes): as-is when the destination is direct, so that [`swizzle`](Self::swizzle) can
    /// look entries up there, or converted to the destination's palette format when both sides
    /// are indexed.
    pub fn prepare(
        dst_pixfmt: PixelFormat,
        dst_palette: &mut [u8],
        src_pixfmt: PixelFormat,
        src_palette: &[u8],
        blend: PixelBlend,
    ) -> Result<PixelSwizzler, Error> {
        check_format(dst_pixfmt)?;
        check_format(src_pixfmt)?;

        let src_opaque = if src_pixfmt.is_indexed() {
            AlphaKind::of(src_pixfmt.palette_format()) == AlphaKind::Opaque
        } else {
            AlphaKind::of(src_pixfmt) == AlphaKind::Opaque
        };
        let blend = if src_opaque { PixelBlend::Src } else { blend };

        let dst_bpp = dst_pixfmt.bytes_per_pixel() as usize;
        let src_bpp = src_pixfmt.bytes_per_pixel() as usize;

        if dst_pixfmt.is_indexed() {
            ensure!(
                src_pixfmt.is_indexed() && blend == PixelBlend::Src,
                error::UnsupportedPixelSwizzlerOptionSnafu
            );
        }

        let strategy = if src_pixfmt.is_indexed() {
            ensure!(src_palette.len() == PALETTE_LEN, error::BadArgumentSnafu);
            ensure!(
                dst_palette.len() >= PALETTE_LEN,
                error::BadArgumentLengthTooShortSnafu
            );
            let src_entries = palette_layout(src_pixfmt)?;
            let dst_palette = &mut dst_palette[..PALETTE_LEN];

            if dst_pixfmt.is_indexed() {
                let dst_entries = palette_layout(dst_pixfmt)?;
                for (d, s) in dst_palette
                    .chunks_exact_mut(PALETTE_ENTRY_LEN)
                    .zip(src_palette.chunks_exact(PALETTE_ENTRY_LEN))
                {
                    let c = convert_kind(src_entries.load(s), src_entries.kind(), dst_entries.kind());
                    dst_entries.store(d, c);
                }
                Strategy::IndexedCopy
            } else {
                dst_palette.copy_from_slice(src_palette);
                if dst_pixfmt == src_pixfmt.palette_format() && blend == PixelBlend::Src {
                    Strategy::PaletteExpand
                } else {
                    Strategy::Generic {
                        src: Source::Indexed(src_entries),
                        dst: PixelLayout::new(dst_pixfmt)
                            .ok_or(Error::UnsupportedPixelSwizzlerOption)?,
                    }
                }
            }
        } else if dst_pixfmt == src_pixfmt && blend == PixelBlend::Src {
            Strategy::Copy
        } else if is_red_blue_swap(dst_pixfmt, src_pixfmt) && blend == PixelBlend::Src {
            Strategy::SwapRedBlue
        } else {
            let layout = |f| PixelLayout::new(f).ok_or(Error::UnsupportedPixelSwizzlerOption);
            Strategy::Generic {
                src: Source::Direct(layout(src_pixfmt)?),
                dst: layout(dst_pixfmt)?,
            }
        };

        tracing::debug!(
            dst = dst_pixfmt.repr(),
            src = src_pixfmt.repr(),
            ?blend,
            ?strategy,
            "prepared pixel swizzler"
        );

        Ok(PixelSwizzler {
            strategy,
            blend,
            dst_bpp,
            src_bpp,
        })
    }

    /// The blend actually in effect. Opaque sources always use [`PixelBlend::Src`].
    #[inline]
    pub fn blend(&self) -> PixelBlend {
        self.blend
    }

    #[inline]
    pub fn dst_bytes_per_pixel(&self) -> usize {
        self.dst_bpp
    }

    #[inline]
    pub fn src_bytes_per_pixel(&self) -> usize {
        self.src_bpp
    }

    /// Converts as many whole pixels as fit in both `dst` and `src`, returning how many.
    ///
    /// `dst_palette` is the palette installed by [`prepare`](Self::prepare). Indexed sources
    /// convert nothing if it is shorter than 1024 bytes.
    pub fn swizzle(&self, dst: &mut [u8], dst_palette: &[u8], src: &[u8]) -> u64 {
        let n = (dst.len() / self.dst_bpp).min(src.len() / self.src_bpp);
        let dst = &mut dst[..n * self.dst_bpp];
        let src = &src[..n * self.src_bpp];

        match self.strategy {
            Strategy::Copy | Strategy::IndexedCopy => dst.copy_from_slice(src),
            Strategy::SwapRedBlue => {
                for (d, s) in izip!(
                    dst.chunks_exact_mut(self.dst_bpp),
                    src.chunks_exact(self.src_bpp)
                ) {
                    d.copy_from_slice(s);
                    d.swap(0, 2);
                }
            }
            Strategy::PaletteExpand => {
                let Some(palette) = dst_palette.get(..PALETTE_LEN) else {
                    return 0;
                };
                for (d, &i) in izip!(dst.chunks_exact_mut(PALETTE_ENTRY_LEN), src) {
                    let i = usize::from(i) * PALETTE_ENTRY_LEN;
                    d.copy_from_slice(&palette[i..i + PALETTE_ENTRY_LEN]);
                }
            }
            Strategy::Generic { src: source, dst: layout } => {
                let palette = match source {
                    Source::Indexed(_) => match dst_palette.get(..PALETTE_LEN) {
                        Some(p) => p,
                        None => return 0,
                    },
                    Source::Direct(_) => &[][..],
                };
                self.swizzle_generic(dst, layout, src, source, palette);
            }
        }
        n as u64
    }

    fn swizzle_generic(
        &self,
        dst: &mut [u8],
        dst_layout: PixelLayout,
        src: &[u8],
        source: Source,
        palette: &[u8],
    ) {
        let src_kind = match source {
            Source::Direct(l) | Source::Indexed(l) => l.kind(),
        };
        let dst_kind = dst_layout.kind();

        for (d, s) in izip!(
            dst.chunks_exact_mut(self.dst_bpp),
            src.chunks_exact(self.src_bpp)
        ) {
            let c = match &source {
                Source::Direct(l) => l.load(s),
                Source::Indexed(l) => {
                    let i = usize::from(s[0]) * PALETTE_ENTRY_LEN;
                    l.load(&palette[i..i + PALETTE_ENTRY_LEN])
                }
            };
            let out = match self.blend {
                PixelBlend::Src => convert_kind(c, src_kind, dst_kind),
                PixelBlend::SrcOver => composite(dst_layout.load(d), dst_kind, c, src_kind),
            };
            dst_layout.store(d, out);
        }
    }

    /// [`swizzle`](Self::swizzle) from the readable bytes of `src`, consuming the whole pixels
    /// that were converted.
    pub fn swizzle_from_reader<T: AsRef<[u8]>>(
        &self,
        dst: &mut [u8],
        dst_palette: &[u8],
        src: &mut IoBuffer<T>,
    ) -> u64 {
        self.limited_swizzle_from_reader(u64::MAX, dst, dst_palette, src)
    }

    /// Like [`swizzle_from_reader`](Self::swizzle_from_reader), converting at most `up_to`
    /// pixels.
    pub fn limited_swizzle_from_reader<T: AsRef<[u8]>>(
        &self,
        up_to: u64,
        dst: &mut [u8],
        dst_palette: &[u8],
        src: &mut IoBuffer<T>,
    ) -> u64 {
        let avail = src.reader_slice();
        let limit = usize::try_from(up_to)
            .unwrap_or(usize::MAX)
            .saturating_mul(self.src_bpp)
            .min(avail.len());
        let n = self.swizzle(dst, dst_palette, &avail[..limit]);
        src.consume(n as usize * self.src_bpp);
        n
    }

    /// Fills up to `n` pixels of `dst` with transparent black under [`PixelBlend::Src`], which is
    /// index 0 for indexed destinations. Under [`PixelBlend::SrcOver`] the destination is left
    /// alone. Returns how many pixels that covers.
    pub fn swizzle_transparent_black(&self, dst: &mut [u8], _dst_palette: &[u8], n: u64) -> u64 {
        let max = (dst.len() / self.dst_bpp) as u64;
        let n = n.min(max);
        if self.blend == PixelBlend::Src {
            dst[..n as usize * self.dst_bpp].fill(0);
        }
        n
    }
}

/// Same-depth 8-bit BGR(A/X) and RGB(A/X) with the same transparency.
fn is_red_blue_swap(dst: PixelFormat, src: PixelFormat) -> bool {
    dst.repr() ^ src.repr() == 0x1000_0000
        && matches!(src.color_model(), Some(ColorModel::Bgr | ColorModel::Rgb))
        && matches!(src.bytes_per_pixel(), 3 | 4)
        && src.channel_depths().iter().all(|&d| d == 0 || d == 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prep(dst: PixelFormat, src: PixelFormat, blend: PixelBlend) -> PixelSwizzler {
        PixelSwizzler::prepare(dst, &mut [], src, &[], blend).unwrap()
    }

    #[test]
    fn src_over_golden() {
        let s = prep(
            PixelFormat::BGRA_PREMUL,
            PixelFormat::BGRA_NONPREMUL,
            PixelBlend::SrcOver,
        );
        let mut dst = [0x00, 0x00, 0x00, 0x40];
        assert_eq!(s.swizzle(&mut dst, &[], &[0x11, 0x22, 0x33, 0x80]), 1);
        assert_eq!(dst, [0x09, 0x11, 0x1A, 0xA0]);

        let s = prep(PixelFormat::BGRA_PREMUL, PixelFormat::BGRA_NONPREMUL, PixelBlend::Src);
        assert_eq!(s.swizzle(&mut dst, &[], &[0x11, 0x22, 0x33, 0x80]), 1);
        assert_eq!(dst, [0x09, 0x11, 0x1A, 0x80]);
    }

    #[test]
    fn strategies() {
        let s = prep(PixelFormat::RGB, PixelFormat::RGB, PixelBlend::SrcOver);
        assert!(matches!(s.strategy, Strategy::Copy));
        assert_eq!(s.blend(), PixelBlend::Src);

        let s = prep(PixelFormat::RGBA_PREMUL, PixelFormat::BGRA_PREMUL, PixelBlend::Src);
        assert!(matches!(s.strategy, Strategy::SwapRedBlue));
        let mut dst = [0u8; 8];
        assert_eq!(s.swizzle(&mut dst, &[], &[1, 2, 3, 4, 5, 6, 7, 8, 9]), 2);
        assert_eq!(dst, [3, 2, 1, 4, 7, 6, 5, 8]);

        let s = prep(PixelFormat::RGBA_PREMUL, PixelFormat::BGRA_PREMUL, PixelBlend::SrcOver);
        assert!(matches!(s.strategy, Strategy::Generic { .. }));
    }

    #[test]
    fn generic_depth_conversions() {
        let s = prep(PixelFormat::BGR_565, PixelFormat::RGB, PixelBlend::Src);
        let mut dst = [0u8; 4];
        assert_eq!(s.swizzle(&mut dst, &[], &[0xFF, 0x00, 0x00, 0x00, 0xFF, 0x00]), 2);
        assert_eq!(dst, [0x00, 0xF8, 0xE0, 0x07]);

        let s = prep(PixelFormat::BGRA_NONPREMUL_4X16LE, PixelFormat::BGR_565, PixelBlend::Src);
        let mut dst = [0u8; 8];
        s.swizzle(&mut dst, &[], &0x001Fu16.to_le_bytes());
        assert_eq!(dst, [0xFF, 0xFF, 0, 0, 0, 0, 0xFF, 0xFF]);

        let s = prep(PixelFormat::Y, PixelFormat::BGRX, PixelBlend::Src);
        let mut dst = [0u8; 1];
        s.swizzle(&mut dst, &[], &[0xFF, 0xFF, 0xFF, 0x00]);
        assert_eq!(dst, [0xFF]);
    }

    #[test]
    fn nonpremul_into_opaque_flattens_onto_black() {
        let s = prep(PixelFormat::BGRX, PixelFormat::BGRA_NONPREMUL, PixelBlend::Src);
        let mut dst = [0u8; 4];
        s.swizzle(&mut dst, &[], &[0x11, 0x22, 0x33, 0x80]);
        assert_eq!(dst, [0x09, 0x11, 0x1A, 0xFF]);
    }

    #[test]
    fn src_over_into_nonpremul() {
        let s = prep(
            PixelFormat::BGRA_NONPREMUL,
            PixelFormat::BGRA_PREMUL,
            PixelBlend::SrcOver,
        );
        let mut dst = [0x10, 0x20, 0x30, 0xFF];
        s.swizzle(&mut dst, &[], &[0, 0, 0, 0]);
        assert_eq!(dst, [0x10, 0x20, 0x30, 0xFF]);
        s.swizzle(&mut dst, &[], &[0x40, 0x40, 0x40, 0xFF]);
        assert_eq!(dst, [0x40, 0x40, 0x40, 0xFF]);
    }

    fn test_palette() -> [u8; PALETTE_LEN] {
        let mut p = [0u8; PALETTE_LEN];
        p[4..8].copy_from_slice(&[0x11, 0x22, 0x33, 0x80]);
        p[8..12].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xFF]);
        p
    }

    #[test]
    fn indexed_sources() {
        let src_palette = test_palette();
        let mut dst_palette = [0u8; PALETTE_LEN];

        let s = PixelSwizzler::prepare(
            PixelFormat::BGRA_NONPREMUL,
            &mut dst_palette,
            PixelFormat::INDEXED__BGRA_NONPREMUL,
            &src_palette,
            PixelBlend::Src,
        )
        .unwrap();
        assert!(matches!(s.strategy, Strategy::PaletteExpand));
        assert_eq!(dst_palette, src_palette);
        let mut dst = [0u8; 8];
        assert_eq!(s.swizzle(&mut dst, &dst_palette, &[2, 1]), 2);
        assert_eq!(dst, [0xAA, 0xBB, 0xCC, 0xFF, 0x11, 0x22, 0x33, 0x80]);
        assert_eq!(s.swizzle(&mut dst, &dst_palette[..1000], &[2, 1]), 0);

        let s = PixelSwizzler::prepare(
            PixelFormat::RGB,
            &mut dst_palette,
            PixelFormat::INDEXED__BGRA_NONPREMUL,
            &src_palette,
            PixelBlend::Src,
        )
        .unwrap();
        let mut dst = [0u8; 6];
        assert_eq!(s.swizzle(&mut dst, &dst_palette, &[2, 1]), 2);
        assert_eq!(dst, [0xCC, 0xBB, 0xAA, 0x1A, 0x11, 0x09]);
    }

    #[test]
    fn indexed_to_indexed_converts_palette() {
        let src_palette = test_palette();
        let mut dst_palette = [0u8; PALETTE_LEN];
        let s = PixelSwizzler::prepare(
            PixelFormat::INDEXED__BGRA_PREMUL,
            &mut dst_palette,
            PixelFormat::INDEXED__BGRA_NONPREMUL,
            &src_palette,
            PixelBlend::Src,
        )
        .unwrap();
        assert_eq!(&dst_palette[4..8], &[0x09, 0x11, 0x1A, 0x80]);
        assert_eq!(&dst_palette[8..12], &[0xAA, 0xBB, 0xCC, 0xFF]);
        let mut dst = [0u8; 3];
        assert_eq!(s.swizzle(&mut dst, &dst_palette, &[1, 2, 0]), 3);
        assert_eq!(dst, [1, 2, 0]);
    }

    #[test]
    fn rejects() {
        let unsupported = |dst, src, blend| {
            PixelSwizzler::prepare(dst, &mut [0u8; PALETTE_LEN], src, &[0u8; PALETTE_LEN], blend)
                .unwrap_err()
        };
        assert_eq!(
            unsupported(PixelFormat::YUV, PixelFormat::RGB, PixelBlend::Src),
            Error::UnsupportedPixelSwizzlerOption
        );
        assert_eq!(
            unsupported(PixelFormat::RGB, PixelFormat::INVALID, PixelBlend::Src),
            Error::UnsupportedPixelSwizzlerOption
        );
        assert_eq!(
            unsupported(PixelFormat::INDEXED__BGRA_PREMUL, PixelFormat::RGB, PixelBlend::Src),
            Error::UnsupportedPixelSwizzlerOption
        );
        assert_eq!(
            unsupported(
                PixelFormat::INDEXED__BGRA_PREMUL,
                PixelFormat::INDEXED__BGRA_PREMUL,
                PixelBlend::SrcOver
            ),
            Error::UnsupportedPixelSwizzlerOption
        );
        assert_eq!(
            PixelSwizzler::prepare(
                PixelFormat::RGB,
                &mut [0u8; 16],
                PixelFormat::INDEXED__BGRA_PREMUL,
                &[0u8; PALETTE_LEN],
                PixelBlend::Src
            )
            .unwrap_err(),
            Error::BadArgumentLengthTooShort
        );
        assert_eq!(
            PixelSwizzler::prepare(
                PixelFormat::RGB,
                &mut [0u8; PALETTE_LEN],
                PixelFormat::INDEXED__BGRA_PREMUL,
                &[0u8; 16],
                PixelBlend::Src
            )
            .unwrap_err(),
            Error::BadArgument
        );
    }

    #[test]
    fn from_reader_and_transparent_black() {
        let s = prep(PixelFormat::RGB, PixelFormat::BGR, PixelBlend::Src);
        let mut src = IoBuffer::reader(&[1u8, 2, 3, 4, 5, 6, 7][..], false);
        let mut dst = [0u8; 9];
        assert_eq!(s.limited_swizzle_from_reader(1, &mut dst, &[], &mut src), 1);
        assert_eq!(src.reader_position(), 3);
        assert_eq!(s.swizzle_from_reader(&mut dst[3..], &[], &mut src), 1);
        assert_eq!(src.reader_length(), 1);
        assert_eq!(dst, [3, 2, 1, 6, 5, 4, 0, 0, 0]);

        assert_eq!(s.swizzle_transparent_black(&mut dst, &[], 2), 2);
        assert_eq!(dst, [0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let s = prep(PixelFormat::BGRA_PREMUL, PixelFormat::BGRA_PREMUL, PixelBlend::SrcOver);
        let mut dst = [9u8; 8];
        assert_eq!(s.swizzle_transparent_black(&mut dst, &[], 100), 2);
        assert_eq!(dst, [9u8; 8]);
    }
}
