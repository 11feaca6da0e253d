use super::{
    codec::{AlphaKind, PixelLayout},
    color::{nonpremul_to_premul_u64, premul_to_nonpremul_u64, split_u64, u32_to_u64, u64_to_u32},
    config::PixelConfig,
    format::PixelFormat,
    PALETTE_LEN,
};
use crate::{
    range::RectIeU32,
    status::{error, Error},
    table::Table,
};
use snafu::ensure;

/// Pixels laid out per a [`PixelConfig`], in memory borrowed from the caller.
///
/// Interleaved formats use plane 0. Indexed formats additionally have a 1024-byte palette of 256
/// BGRA entries, taken from the end of the memory given to
/// [`set_from_slice`](Self::set_from_slice). Planar formats use one plane per channel, each sized
/// by the config's subsampling.
#[derive(Debug, Default)]
pub struct PixelBuffer<'a> {
    pixcfg: PixelConfig,
    planes: [Table<'a>; 4],
    /// Stand-in for planes past the fourth. Always empty.
    no_plane: Table<'a>,
    palette: &'a mut [u8],
}

impl<'a> PixelBuffer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for [`set_from_slice`](Self::set_from_slice) on a new buffer.
    pub fn from_slice(pixcfg: &PixelConfig, memory: &'a mut [u8]) -> Result<Self, Error> {
        let mut b = Self::new();
        b.set_from_slice(pixcfg, memory)?;
        Ok(b)
    }

    /// Lays out `pixcfg` over `memory`, tightly packed: rows are exactly as wide as the image, and
    /// planes follow each other.
    ///
    /// On failure the buffer is left empty.
    pub fn set_from_slice(&mut self, pixcfg: &PixelConfig, memory: &'a mut [u8]) -> Result<(), Error> {
        *self = Self::default();
        let res = self.set_from_slice_inner(pixcfg, memory);
        if let Err(e) = res {
            tracing::debug!(
                error = e.message(),
                pixfmt = pixcfg.pixel_format().repr(),
                "rejected pixel buffer memory"
            );
        }
        res
    }

    fn set_from_slice_inner(
        &mut self,
        pixcfg: &PixelConfig,
        memory: &'a mut [u8],
    ) -> Result<(), Error> {
        ensure!(pixcfg.is_valid(), error::BadArgumentSnafu);
        let pixfmt = pixcfg.pixel_format();
        ensure!(!pixfmt.is_floating_point(), error::UnsupportedOptionSnafu);
        let (w, h) = (pixcfg.width() as usize, pixcfg.height() as usize);

        if pixfmt.is_planar() {
            let pixsub = pixcfg.pixel_subsampling();
            let mut planes: [Table<'a>; 4] = Default::default();
            let mut rest = memory;
            for (p, plane) in (0..pixfmt.num_planes()).zip(planes.iter_mut()) {
                let bits = pixfmt.channel_depth(p);
                ensure!(bits != 0 && bits % 8 == 0, error::UnsupportedOptionSnafu);
                let pw = pixsub.plane_width(p, pixcfg.width()) as usize;
                let ph = pixsub.plane_height(p, pixcfg.height()) as usize;
                let width_in_bytes = pw.checked_mul(bits as usize / 8).ok_or(Error::BadArgument)?;
                let len = width_in_bytes.checked_mul(ph).ok_or(Error::BadArgument)?;
                ensure!(rest.len() >= len, error::BadArgumentLengthTooShortSnafu);
                let (this, tail) = rest.split_at_mut(len);
                *plane = Table::new(this, width_in_bytes, ph, width_in_bytes)?;
                rest = tail;
            }
            self.planes = planes;
            self.pixcfg = *pixcfg;
            return Ok(());
        }

        let bpp = pixfmt.bytes_per_pixel() as usize;
        ensure!(bpp != 0, error::UnsupportedOptionSnafu);
        let width_in_bytes = w.checked_mul(bpp).ok_or(Error::BadArgument)?;
        let len = width_in_bytes.checked_mul(h).ok_or(Error::BadArgument)?;

        let (pixels, palette) = if pixfmt.is_indexed() {
            ensure!(
                memory.len() >= PALETTE_LEN,
                error::BadArgumentLengthTooShortSnafu
            );
            let split = memory.len() - PALETTE_LEN;
            memory.split_at_mut(split)
        } else {
            (memory, Default::default())
        };
        ensure!(pixels.len() >= len, error::BadArgumentLengthTooShortSnafu);

        self.planes[0] = Table::new(pixels, width_in_bytes, h, width_in_bytes)?;
        self.palette = palette;
        self.pixcfg = *pixcfg;
        Ok(())
    }

    /// Uses `table` as plane 0 of an interleaved format. The table may be larger than the image.
    /// Indexed formats get no palette.
    pub fn set_from_table(&mut self, pixcfg: &PixelConfig, table: Table<'a>) -> Result<(), Error> {
        *self = Self::default();
        let pixfmt = pixcfg.pixel_format();
        ensure!(
            pixcfg.is_valid() && !pixfmt.is_planar(),
            error::BadArgumentSnafu
        );
        let bpp = pixfmt.bytes_per_pixel() as usize;
        ensure!(
            bpp != 0 && !pixfmt.is_floating_point(),
            error::UnsupportedOptionSnafu
        );
        let width_in_bytes = (pixcfg.width() as usize)
            .checked_mul(bpp)
            .ok_or(Error::BadArgument)?;
        ensure!(
            width_in_bytes <= table.width() && pixcfg.height() as usize <= table.height(),
            error::BadArgumentSnafu
        );

        self.planes[0] = table;
        self.pixcfg = *pixcfg;
        Ok(())
    }

    #[inline]
    pub fn pixel_config(&self) -> &PixelConfig {
        &self.pixcfg
    }

    #[inline]
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixcfg.pixel_format()
    }

    /// Plane `p`. Planes past the format's last are empty tables.
    pub fn plane(&self, p: u32) -> &Table<'a> {
        self.planes.get(p as usize).unwrap_or(&self.no_plane)
    }

    pub fn plane_mut(&mut self, p: u32) -> &mut Table<'a> {
        let p = p as usize;
        if p < self.planes.len() {
            return &mut self.planes[p];
        }
        self.no_plane = Table::empty();
        &mut self.no_plane
    }

    /// The palette: 1024 bytes for indexed formats, empty otherwise.
    #[inline]
    pub fn palette(&self) -> &[u8] {
        self.palette
    }

    #[inline]
    pub fn palette_mut(&mut self) -> &mut [u8] {
        self.palette
    }

    /// Copies `palette` in, but only if it is exactly 1024 bytes and this buffer has a palette.
    /// Anything else is silently ignored.
    pub fn set_palette(&mut self, palette: &[u8]) {
        if palette.len() == PALETTE_LEN && self.palette.len() == PALETTE_LEN {
            self.palette.copy_from_slice(palette);
        }
    }

    /// Row `y` of plane 0, along with the palette. Lets a decoder write pixels while reading the
    /// palette without fighting the borrow checker.
    pub fn row_and_palette_mut(&mut self, y: u32) -> (&mut [u8], &[u8]) {
        let row = self.planes[0].row_mut(y as usize);
        (row, &*self.palette)
    }

    fn layout_for_pixels(&self) -> Option<PixelLayout> {
        let pixfmt = self.pixel_format();
        if pixfmt.is_indexed() {
            PixelLayout::new(pixfmt.palette_format())
        } else {
            PixelLayout::new(pixfmt)
        }
    }

    /// The premultiplied ARGB color at `(x, y)`, or 0 if out of bounds or unsupported.
    pub fn color_u32_at(&self, x: u32, y: u32) -> u32 {
        if !self.pixcfg.bounds().contains(x, y) {
            return 0;
        }
        let pixfmt = self.pixel_format();
        let Some(layout) = self.layout_for_pixels() else {
            return 0;
        };
        let row = self.planes[0].row(y as usize);

        let c = if pixfmt.is_indexed() {
            let index = usize::from(row[x as usize]);
            match self.palette.get(4 * index..4 * index + 4) {
                Some(entry) => layout.load(entry),
                None => return 0,
            }
        } else {
            let bpp = layout.bytes_per_pixel();
            layout.load(&row[bpp * x as usize..])
        };

        match layout.kind() {
            AlphaKind::NonPremultiplied => u64_to_u32(nonpremul_to_premul_u64(c)),
            AlphaKind::Opaque | AlphaKind::Premultiplied => u64_to_u32(c),
        }
    }

    /// Encodes a premultiplied ARGB color as this buffer's pixel bytes, returning how many bytes
    /// a pixel is.
    fn encode_color(&self, color: u32, out: &mut [u8; 8]) -> Result<usize, Error> {
        let pixfmt = self.pixel_format();
        if pixfmt.is_indexed() {
            ensure!(
                self.palette.len() == PALETTE_LEN,
                error::BadArgumentLengthTooShortSnafu
            );
            out[0] = palette_closest_element(self.palette, pixfmt.palette_format(), color);
            return Ok(1);
        }
        let layout = PixelLayout::new(pixfmt).ok_or(Error::UnsupportedOption)?;
        let c = u32_to_u64(color);
        let c = match layout.kind() {
            AlphaKind::NonPremultiplied => premul_to_nonpremul_u64(c),
            AlphaKind::Opaque | AlphaKind::Premultiplied => c,
        };
        layout.store(out, c);
        Ok(layout.bytes_per_pixel())
    }

    /// Sets the pixel at `(x, y)` to a premultiplied ARGB color. Indexed formats get the index
    /// of the closest palette entry.
    pub fn set_color_u32_at(&mut self, x: u32, y: u32, color: u32) -> Result<(), Error> {
        ensure!(self.pixcfg.bounds().contains(x, y), error::BadArgumentSnafu);
        let mut encoded = [0u8; 8];
        let n = self.encode_color(color, &mut encoded)?;
        let row = self.planes[0].row_mut(y as usize);
        let start = n * x as usize;
        row[start..start + n].copy_from_slice(&encoded[..n]);
        Ok(())
    }

    /// Sets every pixel in `rect`, clipped to the image bounds, to a premultiplied ARGB color.
    pub fn set_color_u32_fill_rect(&mut self, rect: RectIeU32, color: u32) -> Result<(), Error> {
        let rect = rect.intersect(&self.pixcfg.bounds());
        if rect.is_empty() {
            return Ok(());
        }
        let mut encoded = [0u8; 8];
        let n = self.encode_color(color, &mut encoded)?;
        let encoded = &encoded[..n];

        for y in rect.min_incl_y..rect.max_excl_y {
            let row = self.planes[0].row_mut(y as usize);
            let span = &mut row[n * rect.min_incl_x as usize..n * rect.max_excl_x as usize];
            for px in span.chunks_exact_mut(n) {
                px.copy_from_slice(encoded);
            }
        }
        Ok(())
    }
}

/// The index of the palette entry closest to a premultiplied ARGB color, by squared distance
/// over all four channels in 16-bit premultiplied space. Ties go to the lowest index.
///
/// `palette_format` says how the entries are stored (see [`PixelFormat::palette_format`]).
/// Returns 0 for a palette that isn't 1024 bytes.
pub fn palette_closest_element(palette: &[u8], palette_format: PixelFormat, color: u32) -> u8 {
    if palette.len() != PALETTE_LEN {
        return 0;
    }
    let nonpremul = palette_format.transparency() == super::Transparency::NonPremultiplied;
    let [cb, cg, cr, ca] = split_u64(u32_to_u64(color));

    let mut best_index = 0u8;
    let mut best_score = u64::MAX;
    for (i, entry) in palette.chunks_exact(4).enumerate() {
        let mut p = u32_to_u64(u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]));
        if nonpremul {
            p = nonpremul_to_premul_u64(p);
        }
        let [pb, pg, pr, pa] = split_u64(p);
        let score = cb.abs_diff(pb).pow(2)
            + cg.abs_diff(pg).pow(2)
            + cr.abs_diff(pr).pow(2)
            + ca.abs_diff(pa).pow(2);
        if score < best_score {
            best_score = score;
            best_index = i as u8;
        }
    }
    best_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelSubsampling;

    fn cfg(f: PixelFormat, w: u32, h: u32) -> PixelConfig {
        PixelConfig::from_parts(f, PixelSubsampling::NONE, w, h)
    }

    #[test]
    fn interleaved_layout() {
        let mut mem = vec![0u8; 40];
        let mut pb =
            PixelBuffer::from_slice(&cfg(PixelFormat::BGRA_PREMUL, 3, 3), &mut mem).unwrap();
        let t = pb.plane(0);
        assert_eq!((t.width(), t.height(), t.stride()), (12, 3, 12));
        assert!(pb.palette().is_empty());
        assert!(pb.plane(1).is_empty());
        assert!(pb.plane(9).is_empty());
        assert_eq!(pb.plane_mut(0).row_mut(2).len(), 12);
        assert!(pb.plane_mut(u32::MAX).is_empty());
    }

    #[test]
    fn rejects_bad_memory() {
        let mut mem = vec![0u8; 35];
        assert_eq!(
            PixelBuffer::from_slice(&cfg(PixelFormat::BGRA_PREMUL, 3, 3), &mut mem).unwrap_err(),
            Error::BadArgumentLengthTooShort
        );
        assert_eq!(
            PixelBuffer::from_slice(&PixelConfig::new(), &mut mem).unwrap_err(),
            Error::BadArgument
        );
        assert_eq!(
            PixelBuffer::from_slice(&cfg(PixelFormat(0x1000_0001), 3, 3), &mut mem).unwrap_err(),
            Error::UnsupportedOption
        );
        let mut small = vec![0u8; 1024 + 8];
        assert_eq!(
            PixelBuffer::from_slice(&cfg(PixelFormat::INDEXED__BGRA_PREMUL, 3, 3), &mut small)
                .unwrap_err(),
            Error::BadArgumentLengthTooShort
        );
    }

    #[test]
    fn indexed_palette_at_end() {
        let mut mem = vec![0u8; 9 + 1024 + 7];
        let mut pb =
            PixelBuffer::from_slice(&cfg(PixelFormat::INDEXED__BGRA_PREMUL, 3, 3), &mut mem)
                .unwrap();
        assert_eq!(pb.palette().len(), 1024);
        assert!(pb.pixel_format().is_indexed());

        pb.set_palette(&[7u8; 1000]);
        assert!(pb.palette().iter().all(|&b| b == 0));

        let mut palette = [0u8; 1024];
        palette[4..8].copy_from_slice(&0xFF11_2233u32.to_le_bytes());
        palette[8..12].copy_from_slice(&0x8000_0080u32.to_le_bytes());
        pb.set_palette(&palette);
        assert_eq!(pb.palette(), &palette[..]);

        pb.set_color_u32_at(1, 1, 0xFF11_2234).unwrap();
        pb.set_color_u32_at(2, 1, 0x7F00_0080).unwrap();
        assert_eq!(pb.plane(0).row(1), &[0, 1, 2]);
        assert_eq!(pb.color_u32_at(1, 1), 0xFF11_2233);
        assert_eq!(pb.color_u32_at(0, 0), 0);
        drop(pb);
        assert_eq!(mem[4], 1);
    }

    #[test]
    fn planar_layout() {
        let c = PixelConfig::from_parts(PixelFormat::YUV, PixelSubsampling::S_420, 5, 3);
        let mut mem = vec![0u8; 27];
        let pb = PixelBuffer::from_slice(&c, &mut mem).unwrap();
        let dims = |p| {
            let t: &Table = pb.plane(p);
            (t.width(), t.height())
        };
        assert_eq!(dims(0), (5, 3));
        assert_eq!(dims(1), (3, 2));
        assert_eq!(dims(2), (3, 2));
        assert_eq!(dims(3), (0, 0));

        let mut short = vec![0u8; 26];
        assert_eq!(
            PixelBuffer::from_slice(&c, &mut short).unwrap_err(),
            Error::BadArgumentLengthTooShort
        );
    }

    #[test]
    fn from_table() {
        let mut mem = vec![0u8; 100];
        let t = Table::new(&mut mem, 10, 10, 10).unwrap();
        let mut pb = PixelBuffer::new();
        pb.set_from_table(&cfg(PixelFormat::RGB, 3, 10), t).unwrap();
        assert_eq!(pb.plane(0).stride(), 10);

        let mut mem2 = vec![0u8; 100];
        let t = Table::new(&mut mem2, 10, 10, 10).unwrap();
        assert_eq!(
            pb.set_from_table(&cfg(PixelFormat::RGB, 4, 10), t).unwrap_err(),
            Error::BadArgument
        );
    }

    #[test]
    fn colors_round_trip_through_pixels() {
        let mut mem = vec![0u8; 4 * 4 * 4];
        let mut pb = PixelBuffer::from_slice(&cfg(PixelFormat::BGRA_NONPREMUL, 4, 4), &mut mem).unwrap();
        pb.set_color_u32_at(3, 2, 0x8019_1108).unwrap();
        assert_eq!(&pb.plane(0).row(2)[12..], &[0x10, 0x22, 0x32, 0x80]);
        assert_eq!(pb.color_u32_at(3, 2), 0x8019_1108);
        assert_eq!(
            pb.set_color_u32_at(4, 0, 0).unwrap_err(),
            Error::BadArgument
        );
    }

    #[test]
    fn fill_rect_clips() {
        let mut mem = vec![0u8; 4 * 3];
        let mut pb = PixelBuffer::from_slice(&cfg(PixelFormat::RGB, 2, 2), &mut mem).unwrap();
        pb.set_color_u32_fill_rect(RectIeU32::new(1, 0, 9, 9), 0xFF01_0203).unwrap();
        assert_eq!(pb.plane(0).row(0), &[0, 0, 0, 1, 2, 3]);
        assert_eq!(pb.plane(0).row(1), &[0, 0, 0, 1, 2, 3]);

        let c = PixelConfig::from_parts(PixelFormat::YUV, PixelSubsampling::NONE, 1, 1);
        let mut mem = vec![0u8; 3];
        let mut pb = PixelBuffer::from_slice(&c, &mut mem).unwrap();
        assert_eq!(
            pb.set_color_u32_fill_rect(RectIeU32::from_size(1, 1), 0).unwrap_err(),
            Error::UnsupportedOption
        );
    }

    #[test]
    fn closest_element_ties_and_premul() {
        let mut palette = [0u8; 1024];
        for i in 0..256 {
            palette[4 * i..4 * i + 4].copy_from_slice(&0xFF00_0000u32.to_le_bytes());
        }
        palette[40..44].copy_from_slice(&0x80FF_FFFFu32.to_le_bytes());
        // non-premultiplied white at half alpha is premultiplied 0x80808080
        assert_eq!(
            palette_closest_element(&palette, PixelFormat::BGRA_NONPREMUL, 0x8080_8080),
            10
        );
        assert_eq!(
            palette_closest_element(&palette, PixelFormat::BGRA_PREMUL, 0x8080_8080),
            10
        );
        assert_eq!(
            palette_closest_element(&palette, PixelFormat::BGRA_PREMUL, 0xFF00_0000),
            0
        );
        assert_eq!(palette_closest_element(&palette[..4], PixelFormat::BGRA_PREMUL, 0), 0);
    }
}
