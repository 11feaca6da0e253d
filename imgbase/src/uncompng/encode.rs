use super::{ColorType, IDAT, IEND_CHUNK, IHDR, IHDR_LEN, SIGNATURE};
use crate::{
    checksum::{crc32_ieee, Adler32},
    pixel::PixelFormat,
    status::{error, Error},
};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use snafu::{ensure, ResultExt, Snafu};
use std::io::Write;

/// The smallest scratch buffer [`UncompressedPngEncoder::new`] accepts. Only this much of a
/// larger buffer is used.
pub const SCRATCH_LEN_MIN: usize = 0x1_0000;

/// Where the first IDAT chunk's length field sits: after the signature and the IHDR chunk.
const FIRST_IDAT_AT: usize = SIGNATURE.len() + 8 + IHDR_LEN + 4;
/// Stored block data starts after the chunk header, the zlib header (first chunk only) and the
/// 5-byte stored block header.
const FIRST_DATA_AT: usize = FIRST_IDAT_AT + 8 + 2 + 5;
const LATER_DATA_AT: usize = 8 + 5;
/// Leaves room for the Adler-32 and the chunk CRC.
const DATA_END_MAX: usize = SCRATCH_LEN_MIN - 8;

/// zlib with a 32 KiB window, no dictionary, "fastest" level.
const ZLIB_HEADER: [u8; 2] = [0x78, 0x01];

const IMAGE_DIMENSION_MAX_INCL: u32 = 0x00FF_FFFF;

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(context(false), display("{source}"))]
    Base { source: Error },
    WriteIo { source: std::io::Error },
}

/// How one source pixel maps to PNG bytes.
struct Layout {
    color_type: ColorType,
    depth: u8,
    src_bpp: usize,
    /// Source byte offsets, in PNG output order.
    shuffle: &'static [usize],
}

impl Layout {
    fn of(pixfmt: PixelFormat) -> Option<Layout> {
        let (color_type, depth, src_bpp, shuffle): (_, _, _, &'static [usize]) = match pixfmt {
            PixelFormat::Y => (ColorType::Gray, 8, 1, &[0]),
            PixelFormat::Y_16LE => (ColorType::Gray, 16, 2, &[1, 0]),
            PixelFormat::BGRX => (ColorType::Rgb, 8, 4, &[2, 1, 0]),
            PixelFormat::BGRA_NONPREMUL => (ColorType::Rgba, 8, 4, &[2, 1, 0, 3]),
            PixelFormat::BGRX_4X16LE => (ColorType::Rgb, 16, 8, &[5, 4, 3, 2, 1, 0]),
            PixelFormat::BGRA_NONPREMUL_4X16LE => {
                (ColorType::Rgba, 16, 8, &[5, 4, 3, 2, 1, 0, 7, 6])
            }
            _ => return None,
        };
        Some(Layout {
            color_type,
            depth,
            src_bpp,
            shuffle,
        })
    }
}

/// Writes PNG files with stored deflate blocks, staging IDAT chunks in a caller-owned buffer.
///
/// Each IDAT chunk holds one stored block and is at most 64 KiB. Many encoders may run at once as
/// long as each has its own scratch buffer.
#[derive(Debug)]
pub struct UncompressedPngEncoder<'s> {
    buf: &'s mut [u8],
    first_chunk: bool,
    adler: Adler32,
}

impl<'s> UncompressedPngEncoder<'s> {
    pub fn new(scratch: &'s mut [u8]) -> Result<Self, Error> {
        ensure!(
            scratch.len() >= SCRATCH_LEN_MIN,
            error::BadArgumentLengthTooShortSnafu
        );
        Ok(Self {
            buf: &mut scratch[..SCRATCH_LEN_MIN],
            first_chunk: true,
            adler: Adler32::new(),
        })
    }

    /// Encodes a `width` by `height` image whose rows start every `stride` bytes of `pixels`.
    ///
    /// `pixfmt` must be one of `Y`, `Y_16LE`, `BGRX`, `BGRA_NONPREMUL`, `BGRX_4X16LE` or
    /// `BGRA_NONPREMUL_4X16LE`. They become PNG gray, RGB or RGBA at the same depth.
    pub fn encode<W: Write>(
        &mut self,
        mut w: W,
        pixels: &[u8],
        width: u32,
        height: u32,
        stride: usize,
        pixfmt: PixelFormat,
    ) -> Result<(), EncodeError> {
        let layout = validate(pixels, width, height, stride, pixfmt)?;
        tracing::debug!(
            width,
            height,
            color_type = layout.color_type as u8,
            depth = layout.depth,
            "encoding uncompressed PNG"
        );

        self.first_chunk = true;
        self.adler = Adler32::new();
        self.write_header(&layout, width, height);

        let out_bpp = layout.shuffle.len();
        let mut at = FIRST_DATA_AT;
        for y in 0..height as usize {
            if at + 1 > DATA_END_MAX {
                self.flush(&mut w, at, false)?;
                at = LATER_DATA_AT;
            }
            // Filter type: none.
            self.buf[at] = 0;
            at += 1;

            let row = pixels.get(y * stride..).unwrap_or_default();
            for px in row.chunks_exact(layout.src_bpp).take(width as usize) {
                if at + out_bpp > DATA_END_MAX {
                    self.flush(&mut w, at, false)?;
                    at = LATER_DATA_AT;
                }
                for (o, &i) in self.buf[at..at + out_bpp].iter_mut().zip(layout.shuffle) {
                    *o = px[i];
                }
                at += out_bpp;
            }
        }
        self.flush(&mut w, at, true)
    }

    fn write_header(&mut self, layout: &Layout, width: u32, height: u32) {
        let buf = &mut *self.buf;
        buf[..8].copy_from_slice(&SIGNATURE);
        BigEndian::write_u32(&mut buf[8..], IHDR_LEN as u32);
        buf[12..16].copy_from_slice(&IHDR);
        BigEndian::write_u32(&mut buf[16..], width);
        BigEndian::write_u32(&mut buf[20..], height);
        // Depth, color type, then compression, filter and interlace methods (all 0).
        buf[24..29].copy_from_slice(&[layout.depth, layout.color_type as u8, 0, 0, 0]);
        let crc = crc32_ieee(&buf[12..29]);
        BigEndian::write_u32(&mut buf[29..], crc);

        let zlib_at = FIRST_IDAT_AT + 8;
        buf[zlib_at..zlib_at + 2].copy_from_slice(&ZLIB_HEADER);
    }

    /// Finishes the IDAT chunk whose stored block data ends at `end` and writes it out, with
    /// everything before it on the first call.
    fn flush<W: Write>(&mut self, w: &mut W, end: usize, last: bool) -> Result<(), EncodeError> {
        macro_rules! w {
            ($bytes:expr) => {
                w.write_all($bytes).context(WriteIoSnafu)
            };
        }

        let (chunk_at, data_at) = if self.first_chunk {
            (FIRST_IDAT_AT, FIRST_DATA_AT)
        } else {
            (0, LATER_DATA_AT)
        };
        let buf = &mut *self.buf;

        let block_len = (end - data_at) as u16;
        let block_header = &mut buf[data_at - 5..data_at];
        block_header[0] = u8::from(last);
        LittleEndian::write_u16(&mut block_header[1..], block_len);
        LittleEndian::write_u16(&mut block_header[3..], !block_len);

        self.adler.update(&buf[data_at..end]);
        let mut end = end;
        if last {
            BigEndian::write_u32(&mut buf[end..], self.adler.finish());
            end += 4;
        }

        BigEndian::write_u32(&mut buf[chunk_at..], (end - (chunk_at + 8)) as u32);
        buf[chunk_at + 4..chunk_at + 8].copy_from_slice(&IDAT);
        let crc = crc32_ieee(&buf[chunk_at + 4..end]);
        BigEndian::write_u32(&mut buf[end..], crc);
        end += 4;

        tracing::trace!(len = end - (chunk_at + 12), last, "IDAT chunk");
        w!(&buf[..end])?;
        if last {
            w!(&IEND_CHUNK)?;
        }
        self.first_chunk = false;
        Ok(())
    }
}

fn validate(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    pixfmt: PixelFormat,
) -> Result<Layout, Error> {
    let layout = Layout::of(pixfmt).ok_or(Error::BadArgument)?;
    ensure!(
        width <= IMAGE_DIMENSION_MAX_INCL
            && height <= IMAGE_DIMENSION_MAX_INCL
            && (stride as u64) < 0xFFFF_FFFF,
        error::UnsupportedImageSizeSnafu
    );
    if width > 0 && height > 0 {
        let row_len = layout.src_bpp * width as usize;
        ensure!(stride >= row_len, error::BadArgumentSnafu);
        let needed = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_len))
            .ok_or(Error::UnsupportedImageSize)?;
        ensure!(pixels.len() >= needed, error::BadArgumentSnafu);
    }
    Ok(layout)
}
