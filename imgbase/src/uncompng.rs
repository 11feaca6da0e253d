//! A PNG codec without compression.
//!
//! The encoder writes valid PNG files whose zlib stream is made of stored (uncompressed) deflate
//! blocks, so it needs neither a compressor nor any allocation. The decoder reads back exactly
//! that subset of PNG: 8 or 16 bits per channel, no palette, no interlacing, filter type 0 on
//! every row, and stored deflate blocks only. Both sides still verify or emit every CRC-32 and the
//! zlib Adler-32.
//!
//! ```
//! # #[cfg(feature = "std")] {
//! use imgbase::pixel::{PixelBlend, PixelBuffer, PixelFormat, ImageConfig};
//! use imgbase::uncompng::{UncompressedPngDecoder, UncompressedPngEncoder, SCRATCH_LEN_MIN};
//! use imgbase::{IoBuffer, Status};
//!
//! let gray = [0x00, 0x40, 0x80, 0xC0, 0xFF, 0x10];
//! let mut scratch = vec![0; SCRATCH_LEN_MIN];
//! let mut png = Vec::new();
//! UncompressedPngEncoder::new(&mut scratch)?
//!     .encode(&mut png, &gray, 3, 2, 3, PixelFormat::Y)?;
//!
//! let mut dec = UncompressedPngDecoder::new();
//! let mut src = IoBuffer::reader(&png[..], true);
//! let mut cfg = ImageConfig::new();
//! assert_eq!(dec.decode_image_config(&mut cfg, &mut src), Status::Ok);
//! assert_eq!((cfg.pixcfg.width(), cfg.pixcfg.height()), (3, 2));
//!
//! let mut out = [0; 6];
//! let mut pixcfg = cfg.pixcfg;
//! pixcfg.set(PixelFormat::Y, pixcfg.pixel_subsampling(), 3, 2);
//! let mut dst = PixelBuffer::from_slice(&pixcfg, &mut out)?;
//! assert_eq!(dec.decode_frame(&mut dst, &mut src, PixelBlend::Src), Status::Ok);
//! assert_eq!(out, gray);
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decode;
#[cfg(feature = "std")]
mod encode;

pub use decode::{Quirk, UncompressedPngDecoder};
#[cfg(feature = "std")]
pub use encode::{EncodeError, UncompressedPngEncoder, SCRATCH_LEN_MIN};

use crate::pixel::PixelFormat;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A whole IEND chunk: zero length, type, and the CRC of the type.
const IEND_CHUNK: [u8; 12] = [
    0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
];

const IHDR: [u8; 4] = *b"IHDR";
const IDAT: [u8; 4] = *b"IDAT";
const IEND: [u8; 4] = *b"IEND";
const PLTE: [u8; 4] = *b"PLTE";

const IHDR_LEN: usize = 13;

/// PNG chunk lengths are at most 2^31 - 1.
const CHUNK_LEN_MAX_INCL: u32 = 0x7FFF_FFFF;

/// The PNG color types this codec handles.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorType {
    Gray = 0,
    Rgb = 2,
    GrayAlpha = 4,
    Rgba = 6,
}

impl ColorType {
    fn channels(self) -> usize {
        match self {
            ColorType::Gray => 1,
            ColorType::GrayAlpha => 2,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }

    fn is_opaque(self) -> bool {
        matches!(self, ColorType::Gray | ColorType::Rgb)
    }

    /// The pixel format whose memory layout is exactly PNG's for this color type and depth.
    fn pixel_format(self, depth: u8) -> PixelFormat {
        match (self, depth == 16) {
            (ColorType::Gray, false) => PixelFormat::Y,
            (ColorType::Gray, true) => PixelFormat::Y_16BE,
            (ColorType::GrayAlpha, false) => PixelFormat::YA_NONPREMUL,
            (ColorType::GrayAlpha, true) => PixelFormat::YA_NONPREMUL_2X16BE,
            (ColorType::Rgb, false) => PixelFormat::RGB,
            (ColorType::Rgb, true) => PixelFormat::RGB_3X16BE,
            (ColorType::Rgba, false) => PixelFormat::RGBA_NONPREMUL,
            (ColorType::Rgba, true) => PixelFormat::RGBA_NONPREMUL_4X16BE,
        }
    }
}

/// Whether a chunk type's first letter is lowercase, i.e. decoders may skip it.
fn is_ancillary(kind: [u8; 4]) -> bool {
    kind[0] & 0x20 != 0
}
