//! The pixel model: formats, configurations, buffers and conversion.

pub mod buffer;
pub mod codec;
pub mod color;
pub mod config;
pub mod format;
pub mod swizzle;

pub use buffer::PixelBuffer;
pub use config::{AnimationBlend, AnimationDisposal, FrameConfig, ImageConfig, PixelConfig};
pub use format::{ColorModel, PixelFormat, PixelSubsampling, Transparency};
pub use swizzle::{PixelBlend, PixelSwizzler};

/// Palettes are always 256 entries of 4 bytes each.
pub const PALETTE_LEN: usize = 1024;

/// Bytes per palette entry. Entries are BGRA, in the transparency class of the indexed format.
pub const PALETTE_ENTRY_LEN: usize = 4;
