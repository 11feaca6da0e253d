use super::{
    format::{PixelFormat, PixelSubsampling},
    PALETTE_LEN,
};
use crate::range::{RangeIiU64, RectIeU32};

/// Signed time in units of 1/705,600,000 s, which divides evenly by common frame rates.
pub type Flicks = i64;

pub const FLICKS_PER_SECOND: Flicks = 705_600_000;
pub const FLICKS_PER_MILLISECOND: Flicks = 705_600;

/// Dimensions and layout of a pixel grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelConfig {
    pixfmt: PixelFormat,
    pixsub: PixelSubsampling,
    width: u32,
    height: u32,
}

impl PixelConfig {
    pub const fn new() -> Self {
        Self {
            pixfmt: PixelFormat::INVALID,
            pixsub: PixelSubsampling::NONE,
            width: 0,
            height: 0,
        }
    }

    /// Sets every field, or zeroes every field if the format is invalid or `width * height`
    /// overflows `usize`.
    pub fn set(&mut self, pixfmt: PixelFormat, pixsub: PixelSubsampling, width: u32, height: u32) {
        let fits = (width as usize).checked_mul(height as usize).is_some();
        if !pixfmt.is_valid() || !fits {
            *self = Self::new();
            return;
        }
        *self = Self {
            pixfmt,
            pixsub,
            width,
            height,
        };
    }

    /// Constructs a config via [`set`](Self::set).
    pub fn from_parts(
        pixfmt: PixelFormat,
        pixsub: PixelSubsampling,
        width: u32,
        height: u32,
    ) -> Self {
        let mut c = Self::new();
        c.set(pixfmt, pixsub, width, height);
        c
    }

    pub fn invalidate(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.pixfmt.is_valid()
    }

    #[inline]
    pub const fn pixel_format(&self) -> PixelFormat {
        self.pixfmt
    }

    #[inline]
    pub const fn pixel_subsampling(&self) -> PixelSubsampling {
        self.pixsub
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `[0, width) × [0, height)`.
    #[inline]
    pub const fn bounds(&self) -> RectIeU32 {
        RectIeU32::from_size(self.width, self.height)
    }

    /// Bytes needed to hold this config's pixels in one contiguous slice, including the palette
    /// for indexed formats. 0 for sub-byte formats or on overflow.
    pub fn pixbuf_len(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        let (w, h) = (u64::from(self.width), u64::from(self.height));

        if self.pixfmt.is_planar() {
            let mut total = 0u64;
            for p in 0..self.pixfmt.num_planes() {
                let bits = self.pixfmt.channel_depth(p);
                if bits % 8 != 0 {
                    return 0;
                }
                let pw = u64::from(self.pixsub.plane_width(p, self.width));
                let ph = u64::from(self.pixsub.plane_height(p, self.height));
                let Some(n) = pw
                    .checked_mul(ph)
                    .and_then(|n| n.checked_mul(u64::from(bits / 8)))
                    .and_then(|n| total.checked_add(n))
                else {
                    return 0;
                };
                total = n;
            }
            return total;
        }

        let bpp = u64::from(self.pixfmt.bytes_per_pixel());
        if bpp == 0 {
            return 0;
        }
        let Some(n) = w.checked_mul(h).and_then(|n| n.checked_mul(bpp)) else {
            return 0;
        };
        if self.pixfmt.is_indexed() {
            n.checked_add(PALETTE_LEN as u64).unwrap_or(0)
        } else {
            n
        }
    }
}

/// Static properties of a possibly animated image, decoded once from its header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImageConfig {
    pub pixcfg: PixelConfig,
    work_buffer_size: RangeIiU64,
    first_frame_io_position: u64,
    num_loops: u32,
    first_frame_is_opaque: bool,
}

impl ImageConfig {
    pub const fn new() -> Self {
        Self {
            pixcfg: PixelConfig::new(),
            work_buffer_size: RangeIiU64::new(0, 0),
            first_frame_io_position: 0,
            num_loops: 0,
            first_frame_is_opaque: false,
        }
    }

    pub fn set(
        &mut self,
        pixfmt: PixelFormat,
        pixsub: PixelSubsampling,
        width: u32,
        height: u32,
        first_frame_io_position: u64,
        first_frame_is_opaque: bool,
    ) {
        self.pixcfg.set(pixfmt, pixsub, width, height);
        if !self.pixcfg.is_valid() {
            *self = Self::new();
            return;
        }
        self.first_frame_io_position = first_frame_io_position;
        self.first_frame_is_opaque = first_frame_is_opaque;
    }

    pub fn invalidate(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.pixcfg.is_valid()
    }

    #[inline]
    pub const fn first_frame_io_position(&self) -> u64 {
        self.first_frame_io_position
    }

    #[inline]
    pub const fn first_frame_is_opaque(&self) -> bool {
        self.first_frame_is_opaque
    }

    /// How many times an animation should loop. 0 means forever.
    #[inline]
    pub const fn num_loops(&self) -> u32 {
        self.num_loops
    }

    pub fn set_num_loops(&mut self, num_loops: u32) {
        self.num_loops = num_loops;
    }

    /// Scratch memory the decoder wants: at least `min_incl` bytes, at most `max_incl` useful.
    #[inline]
    pub const fn work_buffer_size(&self) -> RangeIiU64 {
        self.work_buffer_size
    }

    pub fn set_work_buffer_size(&mut self, size: RangeIiU64) {
        self.work_buffer_size = size;
    }
}

/// How a frame's pixels combine with what is already in the destination.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationBlend {
    #[default]
    SrcOverDst = 0,
    Src = 1,
    /// Like `Src`, with the extra promise that every pixel in the frame is opaque.
    Opaque = 2,
}

/// What happens to a frame's area before the next frame is drawn.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationDisposal {
    #[default]
    None = 0,
    RestoreBackground = 1,
    RestorePrevious = 2,
}

/// Per-frame metadata, overwritten in place by the decoder before each frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    bounds: RectIeU32,
    duration: Flicks,
    index: u64,
    io_position: u64,
    blend: AnimationBlend,
    disposal: AnimationDisposal,
    background_color: u32,
}

impl FrameConfig {
    pub const fn new() -> Self {
        Self {
            bounds: RectIeU32::new(0, 0, 0, 0),
            duration: 0,
            index: 0,
            io_position: 0,
            blend: AnimationBlend::SrcOverDst,
            disposal: AnimationDisposal::None,
            background_color: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        bounds: RectIeU32,
        duration: Flicks,
        index: u64,
        io_position: u64,
        blend: AnimationBlend,
        disposal: AnimationDisposal,
        background_color: u32,
    ) {
        *self = Self {
            bounds,
            duration,
            index,
            io_position,
            blend,
            disposal,
            background_color,
        };
    }

    #[inline]
    pub const fn bounds(&self) -> RectIeU32 {
        self.bounds
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.bounds.width()
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        self.bounds.height()
    }

    /// How long to show this frame. 0 for still images.
    #[inline]
    pub const fn duration(&self) -> Flicks {
        self.duration
    }

    /// 0-based frame number.
    #[inline]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// Where the frame's data starts in the source stream.
    #[inline]
    pub const fn io_position(&self) -> u64 {
        self.io_position
    }

    #[inline]
    pub const fn blend(&self) -> AnimationBlend {
        self.blend
    }

    #[inline]
    pub const fn disposal(&self) -> AnimationDisposal {
        self.disposal
    }

    /// Premultiplied ARGB.
    #[inline]
    pub const fn background_color(&self) -> u32 {
        self.background_color
    }
}
