//! Shared runtime substrate for streaming image codecs.
//!
//! `imgbase` is the part of an image codec library that every individual format decoder leans on,
//! but that isn't specific to any one format:
//!
//! - A resumable I/O model ([`io::IoBuffer`] and [`Status`]): decoders are fed partial input and
//!   partial output buffers, and may stop at any byte boundary, reporting a
//!   [suspension](Suspension) instead of blocking or failing. All state needed to resume lives in
//!   the decoder value, never on the call stack.
//! - A pixel model ([`pixel`]): bit-packed pixel format descriptors, image/frame configuration,
//!   pixel buffers that borrow caller memory, and the [swizzler](pixel::swizzle::PixelSwizzler)
//!   that converts and composites scanlines between formats.
//! - Exact numeric string conversion ([`floatconv`], [`intconv`]): correctly rounded decimal to
//!   `f64` parsing (Eisel-Lemire fast path with a high-precision-decimal fallback) and shortest
//!   round-tripping `f64` rendering.
//!
//! A small uncompressed PNG codec ([`uncompng`]) exercises all three end to end.
//!
//! # Memory
//!
//! Nothing in this crate allocates. Every buffer (I/O data, pixel memory, palettes, encoder
//! scratch space) is passed in by the caller as a slice, so the crate works in `no_std`
//! environments with the `std` feature disabled.
//!
//! # Statuses
//!
//! Status messages follow a fixed convention: a leading `#` marks an error, `$` a suspension, and
//! `@` a note, followed by the package name:
//!
//! ```
//! use imgbase::{Error, Status, Suspension};
//!
//! assert_eq!(Status::Suspension(Suspension::ShortRead).message(), "$base: short read");
//! assert_eq!(Error::BadArgument.to_string(), "#base: bad argument");
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod checksum;
pub mod floatconv;
pub mod intconv;
pub mod io;
pub mod pixel;
pub mod range;
pub mod status;
pub mod table;
pub mod uncompng;
pub mod utils;

pub use io::{IoBuffer, IoBufferMeta};
pub use status::{Error, Note, Status, Suspension};

/// Option bits accepted by [`floatconv::parse_number_f64`] and the integer parsers in
/// [`intconv`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseNumberOptions(pub u32);

impl ParseNumberOptions {
    pub const DEFAULT: Self = Self(0);

    /// Accept `"007"` as well as `"7"`. Without this, a leading `0` may only be followed by a
    /// separator, an exponent, or (for integers) a base prefix.
    pub const ALLOW_MULTIPLE_LEADING_ZEROES: Self = Self(0x0000_0001);

    /// Accept and ignore `_` anywhere in the digits, e.g. `"1_000_000"`.
    pub const ALLOW_UNDERSCORES: Self = Self(0x0000_0002);

    /// Use `,` instead of `.` as the decimal separator.
    pub const DECIMAL_SEPARATOR_IS_A_COMMA: Self = Self(0x0000_0010);

    /// Reject `"inf"`, `"infinity"`, `"nan"`, and out-of-range values that would round to
    /// infinity.
    pub const REJECT_INF_AND_NAN: Self = Self(0x0000_0020);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for ParseNumberOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Option bits accepted by [`floatconv::render_number_f64`] and the integer renderers in
/// [`intconv`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderNumberOptions(pub u32);

impl RenderNumberOptions {
    pub const DEFAULT: Self = Self(0);

    /// Write the output at the end of the destination slice instead of the start.
    pub const ALIGN_RIGHT: Self = Self(0x0000_0100);

    /// Emit a `+` for non-negative values.
    pub const LEADING_PLUS_SIGN: Self = Self(0x0000_0200);

    /// Use `,` instead of `.` as the decimal separator.
    pub const DECIMAL_SEPARATOR_IS_A_COMMA: Self = Self(0x0000_1000);

    /// Force `%f` style output.
    pub const EXPONENT_ABSENT: Self = Self(0x0000_2000);

    /// Force `%e` style output. If neither this nor [`Self::EXPONENT_ABSENT`] is set, the style
    /// is picked like `%g`.
    pub const EXPONENT_PRESENT: Self = Self(0x0000_4000);

    /// Ignore the precision argument and emit the fewest digits that still parse back to the
    /// same `f64`.
    pub const JUST_ENOUGH_PRECISION: Self = Self(0x0000_8000);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for RenderNumberOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
