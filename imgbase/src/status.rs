use snafu::Snafu;

/// Declares [`Error`] with one message per variant, shared by `Display` and
/// [`Error::message`].
macro_rules! errors {
    ($($variant:ident => $message:tt,)*) => {
        /// Hard failures. Retrying the same call with the same inputs will fail again.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Snafu)]
        #[snafu(module, visibility(pub))]
        pub enum Error {
            $(
                #[snafu(display($message))]
                $variant,
            )*
        }

        impl Error {
            pub const fn message(self) -> &'static str {
                match self {
                    $(Error::$variant => $message,)*
                }
            }
        }
    };
}

errors! {
    BadArgument => "#base: bad argument",
    BadArgumentLengthTooShort => "#base: bad argument (length too short)",
    BadIoPosition => "#base: bad I/O position",
    BadCallSequence => "#base: bad call sequence",
    OutOfBounds => "#base: out of bounds",
    UnsupportedOption => "#base: unsupported option",
    UnsupportedPixelSwizzlerOption => "#base: unsupported pixel swizzler option",
    UnsupportedImageSize => "#base: unsupported image size",
    TruncatedInput => "#base: truncated input",

    BadHeader => "#uncompng: bad header",
    BadChunk => "#uncompng: bad chunk",
    BadChecksum => "#uncompng: bad checksum",
    BadZlibStream => "#uncompng: bad zlib stream",
    UnsupportedPngFeature => "#uncompng: unsupported PNG feature",

    NoProgress => "#base: internal error: no I/O progress",
    InconsistentState => "#base: internal error: inconsistent state",
}

impl Error {
    /// Whether this error means one of our own invariants broke, as opposed to the input or the
    /// caller's arguments being bad.
    pub const fn is_internal(self) -> bool {
        matches!(self, Error::NoProgress | Error::InconsistentState)
    }
}

/// "Call again once there is more to work with."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suspension {
    /// The source ran dry. Append more bytes, or close the source if there are none.
    ShortRead,
    /// The destination is full. Drain or grow it.
    ShortWrite,
}

impl Suspension {
    pub const fn message(self) -> &'static str {
        match self {
            Suspension::ShortRead => "$base: short read",
            Suspension::ShortWrite => "$base: short write",
        }
    }
}

/// Informational outcomes that are neither errors nor suspensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    /// There are no more frames (or tokens, or whatever unit the call produces).
    EndOfData,
    /// The input turned out to be in a different format. The caller should reposition and
    /// dispatch to another decoder.
    IoRedirect,
}

impl Note {
    pub const fn message(self) -> &'static str {
        match self {
            Note::EndOfData => "@base: end of data",
            Note::IoRedirect => "@base: I/O redirect",
        }
    }
}

/// The result of every resumable call.
///
/// Unlike a plain `Result`, a `Status` has two non-error, non-final outcomes. Use
/// [`Status::into_result`] to funnel errors into `?` while keeping the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Ok,
    Suspension(Suspension),
    Note(Note),
    Error(Error),
}

impl Status {
    pub const SHORT_READ: Status = Status::Suspension(Suspension::ShortRead);
    pub const SHORT_WRITE: Status = Status::Suspension(Suspension::ShortWrite);
    pub const END_OF_DATA: Status = Status::Note(Note::EndOfData);

    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Ok or a note: the call finished and need not be retried.
    #[inline]
    pub const fn is_complete(self) -> bool {
        matches!(self, Status::Ok | Status::Note(_))
    }

    #[inline]
    pub const fn is_suspension(self) -> bool {
        matches!(self, Status::Suspension(_))
    }

    #[inline]
    pub const fn is_note(self) -> bool {
        matches!(self, Status::Note(_))
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        matches!(self, Status::Error(_))
    }

    /// The status message, empty for [`Status::Ok`].
    pub const fn message(self) -> &'static str {
        match self {
            Status::Ok => "",
            Status::Suspension(s) => s.message(),
            Status::Note(n) => n.message(),
            Status::Error(e) => e.message(),
        }
    }

    pub fn into_result(self) -> Result<Status, Error> {
        match self {
            Status::Error(e) => Err(e),
            other => Ok(other),
        }
    }
}

impl From<Error> for Status {
    fn from(e: Error) -> Self {
        Status::Error(e)
    }
}

impl From<Suspension> for Status {
    fn from(s: Suspension) -> Self {
        Status::Suspension(s)
    }
}

impl From<Note> for Status {
    fn from(n: Note) -> Self {
        Status::Note(n)
    }
}

impl From<Result<(), Error>> for Status {
    fn from(r: Result<(), Error>) -> Self {
        match r {
            Ok(()) => Status::Ok,
            Err(e) => Status::Error(e),
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            other => f.write_str(other.message()),
        }
    }
}
