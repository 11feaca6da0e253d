//! Resumable I/O buffers.
//!
//! An [`IoBuffer`] is a byte slice with two cursors: bytes in `[ri, wi)` have been written but
//! not yet read, bytes in `[wi, len)` are free space. A decoder reads from one buffer and writes
//! to another (or to a [pixel buffer](crate::pixel::buffer::PixelBuffer)), and when it runs out
//! of either it returns a [suspension](crate::Suspension) so the caller can refill or drain before
//! calling again.
//!
//! The `closed` flag is what separates "no more bytes right now" from "no more bytes ever". A
//! decoder that runs dry on a closed source must report an error, not a short read.

use crate::status::{error, Error, Status, Suspension};
use byteorder::ByteOrder;
use snafu::ensure;

/// The cursors and flags of an [`IoBuffer`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoBufferMeta {
    /// Write index: end of the readable bytes.
    pub wi: usize,
    /// Read index: start of the readable bytes.
    pub ri: usize,
    /// Stream position of `data[0]`.
    pub pos: u64,
    /// Whether no more bytes will ever be appended.
    pub closed: bool,
}

#[derive(Debug, Default, Clone)]
pub struct IoBuffer<T> {
    data: T,
    meta: IoBufferMeta,
}

impl<T: AsRef<[u8]>> IoBuffer<T> {
    /// A buffer whose every byte is readable.
    pub fn reader(data: T, closed: bool) -> Self {
        let wi = data.as_ref().len();
        Self {
            data,
            meta: IoBufferMeta {
                wi,
                ri: 0,
                pos: 0,
                closed,
            },
        }
    }

    /// Checks `ri <= wi <= data.len()`.
    pub fn from_parts(data: T, meta: IoBufferMeta) -> Result<Self, Error> {
        ensure!(
            meta.ri <= meta.wi && meta.wi <= data.as_ref().len(),
            error::BadArgumentSnafu
        );
        ensure!(
            meta.pos.checked_add(meta.wi as u64).is_some(),
            error::BadIoPositionSnafu
        );
        Ok(Self { data, meta })
    }

    #[inline]
    pub fn meta(&self) -> IoBufferMeta {
        self.meta
    }

    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_inner(self) -> (T, IoBufferMeta) {
        (self.data, self.meta)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.as_ref().len()
    }

    /// Marks the stream as finished. Cannot be undone.
    #[inline]
    pub fn close(&mut self) {
        self.meta.closed = true;
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.meta.closed
    }

    /// Number of unread bytes.
    #[inline]
    pub fn reader_length(&self) -> usize {
        self.meta.wi - self.meta.ri
    }

    /// The unread bytes.
    #[inline]
    pub fn reader_slice(&self) -> &[u8] {
        &self.data.as_ref()[self.meta.ri..self.meta.wi]
    }

    /// Stream position of the next unread byte.
    #[inline]
    pub fn reader_position(&self) -> u64 {
        self.meta.pos + self.meta.ri as u64
    }

    /// Stream position one past the last written byte.
    #[inline]
    pub fn writer_position(&self) -> u64 {
        self.meta.pos + self.meta.wi as u64
    }

    /// Whether the reader is drained and nothing more will come.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.meta.closed && self.meta.ri == self.meta.wi
    }

    /// Marks up to `n` unread bytes as read, returning how many were.
    #[inline]
    pub fn skip(&mut self, n: usize) -> usize {
        let n = n.min(self.reader_length());
        self.meta.ri += n;
        n
    }

    /// Like [`skip`](Self::skip), for callers that have already checked the length.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.reader_length());
        self.skip(n);
    }

    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.reader_slice().first().copied()
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let b = self.peek_u8()?;
        self.meta.ri += 1;
        Some(b)
    }

    pub fn peek_u16<E: ByteOrder>(&self) -> Option<u16> {
        self.reader_slice().get(..2).map(E::read_u16)
    }

    pub fn peek_u32<E: ByteOrder>(&self) -> Option<u32> {
        self.reader_slice().get(..4).map(E::read_u32)
    }

    pub fn peek_u64<E: ByteOrder>(&self) -> Option<u64> {
        self.reader_slice().get(..8).map(E::read_u64)
    }

    pub fn read_u16<E: ByteOrder>(&mut self) -> Option<u16> {
        let v = self.peek_u16::<E>()?;
        self.meta.ri += 2;
        Some(v)
    }

    pub fn read_u32<E: ByteOrder>(&mut self) -> Option<u32> {
        let v = self.peek_u32::<E>()?;
        self.meta.ri += 4;
        Some(v)
    }

    /// Copies as many unread bytes as fit into `dst`, returning the count.
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.reader_length());
        dst[..n].copy_from_slice(&self.reader_slice()[..n]);
        self.meta.ri += n;
        n
    }

    /// The suspension or error to return when a read of more bytes than are available is needed.
    #[inline]
    pub fn short_read_status(&self) -> Status {
        if self.meta.closed {
            Status::Error(Error::TruncatedInput)
        } else {
            Status::Suspension(Suspension::ShortRead)
        }
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IoBuffer<T> {
    /// An empty buffer ready to be written to.
    pub fn writer(data: T) -> Self {
        Self {
            data,
            meta: IoBufferMeta::default(),
        }
    }

    /// Number of free bytes after the write index.
    #[inline]
    pub fn writer_length(&self) -> usize {
        self.data.as_ref().len() - self.meta.wi
    }

    /// The free space. Call [`commit`](Self::commit) after filling some of it.
    #[inline]
    pub fn writer_slice_mut(&mut self) -> &mut [u8] {
        let wi = self.meta.wi;
        &mut self.data.as_mut()[wi..]
    }

    /// Marks up to `n` free bytes as written, returning how many were.
    #[inline]
    pub fn commit(&mut self, n: usize) -> usize {
        let n = n.min(self.writer_length());
        self.meta.wi += n;
        n
    }

    /// Copies as much of `src` as fits, returning the count.
    pub fn append(&mut self, src: &[u8]) -> usize {
        let dst = self.writer_slice_mut();
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        self.meta.wi += n;
        n
    }

    /// Moves the unread bytes to the front of the buffer, making room at the end.
    pub fn compact(&mut self) {
        self.compact_retaining(0)
    }

    /// Like [`compact`](Self::compact), but keeps up to `history` already-read bytes in front of
    /// the read index, for decoders that look back.
    pub fn compact_retaining(&mut self, history: usize) {
        let keep_from = self.meta.ri.saturating_sub(history);
        if keep_from == 0 {
            return;
        }
        let wi = self.meta.wi;
        self.data.as_mut().copy_within(keep_from..wi, 0);
        self.meta.wi -= keep_from;
        self.meta.ri -= keep_from;
        self.meta.pos += keep_from as u64;
    }
}

/// Watches the statuses a resumable call returns and flags a caller loop that would spin.
///
/// A conforming decoder advances its reader or its writer before every suspension. Two
/// suspensions of the same kind at the same positions mean it didn't, and retrying again would
/// loop forever.
#[derive(Debug, Default, Clone)]
pub struct ProgressMonitor {
    last: Option<(Suspension, u64, u64)>,
}

impl ProgressMonitor {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Records one call's outcome. `reader_position` and `writer_position` are the stream
    /// positions after the call.
    pub fn observe(
        &mut self,
        status: Status,
        reader_position: u64,
        writer_position: u64,
    ) -> Result<(), Error> {
        let Status::Suspension(s) = status else {
            self.last = None;
            return Ok(());
        };

        let current = (s, reader_position, writer_position);
        if self.last == Some(current) {
            tracing::warn!(
                status = s.message(),
                reader_position,
                writer_position,
                "suspended twice without making progress"
            );
            return error::NoProgressSnafu.fail();
        }
        self.last = Some(current);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn reader_cursors() {
        let mut r = IoBuffer::reader(&[1u8, 2, 3, 4, 5, 6][..], false);
        assert_eq!(r.reader_length(), 6);
        assert_eq!(r.read_u8(), Some(1));
        assert_eq!(r.peek_u16::<LittleEndian>(), Some(0x0302));
        assert_eq!(r.read_u32::<BigEndian>(), Some(0x0203_0405));
        assert_eq!(r.reader_position(), 5);
        assert_eq!(r.read_u16::<BigEndian>(), None);
        assert_eq!(r.skip(10), 1);
        assert_eq!(r.reader_length(), 0);
        assert_eq!(r.short_read_status(), Status::SHORT_READ);
        r.close();
        assert!(r.is_exhausted());
        assert_eq!(r.short_read_status(), Status::Error(Error::TruncatedInput));
    }

    #[test]
    fn from_parts_validates() {
        let data = [0u8; 4];
        let bad = IoBufferMeta {
            wi: 2,
            ri: 3,
            ..Default::default()
        };
        assert_eq!(
            IoBuffer::from_parts(&data[..], bad).unwrap_err(),
            Error::BadArgument
        );
        let too_far = IoBufferMeta {
            wi: 5,
            ..Default::default()
        };
        assert!(IoBuffer::from_parts(&data[..], too_far).is_err());
    }

    #[test]
    fn writer_append_and_compact() {
        let mut w = IoBuffer::writer([0u8; 8]);
        assert_eq!(w.append(b"abcdef"), 6);
        assert_eq!(w.append(b"ghij"), 2);
        assert_eq!(w.writer_length(), 0);

        assert_eq!(w.skip(5), 5);
        w.compact_retaining(2);
        assert_eq!(w.meta().ri, 2);
        assert_eq!(w.meta().pos, 3);
        assert_eq!(w.reader_slice(), b"fgh");
        assert_eq!(w.reader_position(), 5);

        w.compact();
        assert_eq!(w.meta().ri, 0);
        assert_eq!(w.reader_position(), 5);
        assert_eq!(w.writer_length(), 5);
        w.writer_slice_mut()[0] = b'z';
        assert_eq!(w.commit(1), 1);
        assert_eq!(w.reader_slice(), b"fghz");
    }

    #[test]
    fn progress_monitor_flags_spinning() {
        let mut m = ProgressMonitor::new();
        m.observe(Status::SHORT_READ, 10, 0).unwrap();
        m.observe(Status::SHORT_READ, 11, 0).unwrap();
        m.observe(Status::SHORT_WRITE, 11, 0).unwrap();
        m.observe(Status::SHORT_READ, 11, 0).unwrap();
        assert_eq!(m.observe(Status::SHORT_READ, 11, 0), Err(Error::NoProgress));

        m.observe(Status::Ok, 11, 0).unwrap();
        m.observe(Status::SHORT_READ, 11, 0).unwrap();
    }
}
