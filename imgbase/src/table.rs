//! Two-dimensional strided views over byte slices.

use crate::status::{error, Error};
use snafu::ensure;

/// A `width` by `height` grid of bytes, where row `y` starts at byte `y * stride`.
///
/// The last row only needs `width` bytes, not `stride`, so a table can be cut out of the middle of
/// a larger one without borrowing past its bottom-right corner.
#[derive(Debug, Default)]
pub struct Table<'a> {
    data: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> Table<'a> {
    pub fn empty() -> Table<'a> {
        Table {
            data: &mut [],
            width: 0,
            height: 0,
            stride: 0,
        }
    }

    /// Wraps `data`, checking that `stride >= width` and that `data` holds every row.
    pub fn new(
        data: &'a mut [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Table<'a>, Error> {
        ensure!(stride >= width, error::BadArgumentSnafu);
        let needed = Self::flattened_length_for(width, height, stride).ok_or(Error::BadArgument)?;
        ensure!(data.len() >= needed, error::BadArgumentLengthTooShortSnafu);

        Ok(Table {
            data: &mut data[..needed],
            width,
            height,
            stride,
        })
    }

    /// Bytes spanned by a table of these dimensions, or `None` on overflow.
    pub fn flattened_length_for(width: usize, height: usize, stride: usize) -> Option<usize> {
        if width == 0 || height == 0 {
            return Some(0);
        }
        stride.checked_mul(height - 1)?.checked_add(width)
    }

    pub fn flattened_length(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row `y`, exactly `width` bytes long. Empty if `y` is out of bounds.
    pub fn row(&self, y: usize) -> &[u8] {
        if y >= self.height || self.width == 0 {
            return &[];
        }
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        if y >= self.height || self.width == 0 {
            return &mut [];
        }
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Every row, as `width`-byte slices.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> + '_ {
        let (width, height, stride) = (self.width, self.height, self.stride);
        let chunk = stride.max(1);
        self.data
            .chunks_mut(chunk)
            .take(if width == 0 { 0 } else { height })
            .map(move |row| &mut row[..width])
    }

    /// A reborrowed view of `[x0, x1) × [y0, y1)`, in bytes and rows.
    pub fn subtable(
        &mut self,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
    ) -> Result<Table<'_>, Error> {
        ensure!(
            x0 <= x1 && x1 <= self.width && y0 <= y1 && y1 <= self.height,
            error::OutOfBoundsSnafu
        );
        let (w, h) = (x1 - x0, y1 - y0);
        if w == 0 || h == 0 {
            return Ok(Table::empty());
        }
        let start = y0 * self.stride + x0;
        Table::new(&mut self.data[start..], w, h, self.stride)
    }

    /// Consumes the table, returning the underlying bytes.
    pub fn into_inner(self) -> &'a mut [u8] {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_and_subtables() {
        let mut data: Vec<u8> = (0..20).collect();
        let mut t = Table::new(&mut data, 3, 4, 5).unwrap();
        assert_eq!(t.flattened_length(), 18);
        assert_eq!(t.row(2), &[10, 11, 12]);
        assert_eq!(t.row(4), &[] as &[u8]);

        let mut sub = t.subtable(1, 1, 3, 3).unwrap();
        assert_eq!(sub.row(0), &[6, 7]);
        sub.row_mut(1)[1] = 99;
        assert_eq!(t.row(2), &[10, 11, 99]);

        let rows: Vec<Vec<u8>> = t.rows_mut().map(|r| r.to_vec()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec![15, 16, 17]);
    }

    #[test]
    fn validation() {
        let mut data = [0u8; 10];
        assert_eq!(
            Table::new(&mut data, 4, 1, 3).unwrap_err(),
            Error::BadArgument
        );
        assert_eq!(
            Table::new(&mut data, 4, 3, 4).unwrap_err(),
            Error::BadArgumentLengthTooShort
        );
        let mut t = Table::new(&mut data, 4, 2, 6).unwrap();
        assert_eq!(t.subtable(0, 0, 5, 1).unwrap_err(), Error::OutOfBounds);
        assert!(t.subtable(2, 1, 2, 2).unwrap().is_empty());
    }
}
