//! Half-open rectangles and inclusive ranges.

/// A rectangle with inclusive minimum and exclusive maximum coordinates.
///
/// A rectangle is empty if either maximum is at or below its minimum. All empty rectangles are
/// considered equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct RectIeU32 {
    pub min_incl_x: u32,
    pub min_incl_y: u32,
    pub max_excl_x: u32,
    pub max_excl_y: u32,
}

impl RectIeU32 {
    pub const fn new(min_incl_x: u32, min_incl_y: u32, max_excl_x: u32, max_excl_y: u32) -> Self {
        Self {
            min_incl_x,
            min_incl_y,
            max_excl_x,
            max_excl_y,
        }
    }

    /// `[0, width) × [0, height)`.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn is_empty(&self) -> bool {
        self.min_incl_x >= self.max_excl_x || self.min_incl_y >= self.max_excl_y
    }

    pub const fn width(&self) -> u32 {
        self.max_excl_x.saturating_sub(self.min_incl_x)
    }

    pub const fn height(&self) -> u32 {
        self.max_excl_y.saturating_sub(self.min_incl_y)
    }

    pub const fn contains(&self, x: u32, y: u32) -> bool {
        self.min_incl_x <= x && x < self.max_excl_x && self.min_incl_y <= y && y < self.max_excl_y
    }

    /// Whether `other` lies entirely within `self`. An empty `other` is always contained.
    pub const fn contains_rect(&self, other: &RectIeU32) -> bool {
        other.is_empty()
            || (self.min_incl_x <= other.min_incl_x
                && other.max_excl_x <= self.max_excl_x
                && self.min_incl_y <= other.min_incl_y
                && other.max_excl_y <= self.max_excl_y)
    }

    /// The overlap of the two rectangles, possibly empty.
    pub fn intersect(&self, other: &RectIeU32) -> RectIeU32 {
        RectIeU32 {
            min_incl_x: self.min_incl_x.max(other.min_incl_x),
            min_incl_y: self.min_incl_y.max(other.min_incl_y),
            max_excl_x: self.max_excl_x.min(other.max_excl_x),
            max_excl_y: self.max_excl_y.min(other.max_excl_y),
        }
    }

    /// The smallest rectangle containing both. Empty inputs are ignored.
    pub fn unite(&self, other: &RectIeU32) -> RectIeU32 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        RectIeU32 {
            min_incl_x: self.min_incl_x.min(other.min_incl_x),
            min_incl_y: self.min_incl_y.min(other.min_incl_y),
            max_excl_x: self.max_excl_x.max(other.max_excl_x),
            max_excl_y: self.max_excl_y.max(other.max_excl_y),
        }
    }

    pub const fn equals(&self, other: &RectIeU32) -> bool {
        (self.min_incl_x == other.min_incl_x
            && self.min_incl_y == other.min_incl_y
            && self.max_excl_x == other.max_excl_x
            && self.max_excl_y == other.max_excl_y)
            || (self.is_empty() && other.is_empty())
    }
}

impl PartialEq for RectIeU32 {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for RectIeU32 {}

/// An inclusive range `[min_incl, max_incl]`. Empty if `min_incl > max_incl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeIiU64 {
    pub min_incl: u64,
    pub max_incl: u64,
}

impl RangeIiU64 {
    pub const fn new(min_incl: u64, max_incl: u64) -> Self {
        Self { min_incl, max_incl }
    }

    pub const fn is_empty(&self) -> bool {
        self.min_incl > self.max_incl
    }

    pub const fn contains(&self, x: u64) -> bool {
        self.min_incl <= x && x <= self.max_incl
    }

    pub fn intersect(&self, other: &RangeIiU64) -> RangeIiU64 {
        RangeIiU64 {
            min_incl: self.min_incl.max(other.min_incl),
            max_incl: self.max_incl.min(other.max_incl),
        }
    }

    pub fn unite(&self, other: &RangeIiU64) -> RangeIiU64 {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        RangeIiU64 {
            min_incl: self.min_incl.min(other.min_incl),
            max_incl: self.max_incl.max(other.max_incl),
        }
    }
}

impl PartialEq for RangeIiU64 {
    fn eq(&self, other: &Self) -> bool {
        (self.min_incl == other.min_incl && self.max_incl == other.max_incl)
            || (self.is_empty() && other.is_empty())
    }
}

impl Eq for RangeIiU64 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_ops() {
        let a = RectIeU32::new(0, 0, 10, 10);
        let b = RectIeU32::new(5, 8, 20, 9);
        assert_eq!(a.intersect(&b), RectIeU32::new(5, 8, 10, 9));
        assert_eq!(a.unite(&b), RectIeU32::new(0, 0, 20, 10));
        assert!(a.contains(9, 9));
        assert!(!a.contains(10, 9));
        assert!(!a.contains_rect(&b));
        assert!(a.contains_rect(&RectIeU32::new(50, 50, 50, 60)));
    }

    #[test]
    fn empty_rects_are_equal() {
        let e1 = RectIeU32::new(3, 3, 3, 100);
        let e2 = RectIeU32::new(0, 7, 9, 2);
        assert!(e1.is_empty() && e2.is_empty());
        assert_eq!(e1, e2);
        assert_eq!(e1.width(), 0);
        assert_eq!(e2.height(), 0);
        assert_eq!(e1.unite(&RectIeU32::from_size(2, 2)), RectIeU32::from_size(2, 2));
    }

    #[test]
    fn range_ops() {
        let r = RangeIiU64::new(10, 20);
        assert!(r.contains(10) && r.contains(20) && !r.contains(21));
        assert!(r.intersect(&RangeIiU64::new(21, 30)).is_empty());
        assert_eq!(r.unite(&RangeIiU64::new(5, 12)), RangeIiU64::new(5, 20));
    }
}
