//! Row segmentation: splitting one block's byte range across display rows
//!
//! The address space is drawn as a grid `row_bytes` wide. A block starting at
//! offset `start` (relative to the layout base) covers `[start, start + size)`
//! and is cut into one [`RowSegment`] per row it touches:
//!
//! ```text
//!            row_bytes
//!        |<------------>|
//! row 3  |        ######|   (3, 8, 6)
//! row 4  |##############|   (4, 0, 14)
//! row 5  |####          |   (5, 0, 4)
//! ```
//!
//! Segments are emitted for every row the block touches, including rows past
//! the layout's `row_count`; clipping is the caller's job.

/// The part of one block visible in one display row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSegment {
    pub row: u64,
    /// Byte offset of the segment within its row
    pub column: u64,
    pub length: u64,
}

impl RowSegment {
    /// Column one past the segment's last byte
    pub fn column_end(&self) -> u64 {
        self.column + self.length
    }
}

/// Iterator over the segments of one block, in row order
#[derive(Debug, Clone)]
pub struct RowSegments {
    cursor: u64,
    end: u64,
    row_bytes: u64,
}

impl RowSegments {
    /// # Panics
    ///
    /// Panics if `row_bytes` is zero.
    pub fn new(address: u64, size: u64, base: u64, row_bytes: u64) -> Self {
        assert!(row_bytes > 0, "row_bytes must be non-zero");

        // A block below the base has no position on the grid
        let (cursor, end) = match address.checked_sub(base) {
            Some(start) => (start, start.saturating_add(size)),
            None => (0, 0),
        };

        RowSegments {
            cursor,
            end,
            row_bytes,
        }
    }
}

impl Iterator for RowSegments {
    type Item = RowSegment;

    fn next(&mut self) -> Option<RowSegment> {
        if self.cursor >= self.end {
            return None;
        }

        let row = self.cursor / self.row_bytes;
        let row_start = row * self.row_bytes;
        let row_end = row_start.saturating_add(self.row_bytes);
        let seg_end = self.end.min(row_end);

        let segment = RowSegment {
            row,
            column: self.cursor - row_start,
            length: seg_end - self.cursor,
        };
        self.cursor = seg_end;
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.cursor >= self.end {
            return (0, Some(0));
        }
        let first = self.cursor / self.row_bytes;
        let last = (self.end - 1) / self.row_bytes;
        let rows = usize::try_from(last - first + 1).ok();
        (rows.unwrap_or(usize::MAX), rows)
    }
}

/// Split the block `[address, address + size)` into per-row segments.
///
/// `size == 0` yields nothing. Segment lengths sum to `size`, segments never
/// overlap, and every segment lies within `[0, row_bytes)`.
pub fn segment_block(address: u64, size: u64, base: u64, row_bytes: u64) -> Vec<RowSegment> {
    RowSegments::new(address, size, base, row_bytes).collect()
}
