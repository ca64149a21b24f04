//! Global address-space layout shared by every frame
//!
//! The layout is computed once over the union of all frames so that a pixel
//! position means the same address for the whole animation:
//!
//! - `base_address`: lowest block address in any frame
//! - `limit_address`: highest `address + size` in any frame
//! - `row_count = ceil(span / row_bytes)` with `span = max(1, limit - base)`
//!
//! With no live block anywhere the layout falls back to the unit range
//! `[0, 1)` and sets [`GlobalLayout::degenerate`], so an empty animation can
//! still be produced.

pub mod segment;

pub use segment::{segment_block, RowSegment, RowSegments};

use crate::snapshot::{BlockKey, Frame};

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalLayout {
    pub base_address: u64,
    pub limit_address: u64,
    pub row_bytes: u64,
    pub row_count: u64,
    /// No live blocks were found; the range is the unit default
    pub degenerate: bool,
}

impl GlobalLayout {
    /// Compute the layout over every block of every frame.
    ///
    /// # Panics
    ///
    /// Panics if `row_bytes` is zero.
    pub fn compute(frames: &[Frame], row_bytes: u64) -> Self {
        Self::from_keys(frames.iter().flat_map(Frame::keys), row_bytes)
    }

    /// Compute the layout over an arbitrary set of blocks
    pub fn from_keys(keys: impl IntoIterator<Item = BlockKey>, row_bytes: u64) -> Self {
        let bounds = keys.into_iter().fold(None, |acc: Option<(u64, u64)>, key| {
            Some(match acc {
                None => (key.address, key.end()),
                Some((lo, hi)) => (lo.min(key.address), hi.max(key.end())),
            })
        });

        match bounds {
            Some((base, limit)) => Self::from_bounds(base, limit, row_bytes),
            None => {
                log::info!("no live blocks in any frame, using unit address range");
                GlobalLayout {
                    degenerate: true,
                    ..Self::from_bounds(0, 1, row_bytes)
                }
            }
        }
    }

    pub fn from_bounds(base_address: u64, limit_address: u64, row_bytes: u64) -> Self {
        assert!(row_bytes > 0, "row_bytes must be non-zero");

        let span = limit_address.saturating_sub(base_address).max(1);
        GlobalLayout {
            base_address,
            limit_address,
            row_bytes,
            row_count: span.div_ceil(row_bytes),
            degenerate: false,
        }
    }

    /// Bytes covered by the layout, at least 1
    pub fn span(&self) -> u64 {
        self.limit_address.saturating_sub(self.base_address).max(1)
    }

    pub fn span_mib(&self) -> f64 {
        self.span() as f64 / MIB
    }

    /// Row segments of one block against this layout (unclipped)
    pub fn segments(&self, key: BlockKey) -> RowSegments {
        RowSegments::new(key.address, key.size, self.base_address, self.row_bytes)
    }

    pub fn contains_row(&self, row: u64) -> bool {
        row < self.row_count
    }

    /// Human-readable address summary, one line per fact
    pub fn summary(&self) -> [String; 2] {
        [
            format!(
                "addr base=0x{:x}, limit=0x{:x}, span={} bytes (~{:.2} MiB)",
                self.base_address,
                self.limit_address,
                self.span(),
                self.span_mib()
            ),
            format!("rows={}, row_bytes={}", self.row_count, self.row_bytes),
        ]
    }

    /// Animation title for a zone
    pub fn title(&self, zone: &str) -> String {
        format!(
            "{}  |  base=0x{:x} span≈{:.2} MiB  rows={} row_bytes={}",
            zone,
            self.base_address,
            self.span_mib(),
            self.row_count,
            self.row_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Block;

    fn frame(index: u64, blocks: &[(u64, u64)]) -> Frame {
        Frame::new(
            index,
            format!("heap.{}.json", index),
            blocks.iter().map(|&(a, s)| Block::new(1, a, s)).collect(),
        )
    }

    #[test]
    fn test_bounds_span_all_frames() {
        let frames = vec![frame(0, &[(0x100, 0x10)]), frame(1, &[(0x200, 0x20)])];
        let layout = GlobalLayout::compute(&frames, 0x40);

        assert_eq!(layout.base_address, 0x100);
        assert_eq!(layout.limit_address, 0x220);
        assert_eq!(layout.span(), 0x120);
        assert_eq!(layout.row_count, 5);
        assert!(!layout.degenerate);
    }

    #[test]
    fn test_no_blocks_is_degenerate_unit_range() {
        let frames = vec![frame(0, &[]), frame(1, &[])];
        let layout = GlobalLayout::compute(&frames, 1 << 20);

        assert_eq!(layout.base_address, 0);
        assert_eq!(layout.limit_address, 1);
        assert_eq!(layout.row_count, 1);
        assert!(layout.degenerate);
    }

    #[test]
    fn test_zero_sized_block_still_sets_bounds() {
        let layout = GlobalLayout::from_keys([BlockKey::new(0x800, 0)], 16);

        assert_eq!(layout.base_address, 0x800);
        assert_eq!(layout.limit_address, 0x800);
        assert_eq!(layout.span(), 1);
        assert_eq!(layout.row_count, 1);
    }

    #[test]
    fn test_row_count_rounds_up() {
        let layout = GlobalLayout::from_bounds(0, 33, 16);
        assert_eq!(layout.row_count, 3);
        assert!(layout.contains_row(2));
        assert!(!layout.contains_row(3));
    }

    #[test]
    fn test_summary_lines() {
        let layout = GlobalLayout::from_bounds(0x1000, 0x101000, 1 << 20);
        let [addr, rows] = layout.summary();

        assert_eq!(
            addr,
            "addr base=0x1000, limit=0x101000, span=1048576 bytes (~1.00 MiB)"
        );
        assert_eq!(rows, "rows=1, row_bytes=1048576");
    }
}
