//! Draw-instruction generation and rendering sinks
//!
//! The core never touches pixels. For each frame it produces an ordered list
//! of [`DrawInstruction`]s: one rectangle per visible row segment, tagged with
//! its [`Classification`]. A [`RenderSink`] turns those into output:
//!
//! - [`raster::RasterSink`]: animated GIF plus optional per-frame PNGs
//! - [`terminal::TerminalSink`]: a text heap map rendered with ratatui
//!
//! # Minimum thickness
//!
//! Small allocations in a large address space would be narrower than a pixel.
//! Every instruction is widened to at least `min_px` pixels and made at least
//! `min_px` pixels (and one row) tall. The pixel-to-data conversion depends on
//! the sink's current [`Surface`], which is queried again for every frame.
//!
//! # Draw order
//!
//! Existing blocks first, then new blocks on top; within each group blocks
//! are in `(address, size)` order and segments in row order. Identical inputs
//! always produce identical instruction lists.

pub mod raster;
pub mod terminal;
pub mod theme;

use crate::diff::{classify, frame_set, FrameClassification, FrameSet};
use crate::errors::RenderError;
use crate::layout::GlobalLayout;
use crate::snapshot::{BlockKey, Frame};

/// Whether a block was already present in the previous frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Existing,
    New,
}

/// One rectangle to draw, in data units: columns are bytes within a row,
/// rows are display rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawInstruction {
    pub row: u64,
    /// Byte offset of the segment within its row
    pub column: u64,
    /// Segment length in bytes, clipped to the row
    pub length: u64,
    pub classification: Classification,
    /// Drawn width in bytes, at least `length`
    pub width: f64,
    /// Drawn height in rows, at least 1
    pub height: f64,
}

/// Pixel size of the area a sink draws the grid into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Surface { width, height }
    }
}

/// Minimum drawn extents in data units for one surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thickness {
    pub min_width: f64,
    pub min_height: f64,
}

impl Thickness {
    pub fn for_surface(layout: &GlobalLayout, surface: Surface, min_px: u32) -> Self {
        let bytes_per_px = layout.row_bytes as f64 / f64::from(surface.width.max(1));
        let rows_per_px = layout.row_count as f64 / f64::from(surface.height.max(1));
        let min_px = f64::from(min_px);

        Thickness {
            min_width: min_px * bytes_per_px,
            min_height: (min_px * rows_per_px).max(1.0),
        }
    }
}

/// Converts classified frames into draw instructions against a fixed layout
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    layout: GlobalLayout,
    min_px: u32,
}

impl FrameRenderer {
    pub fn new(layout: GlobalLayout, min_px: u32) -> Self {
        FrameRenderer { layout, min_px }
    }

    pub fn layout(&self) -> &GlobalLayout {
        &self.layout
    }

    pub fn render(
        &self,
        classification: &FrameClassification,
        surface: Surface,
    ) -> Vec<DrawInstruction> {
        let thickness = Thickness::for_surface(&self.layout, surface, self.min_px);
        let mut instructions = Vec::with_capacity(classification.len());

        self.push_group(
            &mut instructions,
            &classification.existing,
            Classification::Existing,
            thickness,
        );
        self.push_group(
            &mut instructions,
            &classification.new,
            Classification::New,
            thickness,
        );

        instructions
    }

    fn push_group(
        &self,
        out: &mut Vec<DrawInstruction>,
        keys: &[BlockKey],
        classification: Classification,
        thickness: Thickness,
    ) {
        let row_bytes = self.layout.row_bytes;

        for key in keys {
            // Rows ascend, so everything after the first out-of-range row is too
            let visible = self
                .layout
                .segments(*key)
                .take_while(|seg| self.layout.contains_row(seg.row));

            for seg in visible {
                let column = seg.column.min(row_bytes);
                let length = seg.column_end().min(row_bytes) - column;
                if length == 0 {
                    continue;
                }

                out.push(DrawInstruction {
                    row: seg.row,
                    column,
                    length,
                    classification,
                    width: (length as f64).max(thickness.min_width),
                    height: thickness.min_height,
                });
            }
        }
    }
}

/// Everything a sink needs to draw one frame
pub struct FrameView<'a> {
    /// Position of the frame in the animation, from 0
    pub position: usize,
    pub frame: &'a Frame,
    pub title: &'a str,
    pub layout: &'a GlobalLayout,
    pub classification: &'a FrameClassification,
    pub instructions: &'a [DrawInstruction],
}

/// Consumer of draw instructions (image encoder, terminal, test recorder)
pub trait RenderSink {
    /// Current drawing surface; may change between frames
    fn surface(&self) -> Surface;

    fn draw_frame(&mut self, view: &FrameView<'_>) -> Result<(), RenderError>;

    /// Flush and close outputs after the last frame
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// What one pass over the frames produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSummary {
    pub frames: usize,
    pub instructions: usize,
    /// Classification of the final frame
    pub last: FrameClassification,
}

/// Render every frame in order into `sink`.
///
/// Differencing is stateful, so frames are processed strictly in sequence:
/// each step classifies against the previous frame's set and hands its own
/// set on as the next accumulator.
pub fn play<S: RenderSink + ?Sized>(
    frames: &[Frame],
    renderer: &FrameRenderer,
    title: &str,
    sink: &mut S,
) -> Result<PlaybackSummary, RenderError> {
    let mut summary = PlaybackSummary::default();
    let mut previous = FrameSet::default();

    for (position, frame) in frames.iter().enumerate() {
        let (classification, next) = classify(&previous, frame_set(frame));
        previous = next;

        let instructions = renderer.render(&classification, sink.surface());
        let frame_title = format!("{} (frame {})", title, position);
        log::debug!(
            "frame {} ({}): {} existing, {} new, {} instruction(s)",
            position,
            frame.path.display(),
            classification.existing.len(),
            classification.new.len(),
            instructions.len()
        );

        sink.draw_frame(&FrameView {
            position,
            frame,
            title: &frame_title,
            layout: renderer.layout(),
            classification: &classification,
            instructions: &instructions,
        })?;

        summary.frames += 1;
        summary.instructions += instructions.len();
        summary.last = classification;
    }

    sink.finish()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Block;

    fn keys(keys: &[(u64, u64)]) -> Vec<BlockKey> {
        keys.iter().map(|&k| BlockKey::from(k)).collect()
    }

    #[test]
    fn test_thickness_follows_surface() {
        let layout = GlobalLayout::from_bounds(0, 1000, 100); // 10 rows
        let small = Thickness::for_surface(&layout, Surface::new(100, 10), 4);
        let large = Thickness::for_surface(&layout, Surface::new(400, 400), 4);

        assert_eq!(small.min_width, 4.0);
        assert_eq!(small.min_height, 4.0);
        assert_eq!(large.min_width, 1.0);
        assert_eq!(large.min_height, 1.0);
    }

    #[test]
    fn test_existing_drawn_before_new() {
        let layout = GlobalLayout::from_bounds(0, 64, 16);
        let renderer = FrameRenderer::new(layout, 0);
        let classification = FrameClassification {
            existing: keys(&[(40, 4)]),
            new: keys(&[(0, 20)]),
        };

        let out = renderer.render(&classification, Surface::new(16, 4));
        let tags: Vec<_> = out.iter().map(|i| (i.row, i.column, i.length, i.classification)).collect();

        assert_eq!(
            tags,
            vec![
                (2, 8, 4, Classification::Existing),
                (0, 0, 16, Classification::New),
                (1, 0, 4, Classification::New),
            ]
        );
    }

    #[test]
    fn test_rows_outside_layout_are_clipped() {
        let layout = GlobalLayout::from_bounds(0, 32, 16); // rows 0..2
        let renderer = FrameRenderer::new(layout, 0);
        let classification = FrameClassification {
            existing: vec![],
            new: keys(&[(24, 1 << 40)]),
        };

        let out = renderer.render(&classification, Surface::new(16, 2));
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].row, out[0].column, out[0].length), (1, 8, 8));
    }

    #[test]
    fn test_tiny_block_is_widened() {
        let layout = GlobalLayout::from_bounds(0, 1 << 20, 1 << 20);
        let renderer = FrameRenderer::new(layout, 4);
        let classification = FrameClassification {
            existing: vec![],
            new: keys(&[(100, 1)]),
        };

        let out = renderer.render(&classification, Surface::new(1024, 100));
        assert_eq!(out[0].length, 1);
        assert_eq!(out[0].width, 4096.0);
        assert_eq!(out[0].height, 1.0);
    }

    struct Recorder {
        surfaces: Vec<Surface>,
        frames: Vec<Vec<DrawInstruction>>,
        finished: bool,
    }

    impl RenderSink for Recorder {
        fn surface(&self) -> Surface {
            self.surfaces[self.frames.len()]
        }

        fn draw_frame(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
            assert_eq!(view.position, self.frames.len());
            self.frames.push(view.instructions.to_vec());
            Ok(())
        }

        fn finish(&mut self) -> Result<(), RenderError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_play_requeries_surface_each_frame() {
        let frames: Vec<Frame> = (0..2)
            .map(|i| Frame::new(i, "heap.json", vec![Block::new(1, 0, 1)]))
            .collect();
        let layout = GlobalLayout::compute(&frames, 100);
        let renderer = FrameRenderer::new(layout, 2);
        let mut sink = Recorder {
            surfaces: vec![Surface::new(100, 10), Surface::new(200, 10)],
            frames: vec![],
            finished: false,
        };

        let summary = play(&frames, &renderer, "t", &mut sink).unwrap();

        assert!(sink.finished);
        assert_eq!(summary.frames, 2);
        assert_eq!(sink.frames[0][0].width, 2.0);
        assert_eq!(sink.frames[1][0].width, 1.0);
        assert_eq!(sink.frames[0][0].classification, Classification::New);
        assert_eq!(sink.frames[1][0].classification, Classification::Existing);
        assert_eq!(summary.last.existing, keys(&[(0, 1)]));
    }
}
