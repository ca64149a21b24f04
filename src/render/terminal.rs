//! Terminal preview sink
//!
//! Renders each frame into an off-screen ratatui [`Buffer`] as a bordered
//! heap map, one character cell per grid unit. Existing blocks are drawn with
//! `▒`, new blocks with `█` on top of them, and untouched cells stay `·`.
//! The most recent frame is kept as plain text.

use super::theme::DEFAULT_THEME;
use super::{Classification, FrameView, RenderSink, Surface};
use crate::errors::RenderError;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Widget},
};

pub const DEFAULT_PREVIEW_WIDTH: u16 = 96;
pub const DEFAULT_PREVIEW_HEIGHT: u16 = 30;

const EMPTY_CELL: &str = "·";
const EXISTING_CELL: &str = "▒";
const NEW_CELL: &str = "█";

/// Heap map widget for a single frame
pub struct HeapMap<'a> {
    view: &'a FrameView<'a>,
}

impl<'a> HeapMap<'a> {
    pub fn new(view: &'a FrameView<'a>) -> Self {
        HeapMap { view }
    }
}

impl Widget for HeapMap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.view;
        let legend = format!(
            " {} existing {}  {} new {} ",
            EXISTING_CELL,
            view.classification.existing.len(),
            NEW_CELL,
            view.classification.new.len()
        );

        let block = Block::default()
            .title(Line::styled(
                format!(" {} ", view.title),
                Style::default()
                    .fg(DEFAULT_THEME.title)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::styled(legend, Style::default().fg(DEFAULT_THEME.comment)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(DEFAULT_THEME.border));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.is_empty() {
            return;
        }

        let background = Style::default().fg(DEFAULT_THEME.comment);
        for y in inner.top()..inner.bottom() {
            for x in inner.left()..inner.right() {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_symbol(EMPTY_CELL).set_style(background);
                }
            }
        }

        let cells_per_byte = f64::from(inner.width) / view.layout.row_bytes as f64;
        let cells_per_row = f64::from(inner.height) / view.layout.row_count as f64;

        for instruction in view.instructions {
            let (symbol, color) = match instruction.classification {
                Classification::Existing => (EXISTING_CELL, DEFAULT_THEME.existing_cell),
                Classification::New => (NEW_CELL, DEFAULT_THEME.new_cell),
            };
            let x0 = instruction.column as f64 * cells_per_byte;
            let y0 = instruction.row as f64 * cells_per_row;
            let columns = cell_span(x0, x0 + instruction.width * cells_per_byte, inner.width);
            let rows = cell_span(y0, y0 + instruction.height * cells_per_row, inner.height);

            let (Some((left, right)), Some((top, bottom))) = (columns, rows) else {
                continue;
            };
            for y in top..bottom {
                for x in left..right {
                    if let Some(cell) = buf.cell_mut((inner.x + x, inner.y + y)) {
                        cell.set_symbol(symbol).set_style(Style::default().fg(color));
                    }
                }
            }
        }
    }
}

/// Cells covered by `[from, to)`, clipped to `limit` and at least one wide
fn cell_span(from: f64, to: f64, limit: u16) -> Option<(u16, u16)> {
    let clamp = |v: f64| v.max(0.0).min(f64::from(limit)) as u16;

    let start = clamp(from.floor());
    if start >= limit {
        return None;
    }
    Some((start, clamp(to.ceil()).max(start + 1)))
}

/// Buffer contents as text, one line per row, trailing blanks trimmed
pub fn buffer_text(buf: &Buffer) -> String {
    let area = buf.area;
    (area.top()..area.bottom())
        .map(|y| {
            let line: String = (area.left()..area.right())
                .filter_map(|x| buf.cell((x, y)).map(|cell| cell.symbol()))
                .collect();
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Draws frames off-screen and keeps the last one as text
pub struct TerminalSink {
    width: u16,
    height: u16,
    last: Option<String>,
}

impl TerminalSink {
    pub fn new(width: u16, height: u16) -> Self {
        TerminalSink {
            width,
            height,
            last: None,
        }
    }

    pub fn area(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn last_frame(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_WIDTH, DEFAULT_PREVIEW_HEIGHT)
    }
}

impl RenderSink for TerminalSink {
    /// Cells inside the border
    fn surface(&self) -> Surface {
        Surface::new(
            u32::from(self.width.saturating_sub(2)),
            u32::from(self.height.saturating_sub(2)),
        )
    }

    fn draw_frame(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        let area = self.area();
        let mut buf = Buffer::empty(area);
        HeapMap::new(view).render(area, &mut buf);
        self.last = Some(buffer_text(&buf));
        Ok(())
    }
}
