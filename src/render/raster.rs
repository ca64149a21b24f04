//! Raster sink: animated GIF and PNG stills
//!
//! Each frame is drawn onto an RGBA canvas with the address grid running
//! top-down (row 0 at the top, byte 0 of each row at the left). Existing
//! blocks are light grey, new blocks red, both outlined when large enough for
//! an outline to be visible.

use super::theme::{to_rgba, DEFAULT_THEME};
use super::{Classification, FrameView, RenderSink, Surface};
use crate::errors::RenderError;
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame as ImageFrame, Rgba, RgbaImage};
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Grid lines per axis, minus one
const GRID_DIVISIONS: u32 = 10;
/// Dash pattern of grid lines, in pixels
const DASH: u32 = 4;
/// One frame per second
const FRAME_DELAY_MS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterOptions {
    pub width: u32,
    pub height: u32,
    /// Animated GIF output
    pub gif: Option<PathBuf>,
    /// Directory for `frame_NNNN.png` stills
    pub png_dir: Option<PathBuf>,
    /// Still of the last frame, written when `png_dir` is unset
    pub summary_png: Option<PathBuf>,
}

/// GIF bytes shared with the encoder. The encoder only writes its trailer
/// when dropped, so the file itself is written from here afterwards.
#[derive(Clone, Default)]
struct GifBuffer(Rc<RefCell<Vec<u8>>>);

impl GifBuffer {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl Write for GifBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct RasterSink {
    options: RasterOptions,
    encoder: Option<GifEncoder<GifBuffer>>,
    gif_bytes: GifBuffer,
    last: Option<RgbaImage>,
    written: Vec<PathBuf>,
}

impl RasterSink {
    /// Open the outputs. The GIF file and PNG directory are created eagerly so
    /// a bad path fails before any frame is rendered.
    pub fn create(options: RasterOptions) -> Result<Self, RenderError> {
        if let Some(dir) = &options.png_dir {
            fs::create_dir_all(dir).map_err(|source| RenderError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        let gif_bytes = GifBuffer::default();
        let encoder = match &options.gif {
            Some(path) => {
                File::create(path).map_err(|source| RenderError::Io {
                    path: path.clone(),
                    source,
                })?;
                Some(GifEncoder::new(gif_bytes.clone()))
            }
            None => None,
        };

        Ok(RasterSink {
            options,
            encoder,
            gif_bytes,
            last: None,
            written: Vec::new(),
        })
    }

    /// Files written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Draw one frame's instructions onto a fresh canvas
    pub fn rasterize(&self, view: &FrameView<'_>) -> RgbaImage {
        let (width, height) = (self.options.width, self.options.height);
        let mut image = RgbaImage::from_pixel(width, height, to_rgba(DEFAULT_THEME.canvas));
        draw_grid(&mut image);

        let px_per_byte = f64::from(width) / view.layout.row_bytes as f64;
        let px_per_row = f64::from(height) / view.layout.row_count as f64;
        let outline = to_rgba(DEFAULT_THEME.outline);

        for instruction in view.instructions {
            let x0 = instruction.column as f64 * px_per_byte;
            let y0 = instruction.row as f64 * px_per_row;
            let Some(rect) = PixelRect::covering(
                x0,
                y0,
                x0 + instruction.width * px_per_byte,
                y0 + instruction.height * px_per_row,
                width,
                height,
            ) else {
                continue;
            };

            let fill = match instruction.classification {
                Classification::Existing => to_rgba(DEFAULT_THEME.existing),
                Classification::New => to_rgba(DEFAULT_THEME.new),
            };
            rect.fill(&mut image, fill);
            if rect.width() > 2 && rect.height() > 2 {
                rect.outline(&mut image, outline);
            }
        }

        image
    }

    fn save_png(&mut self, image: &RgbaImage, path: &Path) -> Result<(), RenderError> {
        image.save(path).map_err(|source| RenderError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        self.written.push(path.to_path_buf());
        Ok(())
    }
}

impl RenderSink for RasterSink {
    fn surface(&self) -> Surface {
        Surface::new(self.options.width, self.options.height)
    }

    fn draw_frame(&mut self, view: &FrameView<'_>) -> Result<(), RenderError> {
        let image = self.rasterize(view);

        if let Some(dir) = self.options.png_dir.clone() {
            let path = dir.join(format!("frame_{:04}.png", view.position));
            self.save_png(&image, &path)?;
        }

        if let Some(encoder) = self.encoder.as_mut() {
            let delay = Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1);
            encoder
                .encode_frame(ImageFrame::from_parts(image.clone(), 0, 0, delay))
                .map_err(|source| RenderError::Image {
                    path: self.options.gif.clone().unwrap_or_default(),
                    source,
                })?;
        }

        self.last = Some(image);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        // Dropping the encoder writes the GIF trailer into the buffer
        if let Some(encoder) = self.encoder.take() {
            drop(encoder);
            if let Some(gif) = self.options.gif.clone() {
                fs::write(&gif, self.gif_bytes.take()).map_err(|source| RenderError::Io {
                    path: gif.clone(),
                    source,
                })?;
                self.written.push(gif);
            }
        }

        if self.options.png_dir.is_none() {
            if let (Some(path), Some(image)) = (self.options.summary_png.clone(), self.last.take()) {
                self.save_png(&image, &path)?;
            }
        }

        Ok(())
    }
}

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)`, never empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl PixelRect {
    /// Smallest pixel rectangle covering the given extent, clipped to the
    /// canvas and at least one pixel in each direction
    fn covering(x0: f64, y0: f64, x1: f64, y1: f64, width: u32, height: u32) -> Option<Self> {
        let clamp = |v: f64, max: u32| v.max(0.0).min(f64::from(max)) as u32;

        let (left, top) = (clamp(x0.floor(), width), clamp(y0.floor(), height));
        if left >= width || top >= height {
            return None;
        }
        let right = clamp(x1.ceil(), width).max(left + 1);
        let bottom = clamp(y1.ceil(), height).max(top + 1);

        Some(PixelRect {
            x0: left,
            y0: top,
            x1: right,
            y1: bottom,
        })
    }

    fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    fn fill(&self, image: &mut RgbaImage, color: Rgba<u8>) {
        for y in self.y0..self.y1 {
            for x in self.x0..self.x1 {
                image.put_pixel(x, y, color);
            }
        }
    }

    fn outline(&self, image: &mut RgbaImage, color: Rgba<u8>) {
        for x in self.x0..self.x1 {
            image.put_pixel(x, self.y0, color);
            image.put_pixel(x, self.y1 - 1, color);
        }
        for y in self.y0..self.y1 {
            image.put_pixel(self.x0, y, color);
            image.put_pixel(self.x1 - 1, y, color);
        }
    }
}

fn draw_grid(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    let color = to_rgba(DEFAULT_THEME.grid);

    for i in 1..GRID_DIVISIONS {
        let x = width * i / GRID_DIVISIONS;
        let y = height * i / GRID_DIVISIONS;
        for py in (0..height).filter(|p| (p / DASH) % 2 == 0) {
            image.put_pixel(x, py, color);
        }
        for px in (0..width).filter(|p| (p / DASH) % 2 == 0) {
            image.put_pixel(px, y, color);
        }
    }
}
