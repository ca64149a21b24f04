//! Error types for snapshot loading, configuration and rendering
//!
//! The taxonomy mirrors how failures are treated by the pipeline:
//!
//! - [`ParseError`]: both the strict and the lenient parse of one file failed.
//!   Fatal for the whole load, even when other files are well-formed.
//! - [`LoadError`]: anything that stops frame loading (parse failure, an
//!   unreadable file, or zero frames loaded after skipping missing files).
//! - [`ConfigError`]: the run configuration is unusable.
//! - [`RenderError`]: a sink failed to encode or write its output.
//!
//! Missing snapshot files are not errors: they are logged as warnings and
//! recorded in [`LoadReport::skipped`](crate::snapshot::load::LoadReport).
//! An empty address range is not an error either; see
//! [`GlobalLayout::degenerate`](crate::layout::GlobalLayout).

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Neither the strict nor the lenient parser recovered a zone list.
#[derive(Debug)]
pub struct ParseError {
    pub path: PathBuf,
    /// Error reported by the strict parse; the lenient parse found no zones.
    pub source: serde_json::Error,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to parse {}: {} (lenient scan found no zones)",
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Errors that abort loading the frame sequence
#[derive(Debug)]
pub enum LoadError {
    /// A snapshot file exists but could not be parsed
    Parse(ParseError),

    /// A snapshot file exists but could not be read
    Io { path: PathBuf, source: io::Error },

    /// Every file in the requested range was missing
    Empty {
        pattern: String,
        start: u64,
        end: u64,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Parse(err) => write!(f, "{}", err),
            LoadError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            LoadError::Empty {
                pattern,
                start,
                end,
            } => write!(
                f,
                "No frames loaded from pattern '{}' for frames {}..={}; check the pattern, range and zone name",
                pattern, start, end
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Parse(err) => Some(err),
            LoadError::Io { source, .. } => Some(source),
            LoadError::Empty { .. } => None,
        }
    }
}

impl From<ParseError> for LoadError {
    fn from(err: ParseError) -> Self {
        LoadError::Parse(err)
    }
}

/// Invalid run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Rows must hold at least one byte
    ZeroRowBytes,

    /// The frame range is reversed
    ReversedRange { start: u64, end: u64 },

    /// More than one frame was requested but the pattern has no `{k}`
    MissingPlaceholder { pattern: String },

    /// The raster surface has no pixels
    EmptySurface { width: u32, height: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroRowBytes => write!(f, "row width must be at least one byte"),
            ConfigError::ReversedRange { start, end } => {
                write!(f, "start frame {} is after end frame {}", start, end)
            }
            ConfigError::MissingPlaceholder { pattern } => write!(
                f,
                "pattern '{}' has no {{k}} placeholder but several frames were requested",
                pattern
            ),
            ConfigError::EmptySurface { width, height } => {
                write!(f, "surface {}x{} has no pixels", width, height)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised by a [`RenderSink`](crate::render::RenderSink)
#[derive(Debug)]
pub enum RenderError {
    Io { path: PathBuf, source: io::Error },
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Io { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            RenderError::Image { path, source } => {
                write!(f, "Failed to encode {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io { source, .. } => Some(source),
            RenderError::Image { source, .. } => Some(source),
        }
    }
}
