//! Run configuration
//!
//! [`AnimConfig`] collects every tunable of one animation run. Its `Default`
//! matches the command-line defaults; the binary overrides fields from
//! parsed arguments and calls [`AnimConfig::validate`] before loading.

use crate::errors::ConfigError;
use std::path::PathBuf;

/// Placeholder replaced by the frame index in [`AnimConfig::pattern`]
pub const FRAME_PLACEHOLDER: &str = "{k}";

pub const DEFAULT_PATTERN: &str = "heapdump.{k}.json";
pub const DEFAULT_ZONE: &str = "DefaultMallocZone";
pub const DEFAULT_ROW_BYTES: u64 = 1 << 20;
pub const DEFAULT_MIN_PX: u32 = 4;
pub const DEFAULT_OUT: &str = "heap_anim.gif";
pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 800;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimConfig {
    /// Snapshot path pattern containing [`FRAME_PLACEHOLDER`]
    pub pattern: String,
    /// First frame index (inclusive)
    pub start: u64,
    /// Last frame index (inclusive)
    pub end: u64,
    /// Zone to animate; `None` selects the first zone of each snapshot
    pub zone: Option<String>,
    /// Bytes per display row
    pub row_bytes: u64,
    /// Minimum drawn thickness of a block, in surface pixels
    pub min_px: u32,
    /// Animated GIF output path
    pub out: Option<PathBuf>,
    /// Directory receiving one PNG per frame
    pub png_dir: Option<PathBuf>,
    /// Raster surface size in pixels
    pub width: u32,
    pub height: u32,
}

impl Default for AnimConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            start: 0,
            end: 0,
            zone: Some(DEFAULT_ZONE.to_string()),
            row_bytes: DEFAULT_ROW_BYTES,
            min_px: DEFAULT_MIN_PX,
            out: Some(PathBuf::from(DEFAULT_OUT)),
            png_dir: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl AnimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_bytes == 0 {
            return Err(ConfigError::ZeroRowBytes);
        }
        if self.start > self.end {
            return Err(ConfigError::ReversedRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.start != self.end && !self.pattern.contains(FRAME_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder {
                pattern: self.pattern.clone(),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptySurface {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Path of the snapshot for frame `index`
    pub fn frame_path(&self, index: u64) -> PathBuf {
        PathBuf::from(self.pattern.replace(FRAME_PLACEHOLDER, &index.to_string()))
    }

    pub fn frame_indices(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }

    /// Zone label used in titles
    pub fn zone_label(&self) -> &str {
        self.zone.as_deref().unwrap_or("(first zone)")
    }

    /// Still image written when no PNG directory is configured:
    /// the GIF path with its extension replaced by `.png`
    pub fn summary_png(&self) -> PathBuf {
        match &self.out {
            Some(out) => out.with_extension("png"),
            None => PathBuf::from("heap_anim.png"),
        }
    }
}
