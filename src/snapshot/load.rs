//! Loading the frame sequence from snapshot files
//!
//! Files are read and parsed in increasing frame-index order. A missing file
//! is skipped with a warning; any other failure (unreadable file, unparseable
//! contents) aborts the whole load. The load fails with
//! [`LoadError::Empty`] when no frame survives.

use super::Frame;
use crate::config::AnimConfig;
use crate::errors::LoadError;
use crate::parser::{parse_snapshot, ParseMode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Frames loaded for one run plus what was skipped on the way
#[derive(Debug, Default)]
pub struct LoadReport {
    pub frames: Vec<Frame>,
    /// Paths in the range that did not exist
    pub skipped: Vec<PathBuf>,
    /// Paths that only parsed through the lenient fallback
    pub recovered: Vec<PathBuf>,
}

impl LoadReport {
    pub fn first_path(&self) -> Option<&Path> {
        self.frames.first().map(|f| f.path.as_path())
    }

    pub fn last_path(&self) -> Option<&Path> {
        self.frames.last().map(|f| f.path.as_path())
    }
}

/// Load every frame in the configured range
pub fn load_frames(config: &AnimConfig) -> Result<LoadReport, LoadError> {
    let mut report = LoadReport::default();
    let zone = config.zone.as_deref();

    for index in config.frame_indices() {
        let path = config.frame_path(index);
        match load_frame(&path, index, zone)? {
            Some((frame, mode)) => {
                log::debug!(
                    "loaded frame {} from {}: {} live block(s)",
                    index,
                    path.display(),
                    frame.len()
                );
                if matches!(mode, ParseMode::Lenient { .. }) {
                    report.recovered.push(path);
                }
                report.frames.push(frame);
            }
            None => {
                log::warn!("missing file {}, skipping", path.display());
                report.skipped.push(path);
            }
        }
    }

    if report.frames.is_empty() {
        return Err(LoadError::Empty {
            pattern: config.pattern.clone(),
            start: config.start,
            end: config.end,
        });
    }

    Ok(report)
}

/// Load one snapshot file as a frame. `Ok(None)` means the file does not exist.
pub fn load_frame(
    path: &Path,
    index: u64,
    zone: Option<&str>,
) -> Result<Option<(Frame, ParseMode)>, LoadError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    // Producers are not guaranteed to emit valid UTF-8
    let text = String::from_utf8_lossy(&bytes);
    let parsed = parse_snapshot(&text, path)?;

    let frame = Frame::from_snapshot(index, path, &parsed.snapshot, zone);
    Ok(Some((frame, parsed.mode)))
}
