//! Frame differencing
//!
//! Each frame's blocks are classified against the *immediately preceding*
//! frame only:
//!
//! - `existing = current ∩ previous`
//! - `new = current − previous`
//!
//! The previous set is threaded through an explicit fold: [`classify`] takes
//! the accumulator and returns the next one. It is not a union of all earlier
//! frames, so a block that disappears for one frame and comes back is `new`
//! again. Blocks that disappear are not reported at all.

use crate::snapshot::{BlockKey, Frame};
use rustc_hash::FxHashSet;

/// Set of block identities present in one frame
pub type FrameSet = FxHashSet<BlockKey>;

/// A frame's blocks split by whether the previous frame had them.
/// Both lists are sorted by `(address, size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameClassification {
    pub existing: Vec<BlockKey>,
    pub new: Vec<BlockKey>,
}

impl FrameClassification {
    pub fn len(&self) -> usize {
        self.existing.len() + self.new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.new.is_empty()
    }
}

/// Collect a frame's block identities; duplicates collapse
pub fn frame_set(frame: &Frame) -> FrameSet {
    frame.keys().collect()
}

/// One step of the fold: classify `current` against `previous` and hand back
/// `current` as the accumulator for the next frame.
pub fn classify(previous: &FrameSet, current: FrameSet) -> (FrameClassification, FrameSet) {
    let (mut existing, mut new): (Vec<BlockKey>, Vec<BlockKey>) =
        current.iter().partition(|key| previous.contains(*key));
    existing.sort_unstable();
    new.sort_unstable();

    (FrameClassification { existing, new }, current)
}

/// Classify every frame in order, starting from an empty previous set
pub fn classify_all(frames: &[Frame]) -> Vec<FrameClassification> {
    frames
        .iter()
        .scan(FrameSet::default(), |previous, frame| {
            let (classification, next) = classify(previous, frame_set(frame));
            *previous = next;
            Some(classification)
        })
        .collect()
}
