//! # Introduction
//!
//! heapanim turns a numbered sequence of heap snapshots into an animation of
//! allocation churn. Every frame lays the live blocks of one zone out on a
//! shared address grid and highlights the blocks that were not present in the
//! frame before.
//!
//! ## Pipeline
//!
//! ```text
//! Files → Parser → Snapshots → Frames → Layout → Diff → Draw instructions → Sink
//! ```
//!
//! 1. [`parser`]: strict JSON parse with a lenient recovery fallback for
//!    damaged snapshot files.
//! 2. [`snapshot`]: the snapshot data model, zone selection, live-block
//!    filtering and loading of the frame sequence.
//! 3. [`layout`]: the global address range and row segmentation of blocks.
//! 4. [`diff`]: classification of each frame's blocks against the previous
//!    frame.
//! 5. [`render`]: draw instructions plus the GIF/PNG and terminal sinks.
//!
//! [`config`] holds the run configuration and [`errors`] the error types
//! shared by every stage.
//!
//! ## Snapshot format
//!
//! ```text
//! { "zones": [ { "index": 0, "name": "DefaultMallocZone",
//!                "blocks": [ { "type": 1, "address": 4096, "size": 32 } ] } ] }
//! ```
//!
//! Only blocks with `type == 1` are live allocations.

pub mod config;
pub mod diff;
pub mod errors;
pub mod layout;
pub mod parser;
pub mod render;
pub mod snapshot;
