//! Snapshot text parser
//!
//! This module turns the raw text of one snapshot file into a
//! [`Snapshot`](crate::snapshot::Snapshot):
//! - [`lexer`]: Tokenization (snapshot text → tokens), never fails
//! - [`lenient`]: Recursive-descent recovery parser over the token stream
//! - [`parse`]: Entry point, strict `serde_json` parse with lenient fallback
//!
//! # Parser Implementation
//!
//! The strict path is plain serde. The lenient path is a hand-written
//! recursive descent parser with explicit resynchronization after every zone
//! and block record, so one damaged record costs only that record.

pub mod lenient;
pub mod lexer;
pub mod parse;

pub use parse::{parse_snapshot, ParseMode, Parsed};
