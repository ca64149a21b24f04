//! Snapshot data model and zone/block selection
//!
//! A [`Snapshot`] is one point-in-time capture of the heap: an ordered list of
//! [`Zone`]s, each holding the [`Block`] records the allocator reported. The
//! animation only cares about live allocations of one zone, so every snapshot
//! is reduced to a [`Frame`] as soon as it is loaded:
//!
//! ```text
//! Snapshot ─select zone─▶ Zone ─keep type == 1─▶ Frame
//! ```
//!
//! Block identity across frames is the [`BlockKey`] pair `(address, size)`;
//! snapshots carry no allocation IDs.

pub mod load;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Type tag of a live allocation. Every other tag is dropped during selection.
pub const LIVE_ALLOCATION: u32 = 1;

/// One parsed snapshot file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    pub zones: Vec<Zone>,
}

impl Snapshot {
    /// Look up a zone by name, or the first zone when `name` is `None`
    pub fn zone(&self, name: Option<&str>) -> Option<&Zone> {
        match name {
            None => self.zones.first(),
            Some(name) => self.zones.iter().find(|z| z.name == name),
        }
    }
}

/// A named memory region (allocation pool) inside a snapshot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Zone {
    #[serde(deserialize_with = "de_index")]
    pub index: i64,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// One memory record reported by the allocator
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Block {
    #[serde(rename = "type", default, deserialize_with = "de_tag")]
    pub kind: u32,
    #[serde(deserialize_with = "de_unsigned")]
    pub address: u64,
    #[serde(deserialize_with = "de_unsigned")]
    pub size: u64,
    /// Fields the pipeline does not interpret, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn new(kind: u32, address: u64, size: u64) -> Self {
        Block {
            kind,
            address,
            size,
            extra: Map::new(),
        }
    }

    /// Build a block from an already-parsed JSON object
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_live(&self) -> bool {
        self.kind == LIVE_ALLOCATION
    }

    pub fn key(&self) -> BlockKey {
        BlockKey {
            address: self.address,
            size: self.size,
        }
    }
}

/// Identity of a block across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub address: u64,
    pub size: u64,
}

impl BlockKey {
    pub fn new(address: u64, size: u64) -> Self {
        BlockKey { address, size }
    }

    /// One past the last byte, saturating at `u64::MAX`
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.size)
    }
}

impl From<(u64, u64)> for BlockKey {
    fn from((address, size): (u64, u64)) -> Self {
        BlockKey { address, size }
    }
}

/// The live blocks of one zone in one snapshot: a single animation step
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame index substituted into the path pattern
    pub index: u64,
    pub path: PathBuf,
    pub blocks: Vec<Block>,
}

impl Frame {
    pub fn new(index: u64, path: impl Into<PathBuf>, blocks: Vec<Block>) -> Self {
        Frame {
            index,
            path: path.into(),
            blocks,
        }
    }

    /// Reduce a snapshot to the live blocks of the selected zone
    pub fn from_snapshot(
        index: u64,
        path: impl Into<PathBuf>,
        snapshot: &Snapshot,
        zone: Option<&str>,
    ) -> Self {
        Frame::new(index, path, select_live_blocks(snapshot, zone))
    }

    pub fn keys(&self) -> impl Iterator<Item = BlockKey> + '_ {
        self.blocks.iter().map(Block::key)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Extract the live-allocation blocks of one zone.
///
/// `zone == None` selects the first zone in the snapshot. An unknown zone name
/// yields an empty list rather than an error: a zone may simply not exist yet
/// in early snapshots.
pub fn select_live_blocks(snapshot: &Snapshot, zone: Option<&str>) -> Vec<Block> {
    let Some(found) = snapshot.zone(zone) else {
        log::debug!("zone {:?} not present in snapshot", zone);
        return Vec::new();
    };

    found
        .blocks
        .iter()
        .filter(|b| b.is_live())
        .cloned()
        .collect()
}

/// Read an unsigned integer from a JSON number or a decimal/`0x` hex string
pub fn parse_unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

/// Read a signed integer from a JSON number or a decimal string
pub fn parse_signed(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_unsigned<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_unsigned(&value)
        .ok_or_else(|| D::Error::custom(format!("expected an unsigned integer, got {}", value)))
}

fn de_tag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_unsigned(&value)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("expected a block type tag, got {}", value)))
}

fn de_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_signed(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a zone index, got {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            zones: vec![
                Zone {
                    index: 0,
                    name: "DefaultMallocZone".to_string(),
                    blocks: vec![
                        Block::new(1, 0x1000, 16),
                        Block::new(0, 0x2000, 32),
                        Block::new(1, 0x3000, 8),
                    ],
                },
                Zone {
                    index: 1,
                    name: "QuartzCore".to_string(),
                    blocks: vec![Block::new(1, 0x9000, 64)],
                },
            ],
        }
    }

    #[test]
    fn test_select_named_zone_keeps_live_blocks() {
        let blocks = select_live_blocks(&snapshot(), Some("DefaultMallocZone"));
        let keys: Vec<_> = blocks.iter().map(Block::key).collect();
        assert_eq!(
            keys,
            vec![BlockKey::new(0x1000, 16), BlockKey::new(0x3000, 8)]
        );
    }

    #[test]
    fn test_select_first_zone_when_unnamed() {
        let blocks = select_live_blocks(&snapshot(), None);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].address, 0x1000);
    }

    #[test]
    fn test_select_unknown_zone_is_empty() {
        assert!(select_live_blocks(&snapshot(), Some("NoSuchZone")).is_empty());
        assert!(select_live_blocks(&Snapshot { zones: vec![] }, None).is_empty());
    }

    #[test]
    fn test_block_accepts_string_numbers_and_keeps_extra_fields() {
        let block = Block::from_value(json!({
            "type": "1",
            "address": "0x7f0010",
            "size": 48,
            "tag": "vm"
        }))
        .unwrap();
        assert_eq!(block.kind, 1);
        assert_eq!(block.address, 0x7f0010);
        assert_eq!(block.size, 48);
        assert_eq!(block.extra.get("tag"), Some(&json!("vm")));
    }

    #[test]
    fn test_block_missing_type_is_not_live() {
        let block = Block::from_value(json!({"address": 16, "size": 4})).unwrap();
        assert_eq!(block.kind, 0);
        assert!(!block.is_live());
    }

    #[test]
    fn test_block_requires_address_and_size() {
        assert!(Block::from_value(json!({"type": 1, "size": 4})).is_err());
        assert!(Block::from_value(json!({"type": 1, "address": -5, "size": 4})).is_err());
    }
}
