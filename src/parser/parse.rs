//! Snapshot parse entry point
//!
//! Parsing is two-phase:
//!
//! 1. a strict `serde_json` parse of the whole document, and
//! 2. only if that fails, the [`LenientParser`] scan for zones and blocks.
//!
//! A file fails to parse only when the strict parse fails *and* the lenient
//! scan finds no zone at all.

use super::lenient::LenientParser;
use crate::errors::ParseError;
use crate::snapshot::Snapshot;
use std::path::Path;

/// Which parser produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Strict,
    Lenient { skipped_blocks: usize },
}

/// A parsed snapshot plus how it was recovered
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub snapshot: Snapshot,
    pub mode: ParseMode,
}

/// Parse one snapshot file's text. `path` is only used for diagnostics.
pub fn parse_snapshot(source: &str, path: &Path) -> Result<Parsed, ParseError> {
    let strict_err = match parse_strict(source) {
        Ok(snapshot) => {
            return Ok(Parsed {
                snapshot,
                mode: ParseMode::Strict,
            })
        }
        Err(err) => err,
    };

    log::debug!(
        "strict parse of {} failed ({}), falling back to lenient scan",
        path.display(),
        strict_err
    );

    let recovered = LenientParser::new(source).parse();
    if recovered.zones.is_empty() {
        return Err(ParseError {
            path: path.to_path_buf(),
            source: strict_err,
        });
    }

    let blocks: usize = recovered.zones.iter().map(|z| z.blocks.len()).sum();
    log::warn!(
        "{}: recovered {} zone(s) and {} block(s) leniently, dropped {} malformed record(s)",
        path.display(),
        recovered.zones.len(),
        blocks,
        recovered.skipped_blocks
    );

    Ok(Parsed {
        snapshot: Snapshot {
            zones: recovered.zones,
        },
        mode: ParseMode::Lenient {
            skipped_blocks: recovered.skipped_blocks,
        },
    })
}

/// Strict parse of a well-formed snapshot document
pub fn parse_strict(source: &str) -> Result<Snapshot, serde_json::Error> {
    serde_json::from_str(source)
}

/// Lenient scan only, regardless of whether the text is well-formed
pub fn parse_lenient(source: &str) -> Snapshot {
    Snapshot {
        zones: LenientParser::new(source).parse().zones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BlockKey;

    const WELL_FORMED: &str = r#"{"zones":[
        {"index":0,"name":"DefaultMallocZone","blocks":[
            {"type":1,"address":4096,"size":16,"tag":7},
            {"type":0,"address":8192,"size":32},
            {"type":1,"address":"0x3000","size":"8"}
        ]},
        {"index":1,"name":"GFXMallocZone","blocks":[]}
    ]}"#;

    #[test]
    fn test_well_formed_uses_strict_parse() {
        let parsed = parse_snapshot(WELL_FORMED, Path::new("a.json")).unwrap();

        assert_eq!(parsed.mode, ParseMode::Strict);
        assert_eq!(parsed.snapshot.zones.len(), 2);
        assert_eq!(
            parsed.snapshot.zones[0].blocks[2].key(),
            BlockKey::new(0x3000, 8)
        );
    }

    #[test]
    fn test_lenient_matches_strict_on_well_formed_input() {
        let inputs = [
            WELL_FORMED,
            r#"{"zones":[{"index":0,"name":"Z"},{"index":1,"name":"Y","blocks":[]}]}"#,
            r#"{"zones":[{"index":0,"name":"Z","blocks":[
                {"name":"malloc","type":1,"address":16,"size":4},
                {"index":2,"type":1,"address":32,"size":8},
                {"type":1,"address":64,"size":8}
            ]}]}"#,
        ];

        for source in inputs {
            let strict = parse_strict(source).unwrap();
            let lenient = parse_lenient(source);
            assert_eq!(strict, lenient, "input: {}", source);
        }
    }

    #[test]
    fn test_fallback_keeps_blocks_with_zone_like_keys() {
        let source = r#"{"zones":[{"index":0,"name":"Z","blocks":[
            {"name":"malloc","type":1,"address":16,"size":4},
            {"type":1,"address":32,"size":8},
            {"type":1,"address":64,"size":8},
        ]}]}"#;
        let parsed = parse_snapshot(source, Path::new("e.json")).unwrap();

        assert_eq!(parsed.mode, ParseMode::Lenient { skipped_blocks: 0 });
        assert_eq!(parsed.snapshot.zones[0].blocks.len(), 3);
    }

    #[test]
    fn test_trailing_comma_falls_back_to_lenient() {
        let source = r#"{"zones":[{"index":0,"name":"Z","blocks":[
            {"type":1,"address":16,"size":4},
        ]}]}"#;
        let parsed = parse_snapshot(source, Path::new("b.json")).unwrap();

        assert_eq!(parsed.mode, ParseMode::Lenient { skipped_blocks: 0 });
        assert_eq!(parsed.snapshot.zones[0].blocks.len(), 1);
    }

    #[test]
    fn test_unrecoverable_text_is_parse_error() {
        let err = parse_snapshot("<html>oops</html>", Path::new("dump.7.json")).unwrap_err();

        assert_eq!(err.path, Path::new("dump.7.json"));
        assert!(err.to_string().contains("dump.7.json"));
    }

    #[test]
    fn test_document_without_zones_key_is_parse_error() {
        assert!(parse_snapshot("{}", Path::new("c.json")).is_err());
    }

    #[test]
    fn test_empty_zone_list_is_valid() {
        let parsed = parse_snapshot(r#"{"zones":[]}"#, Path::new("d.json")).unwrap();
        assert!(parsed.snapshot.zones.is_empty());
    }
}
