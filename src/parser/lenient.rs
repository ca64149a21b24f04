//! Tolerant recursive-descent parser for damaged snapshot text
//!
//! Snapshot producers may stream their output, get killed half-way, or emit
//! trailing commas. This parser recovers as many zones and blocks as it can:
//!
//! - Zones are found anywhere in the token stream: an object whose first key is
//!   `"index"`, `"name"` or `"blocks"` starts a zone candidate. A zone needs an
//!   index and a name; a missing block list means no blocks.
//! - Each block record is parsed on its own. A record that fails is skipped and
//!   parsing resynchronizes at the next `,` / `]` at record depth, or at the
//!   start of the next zone. Inside a block list only an object with its own
//!   `"blocks": [` member counts as a zone, since block records may carry any
//!   extra keys.
//! - Trailing commas, trailing content after a block list, and truncation are
//!   tolerated; whatever was complete before the damage is kept.
//!
//! Generic JSON values are built as [`serde_json::Value`] and converted with
//! the same serde impls the strict parser uses, so a well-formed file yields
//! the same zones through either path.

use super::lexer::{Lexer, SourceLocation, Token};
use crate::snapshot::{parse_signed, Block, Zone};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Nesting limit for generic values inside a block record
const MAX_DEPTH: usize = 128;

/// Failure to parse one construct; recovered from by resynchronizing
#[derive(Debug)]
pub struct RecoveryError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

impl std::error::Error for RecoveryError {}

/// Outcome of a lenient parse
#[derive(Debug, Default)]
pub struct Recovered {
    pub zones: Vec<Zone>,
    /// Block records that were dropped because they failed to parse
    pub skipped_blocks: usize,
}

pub struct LenientParser {
    tokens: Vec<Token>,
    position: usize,
    skipped_blocks: usize,
}

impl LenientParser {
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            position: 0,
            skipped_blocks: 0,
        }
    }

    /// Scan the whole input for zones
    pub fn parse(mut self) -> Recovered {
        let mut zones = Vec::new();

        while !self.is_at_end() {
            if !self.at_zone_start() {
                self.advance();
                continue;
            }

            let (start, skipped) = (self.position, self.skipped_blocks);
            match self.parse_zone() {
                Ok(zone) => zones.push(zone),
                Err(err) => {
                    log::debug!("skipping zone candidate: {}", err);
                    self.position = start;
                    self.skipped_blocks = skipped;
                    self.advance();
                }
            }
        }

        Recovered {
            zones,
            skipped_blocks: self.skipped_blocks,
        }
    }

    /// Parse one zone object; the current token is its `{`
    fn parse_zone(&mut self) -> Result<Zone, RecoveryError> {
        let open = self.advance().location();
        let mut index = None;
        let mut name = None;
        let mut blocks = None;

        loop {
            match self.peek() {
                Token::RBrace(_) => {
                    self.advance();
                    break;
                }
                Token::Comma(_) => {
                    self.advance();
                }
                Token::Str(key, _) => {
                    let key = key.clone();
                    self.advance();
                    self.expect_colon()?;
                    match key.as_str() {
                        "blocks" => {
                            blocks = Some(self.parse_blocks()?);
                            // Trailing junk after the list: drop it and carry on
                            // with the remaining members, unless a new zone or the
                            // end of input comes first.
                            if !matches!(self.peek(), Token::Comma(_) | Token::RBrace(_)) {
                                self.skip_trailing_junk();
                                if matches!(self.peek(), Token::LBrace(_) | Token::Eof(_)) {
                                    break;
                                }
                            }
                        }
                        "index" => {
                            let value = self.parse_value(0)?;
                            index = Some(parse_signed(&value).ok_or_else(|| {
                                self.error(format!("zone index {} is not an integer", value))
                            })?);
                        }
                        "name" => match self.parse_value(0)? {
                            Value::String(s) => name = Some(s),
                            other => {
                                return Err(self.error(format!("zone name {} is not a string", other)))
                            }
                        },
                        _ => {
                            self.parse_value(0)?;
                        }
                    }
                }
                // Truncated inside the zone: keep what we have
                Token::Eof(_) | Token::Unterminated(_) => break,
                other => {
                    return Err(self.error(format!("unexpected {} in zone header", other)));
                }
            }
        }

        match (index, name) {
            (Some(index), Some(name)) => Ok(Zone {
                index,
                name,
                blocks: blocks.unwrap_or_default(),
            }),
            _ => Err(RecoveryError {
                message: "object is not a zone (needs index and name)".to_string(),
                location: open,
            }),
        }
    }

    /// Parse a block list, skipping records that fail
    fn parse_blocks(&mut self) -> Result<Vec<Block>, RecoveryError> {
        if !matches!(self.peek(), Token::LBracket(_)) {
            return Err(self.error(format!("expected '[' for block list, found {}", self.peek())));
        }
        self.advance();

        let mut blocks = Vec::new();
        loop {
            match self.peek() {
                Token::RBracket(_) => {
                    self.advance();
                    break;
                }
                Token::Comma(_) => {
                    self.advance();
                }
                Token::Eof(_) => break,
                // A new zone starting means this list was cut short
                Token::LBrace(_) if self.at_zone_with_blocks() => break,
                Token::LBrace(_) => {
                    let start = self.position;
                    match self.parse_value(0).map(Block::from_value) {
                        Ok(Ok(block)) => blocks.push(block),
                        Ok(Err(err)) => self.skip_block(&err.to_string()),
                        Err(err) => {
                            self.position = start;
                            self.skip_record();
                            self.skip_block(&err.to_string());
                        }
                    }
                }
                _ => {
                    self.skip_record();
                    self.skip_block("record is not an object");
                }
            }
        }

        Ok(blocks)
    }

    fn skip_block(&mut self, reason: &str) {
        log::debug!("skipping malformed block record: {}", reason);
        self.skipped_blocks += 1;
    }

    /// Skip the remainder of one damaged block record.
    ///
    /// Stops after the record's closing brace, or before a `,` / `]` at record
    /// depth, or before the start of the next zone.
    fn skip_record(&mut self) {
        let mut depth = 0usize;

        loop {
            match self.peek() {
                Token::Eof(_) => return,
                Token::Comma(_) | Token::RBracket(_) if depth == 0 => return,
                Token::LBrace(_) if depth > 0 && self.at_zone_with_blocks() => return,
                Token::LBrace(_) | Token::LBracket(_) => {
                    depth += 1;
                    self.advance();
                }
                Token::RBrace(_) | Token::RBracket(_) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Parse any JSON value, accepting trailing and repeated commas
    fn parse_value(&mut self, depth: usize) -> Result<Value, RecoveryError> {
        if depth > MAX_DEPTH {
            return Err(self.error("value nested too deeply".to_string()));
        }

        let token = self.peek().clone();
        match token {
            Token::LBrace(_) => {
                self.advance();
                let mut map = Map::new();
                loop {
                    match self.peek().clone() {
                        Token::RBrace(_) => {
                            self.advance();
                            return Ok(Value::Object(map));
                        }
                        Token::Comma(_) => {
                            self.advance();
                        }
                        Token::Str(key, _) => {
                            self.advance();
                            self.expect_colon()?;
                            let value = self.parse_value(depth + 1)?;
                            map.insert(key, value);
                        }
                        other => {
                            return Err(self.error(format!("unexpected {} in object", other)));
                        }
                    }
                }
            }
            Token::LBracket(_) => {
                self.advance();
                let mut items = Vec::new();
                loop {
                    match self.peek() {
                        Token::RBracket(_) => {
                            self.advance();
                            return Ok(Value::Array(items));
                        }
                        Token::Comma(_) => {
                            self.advance();
                        }
                        _ => items.push(self.parse_value(depth + 1)?),
                    }
                }
            }
            Token::Str(s, _) => {
                self.advance();
                Ok(Value::String(s))
            }
            Token::Number(text, _) => {
                let number = parse_number(&text)
                    .ok_or_else(|| self.error(format!("invalid number {}", text)))?;
                self.advance();
                Ok(Value::Number(number))
            }
            Token::True(_) => {
                self.advance();
                Ok(Value::Bool(true))
            }
            Token::False(_) => {
                self.advance();
                Ok(Value::Bool(false))
            }
            Token::Null(_) => {
                self.advance();
                Ok(Value::Null)
            }
            other => Err(self.error(format!("expected a value, found {}", other))),
        }
    }

    fn expect_colon(&mut self) -> Result<(), RecoveryError> {
        if matches!(self.peek(), Token::Colon(_)) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected ':', found {}", self.peek())))
        }
    }

    /// `{` followed by a zone key
    fn at_zone_start(&self) -> bool {
        matches!(self.peek(), Token::LBrace(_))
            && matches!(
                self.tokens.get(self.position + 1),
                Some(Token::Str(key, _)) if key == "index" || key == "name" || key == "blocks"
            )
    }

    /// `{` of an object with a `"blocks": [` member of its own.
    ///
    /// Looks ahead to the object's closing brace without consuming anything.
    fn at_zone_with_blocks(&self) -> bool {
        if !matches!(self.peek(), Token::LBrace(_)) {
            return false;
        }

        let mut depth = 0usize;
        let mut tokens = self.tokens[self.position..].iter();
        while let Some(token) = tokens.next() {
            match token {
                Token::LBrace(_) | Token::LBracket(_) => depth += 1,
                Token::RBrace(_) | Token::RBracket(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                Token::Str(key, _) if depth == 1 && key == "blocks" => {
                    let rest: Vec<&Token> = tokens.clone().take(2).collect();
                    if matches!(rest.as_slice(), [Token::Colon(_), Token::LBracket(_)]) {
                        return true;
                    }
                }
                Token::Eof(_) => return false,
                _ => {}
            }
        }
        false
    }

    /// Skip junk after a zone's block list up to the next `,` or `}` at zone
    /// depth, the start of another zone, or the end of input
    fn skip_trailing_junk(&mut self) {
        let mut depth = 0usize;

        loop {
            match self.peek() {
                Token::Eof(_) => return,
                Token::Comma(_) | Token::RBrace(_) if depth == 0 => return,
                Token::LBrace(_) if depth == 0 && self.at_zone_start() => return,
                Token::LBrace(_) | Token::LBracket(_) => {
                    depth += 1;
                    self.advance();
                }
                Token::RBrace(_) | Token::RBracket(_) => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn error(&self, message: String) -> RecoveryError {
        RecoveryError {
            message,
            location: self.peek().location(),
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }
}

/// Convert raw number text the way serde_json would
fn parse_number(text: &str) -> Option<Number> {
    if let Ok(n) = text.parse::<u64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Number::from(n));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}
