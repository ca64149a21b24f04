//! Lexer (tokenizer) for snapshot JSON
//!
//! Converts raw snapshot text into a flat [`Token`] stream consumed by the
//! lenient parser. Unlike a conforming JSON tokenizer this lexer never fails:
//! bytes that cannot start a token become [`Token::Unknown`] and an
//! unterminated string at the end of a truncated file becomes
//! [`Token::Unterminated`], so the parser can decide how much to recover.

use std::fmt;

/// Line/column of a token, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Str(String, SourceLocation),
    /// Raw number text, validated when the parser converts it
    Number(String, SourceLocation),
    True(SourceLocation),
    False(SourceLocation),
    Null(SourceLocation),

    // Punctuation
    LBrace(SourceLocation),   // {
    RBrace(SourceLocation),   // }
    LBracket(SourceLocation), // [
    RBracket(SourceLocation), // ]
    Colon(SourceLocation),    // :
    Comma(SourceLocation),    // ,

    // Recovery
    Unknown(char, SourceLocation),
    Unterminated(SourceLocation),

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Str(_, loc)
            | Token::Number(_, loc)
            | Token::Unknown(_, loc)
            | Token::True(loc)
            | Token::False(loc)
            | Token::Null(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Colon(loc)
            | Token::Comma(loc)
            | Token::Unterminated(loc)
            | Token::Eof(loc) => *loc,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s, _) => write!(f, "string \"{}\"", s),
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::True(_) => write!(f, "'true'"),
            Token::False(_) => write!(f, "'false'"),
            Token::Null(_) => write!(f, "'null'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Colon(_) => write!(f, "':'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Unknown(c, _) => write!(f, "unexpected character {:?}", c),
            Token::Unterminated(_) => write!(f, "unterminated string"),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Lexer for snapshot text
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given snapshot text.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input. Always ends with [`Token::Eof`].
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::Eof(self.current_location()));
                break;
            }

            let token = self.next_token();
            let unterminated = matches!(token, Token::Unterminated(_));
            tokens.push(token);
            if unterminated {
                // The string swallowed the rest of the input
                tokens.push(Token::Eof(self.current_location()));
                break;
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Token {
        let loc = self.current_location();
        let Some(ch) = self.advance() else {
            return Token::Eof(loc);
        };

        match ch {
            '{' => Token::LBrace(loc),
            '}' => Token::RBrace(loc),
            '[' => Token::LBracket(loc),
            ']' => Token::RBracket(loc),
            ':' => Token::Colon(loc),
            ',' => Token::Comma(loc),
            '"' => self.string_literal(loc),
            '-' | '0'..='9' => self.number_literal(ch, loc),
            'a'..='z' | 'A'..='Z' => self.word(ch, loc),
            other => Token::Unknown(other, loc),
        }
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Token {
        let mut value = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Token::Str(value, loc),
                '\\' => match self.advance() {
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('/') => value.push('/'),
                    Some('b') => value.push('\u{0008}'),
                    Some('f') => value.push('\u{000c}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('u') => value.push(self.unicode_escape()),
                    // Unknown escapes are kept literally
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                _ => value.push(ch),
            }
        }

        Token::Unterminated(loc)
    }

    /// Decode the `XXXX` of a `\uXXXX` escape, joining surrogate pairs.
    /// Malformed escapes decode to U+FFFD.
    fn unicode_escape(&mut self) -> char {
        let Some(high) = self.hex4() else {
            return char::REPLACEMENT_CHARACTER;
        };

        if (0xD800..0xDC00).contains(&high) {
            if self.peek() == Some('\\') && self.peek_ahead(1) == Some('u') {
                self.advance();
                self.advance();
                if let Some(low) = self.hex4() {
                    if (0xDC00..0xE000).contains(&low) {
                        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        return char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
                    }
                }
            }
            return char::REPLACEMENT_CHARACTER;
        }

        char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn hex4(&mut self) -> Option<u32> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = self.peek()?.to_digit(16)?;
            self.advance();
            code = code * 16 + digit;
        }
        Some(code)
    }

    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut text = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '+' | '-') {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::Number(text, loc)
    }

    fn word(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut text = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match text.as_str() {
            "true" => Token::True(loc),
            "false" => Token::False(loc),
            "null" => Token::Null(loc),
            _ => Token::Unknown(first, loc),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '\u{feff}' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}
