//! Lexes one preprocessing token per pull from a character buffer, with
//! line splicing and comment handling.

use std::mem;

use symbol_table::GlobalSymbol as Symbol;

use crate::error::{ErrorKind, ParseError};
use crate::position::Position;
use crate::pp::stream::TokenSource;
use crate::pp::token::{PUNCTUATORS, Token, TokenKind};

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_oct_digit(c: char) -> bool {
    ('0'..='7').contains(&c)
}

pub struct Tokenizer {
    chars: Vec<char>,
    idx: usize,
    pos: Position,
    /// Start of the token currently being accumulated.
    start: Position,
    buf: String,
    /// CR flip-flop: a LF directly after a CR does not count a second
    /// newline, so CR, LF and CRLF all advance one line.
    has_return: bool,
}

/// Cursor state for cheap rollback in multi-character matches.
#[derive(Clone, Copy)]
struct Checkpoint {
    idx: usize,
    pos: Position,
    has_return: bool,
}

impl Tokenizer {
    pub fn new(text: &str, file: Symbol) -> Self {
        Tokenizer {
            chars: text.chars().collect(),
            idx: 0,
            pos: Position::new(file),
            start: Position::new(file),
            buf: String::new(),
            has_return: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn at_end(&self) -> bool {
        self.idx >= self.chars.len()
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            idx: self.idx,
            pos: self.pos,
            has_return: self.has_return,
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        self.idx = cp.idx;
        self.pos = cp.pos;
        self.has_return = cp.has_return;
    }

    /// Consumes one character, updating the position. No splicing.
    fn advance_raw(&mut self) {
        let Some(c) = self.peek() else { return };
        self.idx += 1;
        if c == '\r' {
            self.has_return = true;
            self.pos.new_line();
        } else if c == '\n' {
            if self.has_return {
                self.has_return = false;
            } else {
                self.pos.new_line();
            }
        } else {
            self.pos.col += 1;
            self.has_return = false;
        }
        self.pos.offset += c.len_utf8() as u32;
    }

    /// Removes any `\`-newline pairs at the cursor. A `\` not followed by
    /// CR or LF stays put.
    fn splice_line(&mut self) {
        while self.peek() == Some('\\') {
            let cp = self.checkpoint();
            self.advance_raw();
            match self.peek() {
                Some('\r') => {
                    self.advance_raw();
                    if self.peek() == Some('\n') {
                        self.advance_raw();
                    }
                }
                Some('\n') => self.advance_raw(),
                _ => {
                    self.restore(cp);
                    break;
                }
            }
        }
    }

    fn advance(&mut self) {
        self.advance_raw();
        self.splice_line();
    }

    /// Matches a single character, appending it to the token buffer when
    /// `output` is set.
    fn try_ch(&mut self, c: char, output: bool) -> bool {
        if self.peek() == Some(c) {
            if output {
                self.buf.push(c);
            }
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_ch_raw(&mut self, c: char, output: bool) -> bool {
        if self.peek() == Some(c) {
            if output {
                self.buf.push(c);
            }
            self.advance_raw();
            true
        } else {
            false
        }
    }

    /// Matches a full string or consumes nothing. `raw` disables splicing
    /// (raw-string close sequences).
    fn try_str(&mut self, s: &str, output: bool, raw: bool) -> bool {
        let cp = self.checkpoint();
        for c in s.chars() {
            let matched = if raw {
                self.try_ch_raw(c, false)
            } else {
                self.try_ch(c, false)
            };
            if !matched {
                self.restore(cp);
                return false;
            }
        }
        if output {
            self.buf.push_str(s);
        }
        true
    }

    fn start_token(&mut self) {
        self.start = self.pos;
        self.buf.clear();
    }

    fn token(&mut self, kind: TokenKind) -> Token {
        Token::new(kind, mem::take(&mut self.buf), self.start)
    }

    /// Whitespace and comments. Block and line comments collapse to a
    /// single space; newlines inside comments do not set the flag.
    fn parse_space(&mut self) -> Result<Option<Token>, ParseError> {
        let mut has_newline = false;
        while !self.at_end() {
            if self.try_str("/*", false, false) {
                self.buf.push(' ');
                while !self.try_str("*/", false, false) {
                    if self.at_end() {
                        return Err(ErrorKind::UnterminatedComment.at(self.pos));
                    }
                    self.advance();
                }
            } else if self.try_str("//", false, false) {
                self.buf.push(' ');
                while let Some(c) = self.peek() {
                    if c == '\r' || c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if self.try_ch('\r', true) || self.try_ch('\n', true) {
                has_newline = true;
            } else if self.try_ch(' ', true) || self.try_ch('\t', true) {
            } else {
                break;
            }
        }
        if self.buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Token::whitespace(
                mem::take(&mut self.buf),
                self.start,
                has_newline,
            )))
        }
    }

    fn parse_id(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if is_id_char(c) {
                self.buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.token(TokenKind::Identifier)
    }

    /// A preprocessing number: digit or `.`digit, then any run of id
    /// characters, `.`, `'`-separated digits, and signed exponents. A lone
    /// `.` falls back to the punctuator matcher.
    fn parse_number(&mut self) -> Result<Token, ParseError> {
        let cp = self.checkpoint();
        if self.try_ch('.', true) {
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    self.buf.push(c);
                    self.advance();
                }
                _ => {
                    self.restore(cp);
                    self.buf.clear();
                    return Ok(self.parse_punc());
                }
            }
        } else {
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    self.buf.push(c);
                    self.advance();
                }
                _ => return Err(ErrorKind::expected("digit").at(self.pos)),
            }
        }
        while !self.at_end() {
            if self.try_ch('E', true) || self.try_ch('e', true) {
                if !self.try_ch('+', true) {
                    self.try_ch('-', true);
                }
            } else if self.try_ch('\'', true) {
                match self.peek() {
                    Some(c) if is_id_char(c) => {
                        self.buf.push(c);
                        self.advance();
                    }
                    Some(c) => return Err(ErrorKind::Unexpected(c).at(self.pos)),
                    None => return Err(ErrorKind::expected("digit").at(self.pos)),
                }
            } else {
                match self.peek() {
                    Some(c) if is_id_char(c) || c == '.' => {
                        self.buf.push(c);
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        Ok(self.token(TokenKind::Number))
    }

    fn parse_punc(&mut self) -> Token {
        for punc in PUNCTUATORS {
            if self.try_str(punc, false, false) {
                return Token::punc(punc, self.start);
            }
        }
        // not in the op-or-punc set: pass the byte through on its own
        if let Some(c) = self.peek() {
            self.buf.push(c);
            self.advance();
        }
        self.token(TokenKind::Punctuator)
    }

    fn hex(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                self.buf.push(c);
                self.advance();
                Ok(())
            }
            _ => Err(ErrorKind::expected("hexadecimal digit").at(self.pos)),
        }
    }

    /// Validates and accumulates one escape sequence; the `\` is already
    /// in the buffer.
    fn parse_escape(&mut self) -> Result<(), ParseError> {
        if self.try_ch('\'', true)
            || self.try_ch('"', true)
            || self.try_ch('?', true)
            || self.try_ch('\\', true)
            || self.try_ch('a', true)
            || self.try_ch('b', true)
            || self.try_ch('f', true)
            || self.try_ch('n', true)
            || self.try_ch('r', true)
            || self.try_ch('t', true)
            || self.try_ch('v', true)
        {
            Ok(())
        } else if self.try_ch('u', true) {
            for _ in 0..4 {
                self.hex()?;
            }
            Ok(())
        } else if self.try_ch('U', true) {
            for _ in 0..8 {
                self.hex()?;
            }
            Ok(())
        } else if self.try_ch('x', true) {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    while let Some(c) = self.peek() {
                        if c.is_ascii_hexdigit() {
                            self.buf.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    Ok(())
                }
                Some(c) => Err(ErrorKind::Unexpected(c).at(self.pos)),
                None => Err(ErrorKind::expected("hexadecimal digit").at(self.pos)),
            }
        } else {
            match self.peek() {
                Some(c) if is_oct_digit(c) => {
                    for _ in 0..3 {
                        match self.peek() {
                            Some(c) if is_oct_digit(c) => {
                                self.buf.push(c);
                                self.advance();
                            }
                            _ => break,
                        }
                    }
                    Ok(())
                }
                Some(c) => Err(ErrorKind::Unexpected(c).at(self.pos)),
                None => Err(ErrorKind::InvalidEscape.at(self.pos)),
            }
        }
    }

    fn parse_char_sequence(&mut self, quote: char, kind: TokenKind) -> Result<Token, ParseError> {
        if !self.try_ch(quote, true) {
            return Err(ErrorKind::expected(quote.to_string()).at(self.pos));
        }
        loop {
            if self.try_ch('\\', true) {
                self.parse_escape()?;
            } else if self.try_ch(quote, true) {
                return Ok(self.token(kind));
            } else {
                match self.peek() {
                    Some('\r') | Some('\n') | None => {
                        return Err(ErrorKind::UnterminatedString.at(self.pos));
                    }
                    Some(c) => {
                        self.buf.push(c);
                        self.advance();
                    }
                }
            }
        }
    }

    /// `R"dchars(body)dchars"`. The body is taken verbatim: no escapes and
    /// no line splicing until the stored close sequence reappears.
    fn parse_raw_string(&mut self) -> Result<Token, ParseError> {
        if !self.try_ch_raw('"', true) {
            return Err(ErrorKind::expected("\"").at(self.pos));
        }
        let mut dchars = String::new();
        loop {
            if self.try_ch_raw('(', true) {
                let indicator = format!("){}\"", dchars);
                loop {
                    if self.try_str(&indicator, true, true) {
                        return Ok(self.token(TokenKind::String));
                    }
                    match self.peek() {
                        Some(c) => {
                            self.buf.push(c);
                            self.advance_raw();
                        }
                        None => return Err(ErrorKind::UnterminatedRawString.at(self.pos)),
                    }
                }
            }
            match self.peek() {
                Some(c @ (' ' | ')' | '\\' | '\t' | '\x0c' | '\r' | '\n')) => {
                    return Err(ErrorKind::Unexpected(c).at(self.pos));
                }
                Some(c) => {
                    self.buf.push(c);
                    dchars.push(c);
                    self.advance_raw();
                }
                None => return Err(ErrorKind::UnterminatedRawString.at(self.pos)),
            }
        }
    }
}

impl TokenSource for Tokenizer {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        if self.at_end() {
            return Ok(None);
        }
        self.start_token();
        if let Some(space) = self.parse_space()? {
            return Ok(Some(space));
        }
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };
        if c == '.' || c.is_ascii_digit() {
            return self.parse_number().map(Some);
        }
        if matches!(c, 'u' | 'U' | 'L' | 'R') {
            let cp = self.checkpoint();
            self.buf.push(c);
            self.advance();
            let mut need_string = false;
            let is_raw = if c == 'R' {
                true
            } else {
                need_string = c == 'u' && self.try_ch('8', true);
                self.try_ch('R', true)
            };
            return match self.peek() {
                Some('"') => {
                    if is_raw {
                        self.parse_raw_string().map(Some)
                    } else {
                        self.parse_char_sequence('"', TokenKind::String).map(Some)
                    }
                }
                Some('\'') => {
                    if is_raw || need_string {
                        return Err(ErrorKind::expected("\"").at(self.pos));
                    }
                    self.parse_char_sequence('\'', TokenKind::Character).map(Some)
                }
                _ => {
                    self.restore(cp);
                    self.buf.clear();
                    Ok(Some(self.parse_id()))
                }
            };
        }
        if c == '"' {
            return self.parse_char_sequence('"', TokenKind::String).map(Some);
        }
        if c == '\'' {
            return self.parse_char_sequence('\'', TokenKind::Character).map(Some);
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(Some(self.parse_id()));
        }
        Ok(Some(self.parse_punc()))
    }

    fn finished(&self) -> bool {
        self.at_end()
    }

    fn position(&self) -> Position {
        self.pos
    }
}
