//! The uniform token-stream abstraction every pipeline layer implements
//! and consumes.

use std::collections::VecDeque;
use std::mem;

use crate::error::{ErrorKind, ParseError};
use crate::position::Position;
use crate::pp::token::{Token, TokenKind};

/// A producer of preprocessing tokens: produce-next, report-end,
/// report-position. Pushback is not part of the producer; it belongs to
/// the [`TokenStream`] wrapper.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError>;
    fn finished(&self) -> bool;
    fn position(&self) -> Position;
}

/// Pushback wrapper over a [`TokenSource`]. Ungot tokens form a LIFO
/// buffer that is drained before the producer is consulted again, which
/// lets directive code peek arbitrarily far with cheap rollback.
pub struct TokenStream {
    source: Box<dyn TokenSource>,
    pending: Vec<Token>,
}

impl TokenStream {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        TokenStream {
            source,
            pending: Vec::new(),
        }
    }

    pub fn next(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(token) = self.pending.pop() {
            return Ok(Some(token));
        }
        self.source.next_token()
    }

    pub fn unget(&mut self, token: Token) {
        self.pending.push(token);
    }

    pub fn finished(&self) -> bool {
        self.pending.is_empty() && self.source.finished()
    }

    pub fn position(&self) -> Position {
        match self.pending.last() {
            Some(token) => token.pos,
            None => self.source.position(),
        }
    }

    /// Consumes and returns the next token if it has the given kind and
    /// spelling; otherwise leaves the stream untouched.
    pub fn match_token(
        &mut self,
        kind: TokenKind,
        text: &str,
    ) -> Result<Option<Token>, ParseError> {
        match self.next()? {
            Some(token) if mem::discriminant(&token.kind) == mem::discriminant(&kind)
                && token.text == text =>
            {
                Ok(Some(token))
            }
            Some(token) => {
                self.unget(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn match_punc(&mut self, punc: &str) -> Result<Option<Token>, ParseError> {
        self.match_token(TokenKind::Punctuator, punc)
    }

    pub fn match_id(&mut self, name: &str) -> Result<Option<Token>, ParseError> {
        self.match_token(TokenKind::Identifier, name)
    }

    pub fn expect_punc(&mut self, punc: &str) -> Result<Token, ParseError> {
        match self.next()? {
            Some(token) if token.is_punc(punc) => Ok(token),
            Some(token) => Err(ErrorKind::expected(punc).at(token.pos)),
            None => Err(ErrorKind::expected(punc).at(self.position())),
        }
    }

    pub fn expect_id(&mut self) -> Result<Token, ParseError> {
        match self.next()? {
            Some(token) if token.kind == TokenKind::Identifier => Ok(token),
            Some(token) => Err(ErrorKind::expected("identifier").at(token.pos)),
            None => Err(ErrorKind::expected("identifier").at(self.position())),
        }
    }

    /// Requires the next token to carry a line break (or the stream to be
    /// at its end) and returns it.
    pub fn expect_new_line(&mut self) -> Result<Option<Token>, ParseError> {
        match self.next()? {
            Some(token) if token.has_newline() => Ok(Some(token)),
            Some(token) => Err(ErrorKind::expected("new line").at(token.pos)),
            None => Ok(None),
        }
    }

    /// Consumes one whitespace token if present. With `allow_newline`
    /// false, newline-bearing whitespace is left in place.
    pub fn space(&mut self, allow_newline: bool) -> Result<Option<Token>, ParseError> {
        match self.next()? {
            Some(token) if token.is_whitespace() => {
                if !allow_newline && token.has_newline() {
                    self.unget(token);
                    Ok(None)
                } else {
                    Ok(Some(token))
                }
            }
            Some(token) => {
                self.unget(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Replays an in-memory token sequence; backs macro bodies, pre-scanned
/// arguments, and directive lines handed to the condition parser.
pub struct BufferSource {
    tokens: VecDeque<Token>,
    end_pos: Position,
}

impl BufferSource {
    /// `end_pos` is reported once the buffer is drained.
    pub fn new(tokens: Vec<Token>, end_pos: Position) -> Self {
        BufferSource {
            tokens: tokens.into(),
            end_pos,
        }
    }
}

impl TokenSource for BufferSource {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        Ok(self.tokens.pop_front())
    }

    fn finished(&self) -> bool {
        self.tokens.is_empty()
    }

    fn position(&self) -> Position {
        match self.tokens.front() {
            Some(token) => token.pos,
            None => self.end_pos,
        }
    }
}
