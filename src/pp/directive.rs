//! Interpretation of `#`-prefixed control lines: conditional inclusion,
//! macro definition and removal, and file inclusion.

use std::rc::Rc;

use symbol_table::GlobalSymbol as Symbol;

use crate::error::{ErrorKind, ParseError};
use crate::file::FileOpener;
use crate::position::Position;
use crate::pp::condition;
use crate::pp::expander::MacroExpander;
use crate::pp::macros::{Macro, MacroStack, MacroTable, VA_ARGS};
use crate::pp::stream::{TokenSource, TokenStream};
use crate::pp::token::{Token, TokenKind};
use crate::pp::tokenizer::Tokenizer;

pub const MAX_INCLUDE_RECURSION: usize = 15;

/// State of one open `#if` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IfState {
    /// Condition held; tokens are emitted.
    Active,
    /// No branch has held yet; skipping, but a later `#elif` may
    /// activate.
    Inactive,
    /// A branch already emitted; every later `#elif`/`#else` skips.
    Done,
    /// Opened inside an outer skipped region; inert until `#endif`.
    SkipNested,
    /// `#else` after a skipped chain; emitting.
    ElseActive,
    /// `#else` after an emitted branch; skipping.
    ElseSkip,
    /// `#else` inside an outer skipped region.
    ElseNested,
}

/// Assembles the Tokenizer → DirectiveParser → MacroExpander pipeline
/// over one source buffer. Included files get the same shape, nested.
pub fn pipeline(
    text: &str,
    file: Symbol,
    macros: MacroTable,
    stack: MacroStack,
    depth: usize,
    opener: Rc<dyn FileOpener>,
) -> MacroExpander {
    let tokenizer = Tokenizer::new(text, file);
    let stream = TokenStream::new(Box::new(tokenizer));
    let directives = DirectiveParser::new(stream, macros.clone(), stack.clone(), file, depth, opener);
    MacroExpander::new(TokenStream::new(Box::new(directives)), macros, stack)
}

pub struct DirectiveParser {
    input: TokenStream,
    macros: MacroTable,
    stack: MacroStack,
    /// Sub-pipeline of the file currently being included; takes
    /// precedence until it runs dry.
    included: Option<Box<MacroExpander>>,
    if_stack: Vec<IfState>,
    line_start: bool,
    file: Symbol,
    depth: usize,
    opener: Rc<dyn FileOpener>,
}

impl DirectiveParser {
    pub fn new(
        input: TokenStream,
        macros: MacroTable,
        stack: MacroStack,
        file: Symbol,
        depth: usize,
        opener: Rc<dyn FileOpener>,
    ) -> Self {
        DirectiveParser {
            input,
            macros,
            stack,
            included: None,
            if_stack: Vec::new(),
            line_start: true,
            file,
            depth,
            opener,
        }
    }

    fn next(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(included) = self.included.as_mut() {
            if let Some(token) = included.next_expanded()? {
                return Ok(Some(token));
            }
            self.included = None;
        }
        if self.line_start {
            if let Some(sharp) = self.input.match_punc("#")? {
                return self.parse_directive(sharp);
            }
        }
        self.line_start = false;
        if self.should_ignore() {
            return self.skip_line();
        }
        let token = self.input.next()?;
        if let Some(t) = &token {
            if t.has_newline() {
                self.line_start = true;
            }
        }
        Ok(token)
    }

    fn parse_directive(&mut self, sharp: Token) -> Result<Option<Token>, ParseError> {
        let pos = sharp.pos;
        self.input.space(false)?;
        // the conditional directives balance the stack even inside a
        // skipped region
        if self.input.match_id("if")?.is_some() {
            self.parse_if(false, false, pos)
        } else if self.input.match_id("ifdef")?.is_some() {
            self.parse_if(true, false, pos)
        } else if self.input.match_id("ifndef")?.is_some() {
            self.parse_if(true, true, pos)
        } else if self.input.match_id("elif")?.is_some() {
            self.parse_elif(pos)
        } else if self.input.match_id("else")?.is_some() {
            self.parse_else(pos)
        } else if self.input.match_id("endif")?.is_some() {
            self.parse_endif(pos)
        } else if self.should_ignore() {
            self.skip_line()
        } else if self.input.match_id("define")?.is_some() {
            self.input.space(false)?;
            self.parse_define()
        } else if self.input.match_id("undef")?.is_some() {
            self.input.space(false)?;
            self.parse_undef()
        } else if self.input.match_id("include")?.is_some() {
            self.input.space(false)?;
            self.parse_include(pos)
        } else {
            // #pragma, #line, #error, … and the null directive
            self.skip_line()
        }
    }

    fn should_ignore(&self) -> bool {
        !matches!(
            self.if_stack.last(),
            None | Some(IfState::Active) | Some(IfState::ElseActive)
        )
    }

    /// Swallows the rest of the line, keeping only its newline.
    fn skip_line(&mut self) -> Result<Option<Token>, ParseError> {
        while let Some(token) = self.input.next()? {
            if token.has_newline() {
                self.line_start = true;
                return Ok(truncate_line(Some(token)));
            }
        }
        Ok(None)
    }

    /// Collects the directive body up to (not including) the newline,
    /// trimming whitespace at both ends.
    fn read_line(&mut self, allow_va_args: bool) -> Result<Vec<Token>, ParseError> {
        let mut line = Vec::new();
        self.line_start = false;
        while let Some(token) = self.input.next()? {
            if token.has_newline() {
                self.input.unget(token);
                self.line_start = true;
                break;
            }
            if !allow_va_args && token.is_identifier(VA_ARGS) {
                return Err(ErrorKind::UnexpectedVaArgs.at(token.pos));
            }
            line.push(token);
        }
        while line.last().map_or(false, |t| t.is_whitespace()) {
            line.pop();
        }
        while line.first().map_or(false, |t| t.is_whitespace()) {
            line.remove(0);
        }
        Ok(line)
    }

    /// `#if`, `#ifdef` (`defined`, `negate=false`) and `#ifndef`.
    fn parse_if(
        &mut self,
        defined: bool,
        negate: bool,
        pos: Position,
    ) -> Result<Option<Token>, ParseError> {
        self.input.space(false)?;
        let cond = if defined {
            let name = self.input.expect_id()?;
            self.macros.contains(Symbol::new(&name.text)) != negate
        } else {
            let line = self.read_line(false)?;
            condition::evaluate(line, self.macros.clone(), self.stack.clone(), pos)?.is_truthy()
        };
        let state = if self.should_ignore() {
            IfState::SkipNested
        } else if cond {
            IfState::Active
        } else {
            IfState::Inactive
        };
        self.if_stack.push(state);
        let end = self.input.expect_new_line()?;
        Ok(truncate_line(end))
    }

    fn parse_elif(&mut self, pos: Position) -> Result<Option<Token>, ParseError> {
        self.input.space(false)?;
        let line = self.read_line(false)?;
        // parsed even when it cannot activate, so a malformed expression
        // is diagnosed in every branch
        let cond =
            condition::evaluate(line, self.macros.clone(), self.stack.clone(), pos)?.is_truthy();
        let state = match self.if_stack.last_mut() {
            Some(state) => state,
            None => return Err(ErrorKind::UnexpectedDirective("elif").at(pos)),
        };
        match *state {
            IfState::Active => *state = IfState::Done,
            IfState::Inactive if cond => *state = IfState::Active,
            IfState::Inactive | IfState::Done | IfState::SkipNested => {}
            IfState::ElseActive | IfState::ElseSkip | IfState::ElseNested => {
                return Err(ErrorKind::UnexpectedDirective("elif").at(pos));
            }
        }
        let end = self.input.expect_new_line()?;
        Ok(truncate_line(end))
    }

    fn parse_else(&mut self, pos: Position) -> Result<Option<Token>, ParseError> {
        self.input.space(false)?;
        let state = match self.if_stack.last_mut() {
            Some(state) => state,
            None => return Err(ErrorKind::UnexpectedDirective("else").at(pos)),
        };
        match *state {
            IfState::Active | IfState::Done => *state = IfState::ElseSkip,
            IfState::Inactive => *state = IfState::ElseActive,
            IfState::SkipNested => *state = IfState::ElseNested,
            IfState::ElseActive | IfState::ElseSkip | IfState::ElseNested => {
                return Err(ErrorKind::UnexpectedDirective("else").at(pos));
            }
        }
        let end = self.input.expect_new_line()?;
        Ok(truncate_line(end))
    }

    fn parse_endif(&mut self, pos: Position) -> Result<Option<Token>, ParseError> {
        self.input.space(false)?;
        if self.if_stack.pop().is_none() {
            return Err(ErrorKind::UnexpectedDirective("endif").at(pos));
        }
        let end = self.input.expect_new_line()?;
        Ok(truncate_line(end))
    }

    fn parse_define(&mut self) -> Result<Option<Token>, ParseError> {
        let name_token = self.input.expect_id()?;
        let name = Symbol::new(&name_token.text);
        log::debug!("#define {}", name_token.text);
        // a parameter list only when `(` follows the name directly
        if self.input.match_punc("(")?.is_some() {
            self.input.space(false)?;
            let mut params: Vec<Symbol> = Vec::new();
            let mut first = true;
            while !self.input.finished() {
                if self.input.match_punc(")")?.is_some() {
                    let body = self.read_line(false)?;
                    self.macros.define(Macro::function(name, params, false, body));
                    let end = self.input.expect_new_line()?;
                    return Ok(truncate_line(end));
                }
                if first {
                    first = false;
                } else {
                    self.input.expect_punc(",")?;
                    self.input.space(false)?;
                }
                if self.input.match_punc("...")?.is_some() {
                    params.push(Symbol::new(VA_ARGS));
                    self.input.space(false)?;
                    self.input.expect_punc(")")?;
                    let body = self.read_line(true)?;
                    self.macros.define(Macro::function(name, params, true, body));
                    let end = self.input.expect_new_line()?;
                    return Ok(truncate_line(end));
                }
                let param = self.input.expect_id()?;
                params.push(Symbol::new(&param.text));
            }
            Err(ErrorKind::expected(")").at(self.input.position()))
        } else {
            match self.input.next()? {
                Some(t) if !t.is_whitespace() => Err(ErrorKind::expected("space").at(t.pos)),
                Some(t) if t.has_newline() => {
                    self.macros.define(Macro::object(name, Vec::new()));
                    Ok(truncate_line(Some(t)))
                }
                Some(_) => {
                    let body = self.read_line(false)?;
                    self.macros.define(Macro::object(name, body));
                    let end = self.input.expect_new_line()?;
                    Ok(truncate_line(end))
                }
                None => {
                    self.macros.define(Macro::object(name, Vec::new()));
                    Ok(None)
                }
            }
        }
    }

    fn parse_undef(&mut self) -> Result<Option<Token>, ParseError> {
        let name = self.input.expect_id()?;
        self.macros.undef(Symbol::new(&name.text));
        let end = self.input.expect_new_line()?;
        Ok(truncate_line(end))
    }

    fn parse_include(&mut self, pos: Position) -> Result<Option<Token>, ParseError> {
        let token = match self.input.next()? {
            Some(token) => token,
            None => return Err(ErrorKind::expected("\" or <").at(self.input.position())),
        };
        if token.kind == TokenKind::String {
            let path = token.text[1..token.text.len() - 1].to_string();
            let space = self.input.expect_new_line()?;
            return self.include(&path, pos, space, true);
        }
        if token.text.starts_with('<') {
            // the path is reassembled from raw tokens up to the closing >
            let mut path = token.text[1..].to_string();
            loop {
                let part = match self.input.next()? {
                    Some(part) => part,
                    None => return Err(ErrorKind::expected(">").at(self.input.position())),
                };
                if part.has_newline() {
                    return Err(ErrorKind::expected(">").at(part.pos));
                }
                match part.text.find('>') {
                    None => path.push_str(&part.text),
                    Some(i) if i + 1 != part.text.len() => {
                        return Err(ErrorKind::UnexpectedToken(part.text[i + 1..].to_string())
                            .at(part.pos + (i + 1)));
                    }
                    Some(i) => {
                        path.push_str(&part.text[..i]);
                        let space = self.input.expect_new_line()?;
                        return self.include(&path, pos, space, false);
                    }
                }
            }
        }
        Err(ErrorKind::expected("\" or <").at(token.pos))
    }

    /// Splices the named file in, or degrades to a passthrough token.
    /// Open failures and the recursion limit are logged, never fatal.
    fn include(
        &mut self,
        path: &str,
        pos: Position,
        space: Option<Token>,
        quoted: bool,
    ) -> Result<Option<Token>, ParseError> {
        if self.depth >= MAX_INCLUDE_RECURSION {
            log::error!("Reached max include recursion depth");
            return Ok(Some(self.passthrough(path, pos, &space, quoted)));
        }
        if quoted {
            let resolved = resolve(self.file.as_str(), path);
            match self.opener.open(&resolved) {
                Ok(text) => {
                    log::debug!("including {}", resolved);
                    let nested = pipeline(
                        &text,
                        Symbol::new(&resolved),
                        self.macros.clone(),
                        self.stack.clone(),
                        self.depth + 1,
                        self.opener.clone(),
                    );
                    self.included = Some(Box::new(nested));
                    return self.next();
                }
                Err(err) => log::error!("Open file failed: {}: {}", resolved, err),
            }
        }
        Ok(Some(self.passthrough(path, pos, &space, quoted)))
    }

    /// Reconstructs the directive line as an `Other` token so the output
    /// stays well-formed for downstream consumers.
    fn passthrough(&self, path: &str, pos: Position, space: &Option<Token>, quoted: bool) -> Token {
        let (open, close) = if quoted { ('"', '"') } else { ('<', '>') };
        let mut text = format!("#include {open}{path}{close}");
        if let Some(space) = space {
            text.push_str(&space.text);
        }
        Token::new(TokenKind::Other, text, pos)
    }
}

impl TokenSource for DirectiveParser {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.next()
    }

    fn finished(&self) -> bool {
        self.included.as_ref().map_or(true, |i| i.finished()) && self.input.finished()
    }

    fn position(&self) -> Position {
        match self.included.as_ref() {
            Some(included) => included.position(),
            None => self.input.position(),
        }
    }
}

/// A consumed directive leaves exactly one whitespace token holding its
/// terminating newline, so line counts stay aligned downstream.
fn truncate_line(token: Option<Token>) -> Option<Token> {
    let token = token?;
    let cut = token.text.find(['\r', '\n']).unwrap_or(0);
    Some(Token::whitespace(
        token.text[cut..].to_string(),
        token.pos,
        true,
    ))
}

/// Quoted-include resolution: absolute paths verbatim, everything else
/// relative to the directory of the including file.
fn resolve(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    match base.rfind('/') {
        Some(i) => format!("{}{}", &base[..=i], path),
        None => path.to_string(),
    }
}
