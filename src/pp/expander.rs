//! Macro expansion: object-like and function-like substitution with
//! argument pre-scanning and rescan suppression.

use std::mem;

use symbol_table::GlobalSymbol as Symbol;

use crate::error::{ErrorKind, ParseError};
use crate::position::Position;
use crate::pp::macros::{Macro, MacroStack, MacroTable, VA_ARGS};
use crate::pp::stream::{BufferSource, TokenSource, TokenStream};
use crate::pp::token::{Token, TokenKind};

pub struct MacroExpander {
    input: TokenStream,
    macros: MacroTable,
    stack: MacroStack,
    /// Nested expander over the body of the macro currently being
    /// substituted; drained before the input is consulted again.
    inner: Option<Box<MacroExpander>>,
}

impl MacroExpander {
    pub fn new(input: TokenStream, macros: MacroTable, stack: MacroStack) -> Self {
        MacroExpander {
            input,
            macros,
            stack,
            inner: None,
        }
    }

    pub fn next_expanded(&mut self) -> Result<Option<Token>, ParseError> {
        self.pull(true)
    }

    /// Pulls one token with identifier expansion disabled; the condition
    /// parser uses this around the operand of `defined`.
    pub fn next_unexpanded(&mut self) -> Result<Option<Token>, ParseError> {
        self.pull(false)
    }

    fn pull(&mut self, expand: bool) -> Result<Option<Token>, ParseError> {
        if let Some(inner) = self.inner.as_mut() {
            if let Some(token) = inner.next_expanded()? {
                return Ok(Some(token));
            }
            self.inner = None;
        }
        match self.input.next()? {
            Some(token) if expand && token.kind == TokenKind::Identifier => {
                self.expand_identifier(token)
            }
            other => Ok(other),
        }
    }

    /// Expands `name` if it denotes a macro that is not already on the
    /// stack; otherwise the identifier passes through verbatim.
    fn expand_identifier(&mut self, name: Token) -> Result<Option<Token>, ParseError> {
        if name.text == VA_ARGS {
            return Err(ErrorKind::UnexpectedVaArgs.at(name.pos));
        }
        let sym = Symbol::new(&name.text);
        if self.stack.contains(sym) {
            return Ok(Some(name));
        }
        let Some(macro_def) = self.macros.get(sym) else {
            return Ok(Some(name));
        };
        if macro_def.is_function_like() {
            self.expand_function(name, &macro_def)
        } else {
            self.expand_object(&macro_def)
        }
    }

    fn push_inner(&mut self, body: Vec<Token>, name: Symbol, end_pos: Position) {
        let stream = TokenStream::new(Box::new(BufferSource::new(body, end_pos)));
        self.inner = Some(Box::new(MacroExpander::new(
            stream,
            self.macros.clone(),
            self.stack.push(name),
        )));
    }

    fn expand_object(&mut self, macro_def: &Macro) -> Result<Option<Token>, ParseError> {
        if let Some(first) = macro_def.body.first() {
            let end_pos = first.pos;
            let mut body = Vec::new();
            let mut ws = false;
            append_tokens(&mut body, &macro_def.body, &mut ws);
            self.push_inner(body, macro_def.name, end_pos);
        }
        self.pull(true)
    }

    fn expand_function(
        &mut self,
        name: Token,
        macro_def: &Macro,
    ) -> Result<Option<Token>, ParseError> {
        let space = self.input.space(true)?;
        if self.input.match_punc("(")?.is_none() {
            // not an invocation after all
            if let Some(space) = space {
                self.input.unget(space);
            }
            return Ok(Some(name));
        }
        log::debug!("expanding function-like macro {}", name.text);
        self.input.space(true)?;
        let mut args: Vec<Vec<Token>> = Vec::new();
        let mut cur: Vec<Token> = Vec::new();
        let mut depth = 0usize;
        loop {
            if let Some(close) = self.input.match_punc(")")? {
                if depth == 0 {
                    args.push(self.scan_arg(mem::take(&mut cur))?);
                    let body = self.substitute(macro_def, &args, name.pos)?;
                    self.push_inner(body, macro_def.name, name.pos);
                    return self.pull(true);
                }
                depth -= 1;
                cur.push(close);
            } else if let Some(open) = self.input.match_punc("(")? {
                depth += 1;
                cur.push(open);
            } else if depth == 0 && self.input.match_punc(",")?.is_some() {
                self.input.space(true)?;
                args.push(self.scan_arg(mem::take(&mut cur))?);
            } else {
                match self.input.next()? {
                    Some(token) => cur.push(token),
                    None => return Err(ErrorKind::expected(")").at(self.input.position())),
                }
            }
        }
    }

    /// Argument pre-scan: the argument is fully expanded in a fresh
    /// sub-expander sharing the table and the current stack, and the
    /// product is what replaces the parameter.
    fn scan_arg(&self, arg: Vec<Token>) -> Result<Vec<Token>, ParseError> {
        let end_pos = match arg.first() {
            Some(token) => token.pos,
            None => self.input.position(),
        };
        let stream = TokenStream::new(Box::new(BufferSource::new(arg, end_pos)));
        let mut expander = MacroExpander::new(stream, self.macros.clone(), self.stack.clone());
        let mut out = Vec::new();
        while let Some(token) = expander.next_expanded()? {
            out.push(token);
        }
        Ok(out)
    }

    /// Builds the replacement body: parameters substituted by their
    /// pre-scanned arguments, `__VA_ARGS__` by the comma-joined tail,
    /// whitespace collapsed.
    fn substitute(
        &self,
        macro_def: &Macro,
        args: &[Vec<Token>],
        call_pos: Position,
    ) -> Result<Vec<Token>, ParseError> {
        let params = macro_def.params();
        let n = params.len();
        let variadic = macro_def.is_variadic();

        // an empty invocation of a zero-parameter macro arrives as one
        // whitespace-only argument
        let trivial =
            n == 0 && args.len() == 1 && args[0].iter().all(|t| t.is_whitespace());
        if !trivial {
            if variadic {
                if args.len() + 1 < n {
                    return Err(ErrorKind::TooFewArgs.at(call_pos));
                }
            } else if args.len() < n {
                return Err(ErrorKind::TooFewArgs.at(call_pos));
            } else if args.len() > n {
                return Err(ErrorKind::TooManyArgs.at(call_pos));
            }
        }

        let mut out = Vec::new();
        let mut ws = false;
        for token in &macro_def.body {
            if token.kind != TokenKind::Identifier {
                append_token(&mut out, token, &mut ws);
            } else if token.text == VA_ARGS {
                if !variadic {
                    return Err(ErrorKind::UnexpectedVaArgs.at(token.pos));
                }
                let comma = Token::punc(",", token.pos);
                for (i, arg) in args.iter().enumerate().skip(n - 1) {
                    if i > n - 1 {
                        append_token(&mut out, &comma, &mut ws);
                        ws = true;
                    }
                    append_tokens(&mut out, arg, &mut ws);
                }
            } else if let Some(i) = params.iter().position(|p| p.as_str() == token.text) {
                append_tokens(&mut out, &args[i], &mut ws);
            } else {
                append_token(&mut out, token, &mut ws);
            }
        }
        Ok(out)
    }

    pub fn finished(&self) -> bool {
        self.inner.as_ref().map_or(true, |inner| inner.finished()) && self.input.finished()
    }

    pub fn position(&self) -> Position {
        match self.inner.as_ref() {
            Some(inner) => inner.position(),
            None => self.input.position(),
        }
    }
}

impl TokenSource for MacroExpander {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.next_expanded()
    }

    fn finished(&self) -> bool {
        MacroExpander::finished(self)
    }

    fn position(&self) -> Position {
        MacroExpander::position(self)
    }
}

/// Appends a token, collapsing whitespace runs to one space and
/// suppressing leading whitespace.
fn append_token(out: &mut Vec<Token>, token: &Token, ws: &mut bool) {
    if token.is_whitespace() {
        *ws = true;
    } else {
        if *ws {
            if !out.is_empty() {
                out.push(Token::whitespace(" ", token.pos, false));
            }
            *ws = false;
        }
        out.push(token.clone());
    }
}

fn append_tokens(out: &mut Vec<Token>, tokens: &[Token], ws: &mut bool) {
    for token in tokens {
        append_token(out, token, ws);
    }
}
