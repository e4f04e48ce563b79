//! Per-file orchestration: pipeline assembly, command-line predefines,
//! and output collection.

use std::rc::Rc;

use symbol_table::GlobalSymbol as Symbol;

use crate::error::ParseError;
use crate::file::{FileOpener, FsOpener};
use crate::pp::directive::pipeline;
use crate::pp::macros::{Macro, MacroStack, MacroTable};
use crate::pp::stream::{TokenSource, TokenStream};
use crate::pp::token::Token;
use crate::pp::tokenizer::Tokenizer;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Preprocesses one source buffer and returns the concatenated token
/// text.
pub fn preprocess_source(
    text: &str,
    file: &str,
    macros: MacroTable,
    opener: Rc<dyn FileOpener>,
) -> Result<String, ParseError> {
    let expander = pipeline(text, Symbol::new(file), macros, MacroStack::new(), 0, opener);
    let mut stream = TokenStream::new(Box::new(expander));
    let mut out = String::new();
    while let Some(token) = stream.next()? {
        out.push_str(&token.text);
    }
    Ok(out)
}

/// Preprocesses one file from disk. Each file gets a fresh macro table.
pub fn preprocess_file(
    path: &str,
    defines: &[(String, Option<String>)],
) -> Result<String, DriverError> {
    let opener: Rc<dyn FileOpener> = Rc::new(FsOpener);
    let text = opener.open(path).map_err(|source| DriverError::Io {
        path: path.to_string(),
        source,
    })?;
    let macros = MacroTable::new();
    apply_defines(&macros, defines);
    Ok(preprocess_source(&text, path, macros, opener)?)
}

/// Installs `-D NAME[=VALUE]` predefinitions; a missing value means `1`.
/// The value is tokenized as a one-line pseudo-file.
pub fn apply_defines(macros: &MacroTable, defines: &[(String, Option<String>)]) {
    for (name, value) in defines {
        let text = value.as_deref().unwrap_or("1");
        match tokenize_all(text) {
            Ok(body) => macros.define(Macro::object(Symbol::new(name), body)),
            Err(err) => log::warn!("ignoring -D {}: {}", name, err),
        }
    }
}

fn tokenize_all(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokenizer = Tokenizer::new(text, Symbol::new("<command line>"));
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token()? {
        tokens.push(token);
    }
    while tokens.last().map_or(false, |t| t.is_whitespace()) {
        tokens.pop();
    }
    while tokens.first().map_or(false, |t| t.is_whitespace()) {
        tokens.remove(0);
    }
    Ok(tokens)
}
