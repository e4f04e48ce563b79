use symbol_table::GlobalSymbol as Symbol;

use super::*;
use crate::error::ErrorKind;

fn lex(src: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(src, Symbol::new("<test>"));
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token().expect("lexing failed") {
        tokens.push(token);
    }
    tokens
}

fn lex_err(src: &str) -> ErrorKind {
    let mut tokenizer = Tokenizer::new(src, Symbol::new("<test>"));
    loop {
        match tokenizer.next_token() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("expected a lexing error for {:?}", src),
            Err(err) => return err.kind,
        }
    }
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Whitespace { .. } => "Whitespace",
        TokenKind::Identifier => "Identifier",
        TokenKind::Number => "Number",
        TokenKind::Character => "Character",
        TokenKind::String => "String",
        TokenKind::Punctuator => "Punctuator",
        TokenKind::Other => "Other",
    }
}

/// Asserts the exact (kind, text) sequence of a token list.
macro_rules! assert_tokens {
    ($tokens:expr, $( $kind:ident : $text:expr ),* $(,)?) => {{
        let tokens = &$tokens;
        let expected: Vec<(&str, &str)> = vec![$( (stringify!($kind), $text) ),*];
        assert_eq!(
            tokens.len(),
            expected.len(),
            "token count mismatch: {:?}",
            tokens.iter().map(|t| &t.text).collect::<Vec<_>>()
        );
        for (i, (token, (kind, text))) in tokens.iter().zip(expected.iter()).enumerate() {
            assert_eq!(
                (kind_name(token.kind), token.text.as_str()),
                (*kind, *text),
                "token {} mismatch",
                i
            );
        }
    }};
}

#[test]
fn identifiers_and_punctuation() {
    let tokens = lex("int x2 = 42;");
    assert_tokens!(
        tokens,
        Identifier: "int",
        Whitespace: " ",
        Identifier: "x2",
        Whitespace: " ",
        Punctuator: "=",
        Whitespace: " ",
        Number: "42",
        Punctuator: ";",
    );
}

#[test]
fn preprocessing_numbers() {
    let tokens = lex("1.5 0x1F 1'000 .5 1e+3 2f");
    let numbers: Vec<&str> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Number)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(numbers, vec!["1.5", "0x1F", "1'000", ".5", "1e+3", "2f"]);
}

#[test]
fn lone_dot_is_a_punctuator() {
    let tokens = lex("a.b ... .*");
    assert_tokens!(
        tokens,
        Identifier: "a",
        Punctuator: ".",
        Identifier: "b",
        Whitespace: " ",
        Punctuator: "...",
        Whitespace: " ",
        Punctuator: ".*",
    );
}

#[test]
fn punctuators_match_longest_first() {
    let tokens = lex("->*->>>=%:%<<=");
    assert_tokens!(
        tokens,
        Punctuator: "->*",
        Punctuator: "->",
        Punctuator: ">>=",
        Punctuator: "%:%",
        Punctuator: "<<=",
    );
}

#[test]
fn unknown_bytes_pass_through() {
    let tokens = lex("a@b");
    assert_tokens!(tokens, Identifier: "a", Punctuator: "@", Identifier: "b");
}

#[test]
fn block_comment_collapses_to_space() {
    let tokens = lex("a/*x\ny*/b");
    assert_tokens!(tokens, Identifier: "a", Whitespace: " ", Identifier: "b");
    // the newline lived inside the comment; the run carries no line break
    assert!(!tokens[1].has_newline());
}

#[test]
fn line_comment_runs_to_newline() {
    let tokens = lex("a // hey\nb");
    assert_tokens!(tokens, Identifier: "a", Whitespace: "  \n", Identifier: "b");
    assert!(tokens[1].has_newline());
}

#[test]
fn line_splice_joins_identifiers() {
    let tokens = lex("ab\\\ncd");
    assert_tokens!(tokens, Identifier: "abcd");
}

#[test]
fn line_splice_with_crlf_and_consecutive_splices() {
    let tokens = lex("a\\\r\n\\\nb");
    assert_tokens!(tokens, Identifier: "ab");
}

#[test]
fn line_splice_inside_punctuator() {
    let tokens = lex("-\\\n>");
    assert_tokens!(tokens, Punctuator: "->");
}

#[test]
fn backslash_without_newline_is_ordinary() {
    let tokens = lex("a\\b");
    assert_tokens!(tokens, Identifier: "a", Punctuator: "\\", Identifier: "b");
}

#[test]
fn string_and_character_literals() {
    let tokens = lex("\"hi\\n\" u8\"x\" L'a' '\\x41'");
    assert_tokens!(
        tokens,
        String: "\"hi\\n\"",
        Whitespace: " ",
        String: "u8\"x\"",
        Whitespace: " ",
        Character: "L'a'",
        Whitespace: " ",
        Character: "'\\x41'",
    );
}

#[test]
fn prefix_without_quote_is_an_identifier() {
    let tokens = lex("u8x LR Rx");
    assert_tokens!(
        tokens,
        Identifier: "u8x",
        Whitespace: " ",
        Identifier: "LR",
        Whitespace: " ",
        Identifier: "Rx",
    );
}

#[test]
fn raw_string_survives_byte_exact() {
    let src = r#"R"x(hello "(" world)x""#;
    let tokens = lex(src);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].text, src);
}

#[test]
fn raw_string_disables_splicing() {
    let src = "R\"(a\\\nb)\"";
    let tokens = lex(src);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].text, src);
}

#[test]
fn positions_track_lines_and_columns() {
    let tokens = lex("a\nbc d");
    assert_eq!((tokens[0].pos.line, tokens[0].pos.col), (1, 0));
    assert_eq!((tokens[2].pos.line, tokens[2].pos.col), (2, 0));
    assert_eq!((tokens[4].pos.line, tokens[4].pos.col), (2, 3));
}

#[test]
fn crlf_counts_one_newline() {
    let tokens = lex("a\r\nb");
    assert_eq!(tokens[1].text, "\r\n");
    assert!(tokens[1].has_newline());
    assert_eq!(tokens[2].pos.line, 2);
}

#[test]
fn cr_only_counts_one_newline() {
    let tokens = lex("a\rb");
    assert!(tokens[1].has_newline());
    assert_eq!(tokens[2].pos.line, 2);
}

#[test]
fn unterminated_comment_errors() {
    assert_eq!(lex_err("/* abc"), ErrorKind::UnterminatedComment);
}

#[test]
fn newline_in_string_errors() {
    assert_eq!(lex_err("\"abc\ndef\""), ErrorKind::UnterminatedString);
}

#[test]
fn unterminated_raw_string_errors() {
    assert_eq!(lex_err("R\"x(body)y\""), ErrorKind::UnterminatedRawString);
}

#[test]
fn raw_character_literal_errors() {
    assert_eq!(lex_err("R'a'"), ErrorKind::expected("\""));
    assert_eq!(lex_err("u8'a'"), ErrorKind::expected("\""));
}

#[test]
fn invalid_escape_errors() {
    assert_eq!(lex_err("'\\q'"), ErrorKind::Unexpected('q'));
    assert_eq!(lex_err("'\\xg'"), ErrorKind::Unexpected('g'));
}
