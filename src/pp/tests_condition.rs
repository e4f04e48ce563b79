use symbol_table::GlobalSymbol as Symbol;

use super::condition::evaluate;
use super::*;
use crate::error::{ErrorKind, ParseError};
use crate::position::Position;

fn eval_with(expr: &str, macros: &MacroTable) -> Result<MacroValue, ParseError> {
    let file = Symbol::new("<expr>");
    let mut tokenizer = Tokenizer::new(expr, file);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token()? {
        tokens.push(token);
    }
    evaluate(tokens, macros.clone(), MacroStack::new(), Position::new(file))
}

fn eval(expr: &str) -> MacroValue {
    eval_with(expr, &MacroTable::new()).expect("evaluation failed")
}

fn eval_err(expr: &str) -> ErrorKind {
    eval_with(expr, &MacroTable::new())
        .expect_err("expected an evaluation error")
        .kind
}

fn signed(v: i64) -> MacroValue {
    MacroValue::Signed(v)
}

/// A table with `FOO` defined as `0` and `N` as `3`.
fn sample_macros() -> MacroTable {
    let macros = MacroTable::new();
    let pos = Position::new(Symbol::new("<expr>"));
    macros.define(Macro::object(
        Symbol::new("FOO"),
        vec![Token::new(TokenKind::Number, "0", pos)],
    ));
    macros.define(Macro::object(
        Symbol::new("N"),
        vec![Token::new(TokenKind::Number, "3", pos)],
    ));
    macros
}

#[test]
fn precedence() {
    assert_eq!(eval("1+2*3"), signed(7));
    assert_eq!(eval("2*3+4*5"), signed(26));
    assert_eq!(eval("1+2==3"), signed(1));
    assert_eq!(eval("1<<4"), signed(16));
    assert_eq!(eval("1<<2<8"), signed(1));
    assert_eq!(eval("8/2/2"), signed(2));
    assert_eq!(eval("7%4*2"), signed(6));
}

#[test]
fn parenthesized_grouping() {
    assert_eq!(eval("(1+2)*3"), signed(9));
    assert_eq!(eval("((4))"), signed(4));
}

#[test]
fn unary_operators() {
    assert_eq!(eval("-3"), signed(-3));
    assert_eq!(eval("- -3"), signed(3));
    assert_eq!(eval("+ + 5"), signed(5));
    assert_eq!(eval("!0"), signed(1));
    assert_eq!(eval("!7"), signed(0));
    assert_eq!(eval("~0"), signed(-1));
}

#[test]
fn relational_operators() {
    assert_eq!(eval("2 >= 2"), signed(1));
    assert_eq!(eval("1 >= 2"), signed(0));
    assert_eq!(eval("1 <= 2"), signed(1));
    assert_eq!(eval("2 < 2"), signed(0));
    assert_eq!(eval("3 > 2"), signed(1));
}

#[test]
fn ternary_and_comma() {
    assert_eq!(eval("1 ? 2 : 3"), signed(2));
    assert_eq!(eval("0 ? 2 : 3"), signed(3));
    assert_eq!(eval("1 ? 0 ? 5 : 6 : 7"), signed(6));
    assert_eq!(eval("1, 2, 3"), signed(3));
}

#[test]
fn alternative_tokens() {
    assert_eq!(eval("1 and 1"), signed(1));
    assert_eq!(eval("0 or 1"), signed(1));
    assert_eq!(eval("not 0"), signed(1));
    assert_eq!(eval("1 eq 1"), signed(1));
    assert_eq!(eval("2 not_eq 2"), signed(0));
    assert_eq!(eval("3 bitand 1"), signed(1));
    assert_eq!(eval("1 bitor 2"), signed(3));
    assert_eq!(eval("1 xor 3"), signed(2));
}

#[test]
fn number_bases_and_separators() {
    assert_eq!(eval("0x10"), signed(16));
    assert_eq!(eval("0X10"), signed(16));
    assert_eq!(eval("0b101"), signed(5));
    assert_eq!(eval("010"), signed(8));
    assert_eq!(eval("0'17"), signed(15));
    assert_eq!(eval("0"), signed(0));
}

#[test]
fn suffixes_and_promotion() {
    assert_eq!(eval("42L"), signed(42));
    assert_eq!(eval("42U"), MacroValue::Unsigned(42));
    assert_eq!(eval("42UL"), MacroValue::Unsigned(42));
    assert_eq!(eval("42LU"), MacroValue::Unsigned(42));
    // the classic promotion footgun: -1 compares unsigned against 1U
    assert_eq!(eval("-1 < 1U"), signed(0));
    assert_eq!(eval("-1 < 1"), signed(1));
    assert_eq!(eval("0xFFFFFFFFFFFFFFFFU + 1"), MacroValue::Unsigned(0));
}

#[test]
fn character_literals() {
    assert_eq!(eval("'a'"), signed(97));
    assert_eq!(eval("'\\n'"), signed(10));
    assert_eq!(eval("'\\x41'"), signed(65));
    assert_eq!(eval("'\\101'"), signed(65));
    assert_eq!(eval("'ab'"), signed((97 << 8) | 98));
    assert_eq!(eval("u'\\u0041'"), signed(65));
}

#[test]
fn wide_escapes_need_wide_literals() {
    assert_eq!(eval_err("'\\u0041'"), ErrorKind::EscapeNotAllowed('u'));
    assert_eq!(eval_err("u'\\U00000041'"), ErrorKind::EscapeNotAllowed('U'));
}

#[test]
fn true_and_undefined_identifiers() {
    assert_eq!(eval("true"), signed(1));
    assert_eq!(eval("SOME_UNDEFINED_NAME"), signed(0));
    assert_eq!(eval("false"), signed(0));
}

#[test]
fn defined_operator() {
    let macros = sample_macros();
    assert_eq!(eval_with("defined(FOO)", &macros).unwrap(), signed(1));
    assert_eq!(eval_with("defined FOO", &macros).unwrap(), signed(1));
    assert_eq!(eval_with("defined(BAR)", &macros).unwrap(), signed(0));
    // the operand must not be expanded, or FOO would read as 0
    assert_eq!(
        eval_with("defined(FOO) && !defined(BAR)", &macros).unwrap(),
        signed(1)
    );
}

#[test]
fn macros_expand_in_conditions() {
    let macros = sample_macros();
    assert_eq!(eval_with("N * 2", &macros).unwrap(), signed(6));
    assert_eq!(eval_with("FOO", &macros).unwrap(), signed(0));
}

#[test]
fn divide_by_zero() {
    assert_eq!(eval_err("1/0"), ErrorKind::DivideByZero);
    assert_eq!(eval_err("5%0"), ErrorKind::DivideByZero);
}

#[test]
fn floating_point_is_rejected() {
    assert_eq!(eval_err("1.5"), ErrorKind::FloatingPoint);
    assert_eq!(eval_err(".5"), ErrorKind::FloatingPoint);
}

#[test]
fn decimal_overflow_is_rejected() {
    assert_eq!(
        eval_err("99999999999999999999999999"),
        ErrorKind::NumberOutOfRange
    );
}

#[test]
fn malformed_expressions() {
    assert_eq!(eval_err(""), ErrorKind::expected("expression"));
    assert_eq!(eval_err("1 +"), ErrorKind::expected("expression"));
    assert_eq!(eval_err("(1"), ErrorKind::expected(")"));
    assert_eq!(eval_err("1 ? 2"), ErrorKind::expected(":"));
}
