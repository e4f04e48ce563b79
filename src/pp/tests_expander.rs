use std::rc::Rc;

use super::*;
use crate::driver;
use crate::error::{ErrorKind, ParseError};
use crate::file::FsOpener;

fn try_preprocess(src: &str) -> Result<String, ParseError> {
    let _ = env_logger::try_init();
    driver::preprocess_source(src, "<test>", MacroTable::new(), Rc::new(FsOpener))
}

fn preprocess(src: &str) -> String {
    try_preprocess(src).expect("preprocessing failed")
}

fn preprocess_err(src: &str) -> ErrorKind {
    try_preprocess(src).expect_err("expected a preprocessing error").kind
}

#[test]
fn object_macro_expands() {
    let out = preprocess("#define FOO 42\nint x = FOO;\n");
    assert_eq!(out, "\nint x = 42;\n");
}

#[test]
fn function_macro_with_prescanned_args() {
    let out = preprocess("#define ADD(a,b) ((a)+(b))\n#define ONE 1\nADD(ONE,2)\n");
    assert_eq!(out, "\n\n((1)+(2))\n");
}

#[test]
fn empty_body_expands_to_nothing() {
    let out = preprocess("#define NOTHING\na NOTHING b\n");
    assert_eq!(out, "\na  b\n");
}

#[test]
fn self_recursion_is_guarded() {
    let out = preprocess("#define X X\nX\n");
    assert_eq!(out, "\nX\n");
}

#[test]
fn mutual_recursion_is_guarded() {
    let out = preprocess("#define A B\n#define B A\nA\n");
    assert_eq!(out, "\n\nA\n");
}

#[test]
fn function_macro_without_parens_is_verbatim() {
    let out = preprocess("#define F(x) x\nF + 1\n");
    assert_eq!(out, "\nF + 1\n");
}

#[test]
fn invocation_may_span_lines() {
    let out = preprocess("#define F(x) [x]\nF\n(9)\n");
    assert_eq!(out, "\n[9]\n");
}

#[test]
fn variadic_macro_joins_tail_with_commas() {
    let out = preprocess("#define LOG(fmt, ...) printf(fmt, __VA_ARGS__)\nLOG(\"%d %d\", 1, 2)\n");
    assert_eq!(out, "\nprintf(\"%d %d\", 1, 2)\n");
}

#[test]
fn variadic_tail_may_be_empty() {
    let out = preprocess("#define V(...) [__VA_ARGS__]\nV()\n");
    assert_eq!(out, "\n[]\n");
}

#[test]
fn nested_parens_stay_in_one_argument() {
    let out = preprocess("#define FIRST(a, b) a\nFIRST(f(x, y), z)\n");
    assert_eq!(out, "\nf(x, y)\n");
}

#[test]
fn body_whitespace_collapses() {
    let out = preprocess("#define M a   +   b\nM\n");
    assert_eq!(out, "\na + b\n");
}

#[test]
fn zero_parameter_macro_accepts_empty_invocation() {
    let out = preprocess("#define Z() ok\nZ()\nZ( )\n");
    assert_eq!(out, "\nok\nok\n");
}

#[test]
fn too_few_args() {
    let err = preprocess_err("#define ADD(a,b) a+b\nADD(1)\n");
    assert_eq!(err, ErrorKind::TooFewArgs);
}

#[test]
fn too_many_args() {
    let err = preprocess_err("#define ADD(a,b) a+b\nADD(1,2,3)\n");
    assert_eq!(err, ErrorKind::TooManyArgs);
}

#[test]
fn va_args_outside_a_variadic_body() {
    let err = preprocess_err("__VA_ARGS__\n");
    assert_eq!(err, ErrorKind::UnexpectedVaArgs);
}

#[test]
fn unterminated_invocation() {
    let err = preprocess_err("#define F(x) x\nF(1\n");
    assert_eq!(err, ErrorKind::expected(")"));
}
