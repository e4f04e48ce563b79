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
fn if_elif_else_takes_only_the_first_true_branch() {
    let out = preprocess("#define X 1\n#if X\nA\n#elif 1\nB\n#else\nC\n#endif\n");
    assert_eq!(out.trim(), "A");
}

#[test]
fn elif_activates_when_the_if_was_false() {
    let out = preprocess("#if 0\na\n#elif 1\nb\n#elif 1\nc\n#else\nd\n#endif\n");
    assert_eq!(out.trim(), "b");
}

#[test]
fn else_after_a_false_chain() {
    let out = preprocess("#if 0\na\n#elif 0\nb\n#else\nc\n#endif\n");
    assert_eq!(out.trim(), "c");
}

#[test]
fn else_after_a_taken_branch_skips() {
    let out = preprocess("#if 1\na\n#else\nb\n#endif\n");
    assert_eq!(out.trim(), "a");
}

#[test]
fn nested_groups_inside_a_skipped_region() {
    let out = preprocess("#if 0\n#if 1\na\n#endif\nb\n#else\nc\n#endif\n");
    assert_eq!(out.trim(), "c");
}

#[test]
fn ifdef_and_ifndef() {
    let out = preprocess("#ifdef M\na\n#endif\n#ifndef M\nb\n#endif\n");
    assert_eq!(out.trim(), "b");
    let out = preprocess("#define M\n#ifdef M\na\n#endif\n#ifndef M\nb\n#endif\n");
    assert_eq!(out.trim(), "a");
}

#[test]
fn defined_operator_in_conditions() {
    let out = preprocess("#define Y\n#if defined(Y) && !defined(Z)\nok\n#endif\n");
    assert_eq!(out.trim(), "ok");
}

#[test]
fn skipped_directives_do_not_define() {
    let out = preprocess("#if 0\n#define M 1\n#endif\nM\n");
    assert_eq!(out.trim(), "M");
}

#[test]
fn undef_removes_a_macro() {
    let out = preprocess("#define A 1\n#undef A\nA\n");
    assert_eq!(out.trim(), "A");
}

#[test]
fn undef_of_an_unknown_name_is_silent() {
    let out = preprocess("#undef NEVER_DEFINED\nx\n");
    assert_eq!(out.trim(), "x");
}

#[test]
fn redefinition_silently_replaces() {
    let out = preprocess("#define A 1\n#define A 2\nA\n");
    assert_eq!(out.trim(), "2");
}

#[test]
fn unknown_directives_are_skipped_lines() {
    let out = preprocess("#pragma once\nx\n");
    assert_eq!(out, "\nx\n");
    let out = preprocess("#hello world\nx\n");
    assert_eq!(out, "\nx\n");
}

#[test]
fn null_directive_is_a_skipped_line() {
    let out = preprocess("#\nx\n");
    assert_eq!(out, "\nx\n");
}

#[test]
fn hash_mid_line_is_not_a_directive() {
    let src = "int x; #define A 1\n";
    assert_eq!(preprocess(src), src);
}

#[test]
fn directives_leave_their_newline_behind() {
    // line counts downstream stay aligned
    let out = preprocess("#define A 1\n#define B 2\nA B\n");
    assert_eq!(out, "\n\n1 2\n");
}

#[test]
fn angle_include_passes_through() {
    let out = preprocess("#include <stdio.h>\nx\n");
    assert_eq!(out, "#include <stdio.h>\nx\n");
}

#[test]
fn angle_include_reassembles_path_tokens() {
    let out = preprocess("#include <sys/types.h>\n");
    assert_eq!(out, "#include <sys/types.h>\n");
}

#[test]
fn unresolved_quoted_include_passes_through() {
    let out = preprocess("#include \"definitely_not_a_real_file.h\"\nx\n");
    assert_eq!(out, "#include \"definitely_not_a_real_file.h\"\nx\n");
}

#[test]
fn dangling_endif_errors() {
    assert_eq!(preprocess_err("#endif\n"), ErrorKind::UnexpectedDirective("endif"));
}

#[test]
fn dangling_else_errors() {
    assert_eq!(preprocess_err("#else\n"), ErrorKind::UnexpectedDirective("else"));
}

#[test]
fn dangling_elif_errors() {
    assert_eq!(preprocess_err("#elif 1\n"), ErrorKind::UnexpectedDirective("elif"));
}

#[test]
fn elif_after_else_errors() {
    let err = preprocess_err("#if 1\n#else\n#elif 1\n#endif\n");
    assert_eq!(err, ErrorKind::UnexpectedDirective("elif"));
}

#[test]
fn double_else_errors() {
    let err = preprocess_err("#if 1\n#else\n#else\n#endif\n");
    assert_eq!(err, ErrorKind::UnexpectedDirective("else"));
}

#[test]
fn elif_expression_is_parsed_even_when_discarded() {
    let err = preprocess_err("#if 1\n#elif 1.5\n#endif\n");
    assert_eq!(err, ErrorKind::FloatingPoint);
}

#[test]
fn floating_point_condition_errors() {
    assert_eq!(preprocess_err("#if 1.5\nx\n#endif\n"), ErrorKind::FloatingPoint);
}

#[test]
fn ifdef_needs_an_identifier() {
    assert_eq!(preprocess_err("#ifdef\nx\n#endif\n"), ErrorKind::expected("identifier"));
}

#[test]
fn define_needs_a_space_before_the_body() {
    assert_eq!(preprocess_err("#define A+1\n"), ErrorKind::expected("space"));
}

#[test]
fn va_args_rejected_in_an_object_body() {
    let err = preprocess_err("#define F __VA_ARGS__\n");
    assert_eq!(err, ErrorKind::UnexpectedVaArgs);
}

#[test]
fn variadic_params_must_come_last() {
    let err = preprocess_err("#define F(..., a) x\n");
    assert_eq!(err, ErrorKind::expected(")"));
}

#[test]
fn cr_only_input_is_accepted() {
    let out = preprocess("#define A 1\rA\r");
    assert_eq!(out, "\r1\r");
}

#[test]
fn extra_tokens_after_a_directive_error() {
    let err = preprocess_err("#undef A junk\n");
    assert_eq!(err, ErrorKind::expected("new line"));
}
