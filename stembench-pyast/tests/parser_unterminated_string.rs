// SPDX-License-Identifier: Apache-2.0

use stembench_pyast::Program;

#[test]
fn unterminated_string_reports_error_with_line() {
    let text = "x = 1\ny = 'abc\n";
    let err = Program::parse(text).expect_err("expected parse error");
    assert_eq!(err.line(), 2);
    assert!(
        err.to_string().contains("unterminated string literal"),
        "unexpected message: {}",
        err
    );
}

#[test]
fn unterminated_triple_quote_reports_error() {
    let text = "def f():\n    \"\"\"docstring\n    return 1\n";
    assert!(Program::parse(text).is_err());
}
